//! The soul-level-matched variant. Areas are flat (no cell grid) and the
//! matching predicate compares soul levels.

use emberward_protocol::MessageKind;

use crate::{GameVariant, OpcodeTable};

use emberward_protocol::MessageKind as K;

const OPCODES: &[(MessageKind, u32)] = &[
    (K::RequestWaitForUserLogin, 0x0384),
    (K::RequestGetAnnounceMessageList, 0x0385),
    (K::RequestUpdatePlayerStatus, 0x038C),
    (K::RequestUpdatePlayerCharacter, 0x038D),
    (K::RequestReentryBloodMessage, 0x039A),
    (K::RequestReCreateBloodMessageList, 0x039B),
    (K::RequestGetBloodMessageList, 0x039C),
    (K::RequestGetBloodMessageEvaluation, 0x039D),
    (K::RequestEvaluateBloodMessage, 0x039E),
    (K::RequestRemoveBloodMessage, 0x039F),
    (K::RequestGetBloodstainList, 0x03A6),
    (K::RequestGetAreaBloodstainList, 0x03A7),
    (K::RequestGetDeadingGhost, 0x03A8),
    (K::RequestCreateGhostData, 0x03AD),
    (K::RequestGetGhostDataList, 0x03AE),
    (K::RequestCreateSign, 0x03B4),
    (K::RequestGetSignList, 0x03B5),
    (K::RequestSummonSign, 0x03B6),
    (K::RequestRejectSign, 0x03B7),
    (K::RequestRemoveSign, 0x03B8),
    (K::RequestUpdateSign, 0x03B9),
    (K::RequestGetRightMatchingArea, 0x03BA),
    (K::RequestGetBreakInTargetList, 0x03C0),
    (K::RequestBreakInTarget, 0x03C1),
    (K::RequestRejectBreakInTarget, 0x03C2),
    (K::RequestGetVisitorList, 0x03C8),
    (K::RequestVisit, 0x03C9),
    (K::RequestRejectVisit, 0x03CA),
    (K::RequestRegisterQuickMatch, 0x03D0),
    (K::RequestUpdateQuickMatch, 0x03D1),
    (K::RequestUnregisterQuickMatch, 0x03D2),
    (K::RequestSearchQuickMatch, 0x03D3),
    (K::RequestJoinQuickMatch, 0x03D4),
    (K::RequestAcceptQuickMatch, 0x03D5),
    (K::RequestRejectQuickMatch, 0x03D6),
    (K::RequestSendQuickMatchStart, 0x03D7),
    (K::RequestSendQuickMatchResult, 0x03D8),
    (K::RequestRegisterRankingData, 0x03DE),
    (K::RequestGetRankingData, 0x03DF),
    (K::RequestGetCharacterRankingData, 0x03E0),
    (K::RequestCountRankingData, 0x03E1),
    (K::RequestNotifyRingBell, 0x03E4),
    (K::RequestSendMessageToPlayers, 0x03E5),
    (K::RequestCreateBloodstain, 0x03EC),
    (K::RequestNotifyKillEnemy, 0x03F0),
    (K::RequestNotifyDie, 0x03F1),
    (K::RequestNotifyKillBoss, 0x03F2),
    (K::RequestNotifyUseItem, 0x03F3),
    (K::PlayerInfoUploadConfigPushMessage, 0x0320),
    (K::ManagementTextMessage, 0x0321),
    (K::PushRequestEvaluateBloodMessage, 0x0322),
    (K::PushRequestSummonSign, 0x0323),
    (K::PushRequestRejectSign, 0x0324),
    (K::PushRequestRemoveSign, 0x0325),
    (K::PushRequestBreakInTarget, 0x0326),
    (K::PushRequestRejectBreakInTarget, 0x0327),
    (K::PushRequestVisit, 0x0328),
    (K::PushRequestRejectVisit, 0x0329),
    (K::PushRequestRemoveVisitor, 0x032A),
    (K::PushRequestJoinQuickMatch, 0x032B),
    (K::PushRequestAcceptQuickMatch, 0x032C),
    (K::PushRequestRejectQuickMatch, 0x032D),
    (K::PushRequestNotifyRingBell, 0x032E),
];

/// Status fields the client is asked to include in rolling uploads.
const UPLOAD_FIELD_MASK: &[u32] = &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

/// Zones in which the bell tower's ring is audible.
const BELL_AREAS: &[u32] = &[320_000, 320_001, 320_002];

pub struct AshenVariant {
    opcodes: OpcodeTable,
}

impl Default for AshenVariant {
    fn default() -> Self {
        Self::new()
    }
}

impl AshenVariant {
    pub fn new() -> Self {
        Self {
            opcodes: OpcodeTable::new(OPCODES),
        }
    }
}

impl GameVariant for AshenVariant {
    fn name(&self) -> &'static str {
        "ashen"
    }

    fn opcodes(&self) -> &OpcodeTable {
        &self.opcodes
    }

    fn uses_cell_grid(&self) -> bool {
        false
    }

    fn matches_on_soul_memory(&self) -> bool {
        false
    }

    fn upload_field_mask(&self) -> &[u32] {
        UPLOAD_FIELD_MASK
    }

    fn bell_areas(&self) -> &[u32] {
        BELL_AREAS
    }

    fn area_name(&self, area_id: u32) -> String {
        match area_id {
            300_000..=309_999 => format!("High Ward {}", area_id % 10_000),
            310_000..=319_999 => format!("Sunless Moor {}", area_id % 10_000),
            320_000..=329_999 => format!("Bell Reaches {}", area_id % 10_000),
            _ => format!("Area {area_id}"),
        }
    }
}
