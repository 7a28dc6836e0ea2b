//! The soul-memory-matched variant. Artifacts are partitioned by
//! `(area, cell)` sub-grids and pairing compares accumulated soul memory
//! rather than level.

use emberward_protocol::MessageKind;

use crate::{GameVariant, OpcodeTable};

use emberward_protocol::MessageKind as K;

const OPCODES: &[(MessageKind, u32)] = &[
    (K::RequestWaitForUserLogin, 0x02BC),
    (K::RequestGetAnnounceMessageList, 0x02BD),
    (K::RequestUpdatePlayerStatus, 0x02C4),
    (K::RequestUpdatePlayerCharacter, 0x02C5),
    (K::RequestReentryBloodMessage, 0x02D2),
    (K::RequestReCreateBloodMessageList, 0x02D3),
    (K::RequestGetBloodMessageList, 0x02D4),
    (K::RequestGetBloodMessageEvaluation, 0x02D5),
    (K::RequestEvaluateBloodMessage, 0x02D6),
    (K::RequestRemoveBloodMessage, 0x02D7),
    (K::RequestGetBloodstainList, 0x02DE),
    (K::RequestGetAreaBloodstainList, 0x02DF),
    (K::RequestGetDeadingGhost, 0x02E0),
    (K::RequestCreateGhostData, 0x02E5),
    (K::RequestGetGhostDataList, 0x02E6),
    (K::RequestCreateSign, 0x02EC),
    (K::RequestGetSignList, 0x02ED),
    (K::RequestSummonSign, 0x02EE),
    (K::RequestRejectSign, 0x02EF),
    (K::RequestRemoveSign, 0x02F0),
    (K::RequestUpdateSign, 0x02F1),
    (K::RequestGetRightMatchingArea, 0x02F2),
    (K::RequestGetBreakInTargetList, 0x02F8),
    (K::RequestBreakInTarget, 0x02F9),
    (K::RequestRejectBreakInTarget, 0x02FA),
    (K::RequestGetVisitorList, 0x0300),
    (K::RequestVisit, 0x0301),
    (K::RequestRejectVisit, 0x0302),
    (K::RequestRegisterQuickMatch, 0x0308),
    (K::RequestUpdateQuickMatch, 0x0309),
    (K::RequestUnregisterQuickMatch, 0x030A),
    (K::RequestSearchQuickMatch, 0x030B),
    (K::RequestJoinQuickMatch, 0x030C),
    (K::RequestAcceptQuickMatch, 0x030D),
    (K::RequestRejectQuickMatch, 0x030E),
    (K::RequestSendQuickMatchStart, 0x030F),
    (K::RequestSendQuickMatchResult, 0x0310),
    (K::RequestRegisterRankingData, 0x0316),
    (K::RequestGetRankingData, 0x0317),
    (K::RequestGetCharacterRankingData, 0x0318),
    (K::RequestCountRankingData, 0x0319),
    (K::RequestNotifyRingBell, 0x031C),
    (K::RequestSendMessageToPlayers, 0x031D),
    (K::RequestCreateBloodstain, 0x0324),
    (K::RequestNotifyKillEnemy, 0x0328),
    (K::RequestNotifyDie, 0x0329),
    (K::RequestNotifyKillBoss, 0x032A),
    (K::RequestNotifyUseItem, 0x032B),
    (K::PlayerInfoUploadConfigPushMessage, 0x0258),
    (K::ManagementTextMessage, 0x0259),
    (K::PushRequestEvaluateBloodMessage, 0x025A),
    (K::PushRequestSummonSign, 0x025B),
    (K::PushRequestRejectSign, 0x025C),
    (K::PushRequestRemoveSign, 0x025D),
    (K::PushRequestBreakInTarget, 0x025E),
    (K::PushRequestRejectBreakInTarget, 0x025F),
    (K::PushRequestVisit, 0x0260),
    (K::PushRequestRejectVisit, 0x0261),
    (K::PushRequestRemoveVisitor, 0x0262),
    (K::PushRequestJoinQuickMatch, 0x0263),
    (K::PushRequestAcceptQuickMatch, 0x0264),
    (K::PushRequestRejectQuickMatch, 0x0265),
    (K::PushRequestNotifyRingBell, 0x0266),
];

const UPLOAD_FIELD_MASK: &[u32] = &[1, 2, 3, 5, 6, 7, 8, 9, 10];

const BELL_AREAS: &[u32] = &[410_500, 410_501];

pub struct SunkenVariant {
    opcodes: OpcodeTable,
}

impl Default for SunkenVariant {
    fn default() -> Self {
        Self::new()
    }
}

impl SunkenVariant {
    pub fn new() -> Self {
        Self {
            opcodes: OpcodeTable::new(OPCODES),
        }
    }
}

impl GameVariant for SunkenVariant {
    fn name(&self) -> &'static str {
        "sunken"
    }

    fn opcodes(&self) -> &OpcodeTable {
        &self.opcodes
    }

    fn uses_cell_grid(&self) -> bool {
        true
    }

    fn matches_on_soul_memory(&self) -> bool {
        true
    }

    fn rankings_accumulate(&self) -> bool {
        true
    }

    fn upload_field_mask(&self) -> &[u32] {
        UPLOAD_FIELD_MASK
    }

    fn bell_areas(&self) -> &[u32] {
        BELL_AREAS
    }

    fn area_name(&self, area_id: u32) -> String {
        format!("Area {area_id}")
    }
}
