//! The full message set and its registry.
//!
//! Message types come in three shapes: *requests*, which expect a reply
//! correlated by message index; *notifications*, which are client-originated
//! and fire-and-forget; and *pushes*, which only ever travel server → client
//! and are never awaited. The [`message_registry!`] table below is the
//! single source of truth relating a protobuf type to its [`MessageKind`];
//! the per-variant opcode numbering lives with the game variant, keyed by
//! kind.

pub mod blood_message;
pub mod bloodstain;
pub mod boot;
pub mod break_in;
pub mod ghost;
pub mod logging;
pub mod misc;
pub mod player_data;
pub mod quick_match;
pub mod ranking;
pub mod shared;
pub mod sign;
pub mod visitor;

pub use blood_message::*;
pub use bloodstain::*;
pub use boot::*;
pub use break_in::*;
pub use ghost::*;
pub use logging::*;
pub use misc::*;
pub use player_data::*;
pub use quick_match::*;
pub use ranking::*;
pub use shared::*;
pub use sign::*;
pub use visitor::*;

/// A protobuf type with a fixed place in the message registry.
pub trait GameMessage: prost::Message + Default {
    const KIND: MessageKind;
}

/// A request message, linked to the reply type the peer answers with.
pub trait GameRequest: GameMessage {
    type Response: prost::Message + Default;
}

/// Defines [`MessageKind`], the typed decode enums, and the `GameMessage`
/// impls from one declarative table.
macro_rules! message_registry {
    (
        requests { $($req:ident => $resp:ident,)* }
        notifications { $($note:ident,)* }
        pushes { $($push:ident,)* }
    ) => {
        /// Identifies every message the protocol can carry. Wire opcodes are
        /// assigned per game variant; this enum is the variant-independent
        /// key.
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        pub enum MessageKind {
            $($req,)*
            $($note,)*
            $($push,)*
        }

        impl MessageKind {
            pub const ALL: &'static [MessageKind] = &[
                $(Self::$req,)*
                $(Self::$note,)*
                $(Self::$push,)*
            ];

            /// Whether the sender will wait for a correlated reply.
            pub fn expects_response(self) -> bool {
                matches!(self, $(Self::$req)|*)
            }

            /// Whether this kind is server-initiated.
            pub fn is_push(self) -> bool {
                matches!(self, $(Self::$push)|*)
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$req => stringify!($req),)*
                    $(Self::$note => stringify!($note),)*
                    $(Self::$push => stringify!($push),)*
                }
            }
        }

        $(impl GameMessage for $req {
            const KIND: MessageKind = MessageKind::$req;
        })*
        $(impl GameRequest for $req {
            type Response = $resp;
        })*
        $(impl GameMessage for $note {
            const KIND: MessageKind = MessageKind::$note;
        })*
        $(impl GameMessage for $push {
            const KIND: MessageKind = MessageKind::$push;
        })*

        /// A decoded client-originated message, ready for dispatch.
        #[derive(Clone, Debug, PartialEq)]
        pub enum ClientMessage {
            $($req($req),)*
            $($note($note),)*
        }

        impl ClientMessage {
            /// Decodes a message body under the given kind. Push kinds are
            /// never client-originated and yield `None`.
            pub fn decode(kind: MessageKind, body: &[u8]) -> anyhow::Result<Option<Self>> {
                Ok(Some(match kind {
                    $(MessageKind::$req => {
                        Self::$req(<$req as prost::Message>::decode(body)?)
                    })*
                    $(MessageKind::$note => {
                        Self::$note(<$note as prost::Message>::decode(body)?)
                    })*
                    #[allow(unreachable_patterns)]
                    _ => return Ok(None),
                }))
            }

            pub fn kind(&self) -> MessageKind {
                match self {
                    $(Self::$req(_) => MessageKind::$req,)*
                    $(Self::$note(_) => MessageKind::$note,)*
                }
            }
        }

        /// A decoded server-initiated push message. Exists so relayed push
        /// payloads can be proven to parse as a documented push before being
        /// forwarded.
        #[derive(Clone, Debug, PartialEq)]
        pub enum PushMessage {
            $($push($push),)*
        }

        impl PushMessage {
            pub fn decode(kind: MessageKind, body: &[u8]) -> anyhow::Result<Option<Self>> {
                Ok(Some(match kind {
                    $(MessageKind::$push => {
                        Self::$push(<$push as prost::Message>::decode(body)?)
                    })*
                    #[allow(unreachable_patterns)]
                    _ => return Ok(None),
                }))
            }
        }
    };
}

message_registry! {
    requests {
        RequestWaitForUserLogin => RequestWaitForUserLoginResponse,
        RequestGetAnnounceMessageList => RequestGetAnnounceMessageListResponse,
        RequestUpdatePlayerStatus => RequestUpdatePlayerStatusResponse,
        RequestUpdatePlayerCharacter => RequestUpdatePlayerCharacterResponse,
        RequestReentryBloodMessage => RequestReentryBloodMessageResponse,
        RequestReCreateBloodMessageList => RequestReCreateBloodMessageListResponse,
        RequestGetBloodMessageList => RequestGetBloodMessageListResponse,
        RequestGetBloodMessageEvaluation => RequestGetBloodMessageEvaluationResponse,
        RequestEvaluateBloodMessage => RequestEvaluateBloodMessageResponse,
        RequestRemoveBloodMessage => RequestRemoveBloodMessageResponse,
        RequestGetBloodstainList => RequestGetBloodstainListResponse,
        RequestGetAreaBloodstainList => RequestGetAreaBloodstainListResponse,
        RequestGetDeadingGhost => RequestGetDeadingGhostResponse,
        RequestCreateGhostData => RequestCreateGhostDataResponse,
        RequestGetGhostDataList => RequestGetGhostDataListResponse,
        RequestCreateSign => RequestCreateSignResponse,
        RequestGetSignList => RequestGetSignListResponse,
        RequestSummonSign => RequestSummonSignResponse,
        RequestRejectSign => RequestRejectSignResponse,
        RequestRemoveSign => RequestRemoveSignResponse,
        RequestUpdateSign => RequestUpdateSignResponse,
        RequestGetRightMatchingArea => RequestGetRightMatchingAreaResponse,
        RequestGetBreakInTargetList => RequestGetBreakInTargetListResponse,
        RequestBreakInTarget => RequestBreakInTargetResponse,
        RequestRejectBreakInTarget => RequestRejectBreakInTargetResponse,
        RequestGetVisitorList => RequestGetVisitorListResponse,
        RequestVisit => RequestVisitResponse,
        RequestRejectVisit => RequestRejectVisitResponse,
        RequestRegisterQuickMatch => RequestRegisterQuickMatchResponse,
        RequestUpdateQuickMatch => RequestUpdateQuickMatchResponse,
        RequestUnregisterQuickMatch => RequestUnregisterQuickMatchResponse,
        RequestSearchQuickMatch => RequestSearchQuickMatchResponse,
        RequestJoinQuickMatch => RequestJoinQuickMatchResponse,
        RequestAcceptQuickMatch => RequestAcceptQuickMatchResponse,
        RequestRejectQuickMatch => RequestRejectQuickMatchResponse,
        RequestSendQuickMatchStart => RequestSendQuickMatchStartResponse,
        RequestSendQuickMatchResult => RequestSendQuickMatchResultResponse,
        RequestRegisterRankingData => RequestRegisterRankingDataResponse,
        RequestGetRankingData => RequestGetRankingDataResponse,
        RequestGetCharacterRankingData => RequestGetCharacterRankingDataResponse,
        RequestCountRankingData => RequestCountRankingDataResponse,
        RequestNotifyRingBell => RequestNotifyRingBellResponse,
        RequestSendMessageToPlayers => RequestSendMessageToPlayersResponse,
    }
    notifications {
        RequestCreateBloodstain,
        RequestNotifyKillEnemy,
        RequestNotifyDie,
        RequestNotifyKillBoss,
        RequestNotifyUseItem,
    }
    pushes {
        PlayerInfoUploadConfigPushMessage,
        ManagementTextMessage,
        PushRequestEvaluateBloodMessage,
        PushRequestSummonSign,
        PushRequestRejectSign,
        PushRequestRemoveSign,
        PushRequestBreakInTarget,
        PushRequestRejectBreakInTarget,
        PushRequestVisit,
        PushRequestRejectVisit,
        PushRequestRemoveVisitor,
        PushRequestJoinQuickMatch,
        PushRequestAcceptQuickMatch,
        PushRequestRejectQuickMatch,
        PushRequestNotifyRingBell,
    }
}

#[cfg(test)]
mod tests {
    use prost::Message;

    use super::*;

    #[test]
    fn response_expectations() {
        assert!(MessageKind::RequestCreateSign.expects_response());
        assert!(MessageKind::RequestWaitForUserLogin.expects_response());
        assert!(!MessageKind::RequestCreateBloodstain.expects_response());
        assert!(!MessageKind::PushRequestSummonSign.expects_response());
    }

    #[test]
    fn pushes_are_marked() {
        assert!(MessageKind::PushRequestRemoveSign.is_push());
        assert!(!MessageKind::RequestRemoveSign.is_push());
        assert!(!MessageKind::RequestNotifyDie.is_push());
    }

    #[test]
    fn client_decode_round_trip() {
        let request = RequestCreateSign {
            sign_type: 1,
            area_id: 1010,
            cell_id: None,
            matching_parameter: Some(MatchingParameter {
                soul_level: 50,
                max_weapon_level: 5,
                ..Default::default()
            }),
            player_struct: vec![1, 2, 3],
        };

        let decoded =
            ClientMessage::decode(MessageKind::RequestCreateSign, &request.encode_to_vec())
                .unwrap()
                .unwrap();

        assert_eq!(decoded.kind(), MessageKind::RequestCreateSign);
        assert_eq!(decoded, ClientMessage::RequestCreateSign(request));
    }

    #[test]
    fn pushes_do_not_decode_as_client_messages() {
        let push = PushRequestRemoveSign::default();
        let decoded = ClientMessage::decode(
            MessageKind::PushRequestRemoveSign,
            &push.encode_to_vec(),
        )
        .unwrap();
        assert!(decoded.is_none());
    }

    #[test]
    fn push_payloads_decode_as_pushes() {
        let push = PushRequestRejectSign {
            push_message_id: 1,
            sign_id: 42,
        };
        let decoded =
            PushMessage::decode(MessageKind::PushRequestRejectSign, &push.encode_to_vec())
                .unwrap()
                .unwrap();
        assert_eq!(decoded, PushMessage::PushRequestRejectSign(push));
    }

    #[test]
    fn kinds_have_unique_names() {
        let mut names: Vec<_> = MessageKind::ALL.iter().map(|k| k.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), MessageKind::ALL.len());
    }
}
