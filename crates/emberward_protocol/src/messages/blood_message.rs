//! Player-authored ground messages.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BloodMessageInfo {
    #[prost(uint32, tag = "1")]
    pub message_id: u32,
    #[prost(uint32, tag = "2")]
    pub player_id: u32,
    #[prost(string, tag = "3")]
    pub steam_id: ::prost::alloc::string::String,
    #[prost(uint32, optional, tag = "4")]
    pub character_id: ::core::option::Option<u32>,
    #[prost(uint32, tag = "5")]
    pub area_id: u32,
    #[prost(uint64, optional, tag = "6")]
    pub cell_id: ::core::option::Option<u64>,
    /// Opaque template/gesture encoding; validated, never interpreted.
    #[prost(bytes = "vec", tag = "7")]
    pub data: ::prost::alloc::vec::Vec<u8>,
    #[prost(uint32, tag = "8")]
    pub rating_good: u32,
    #[prost(uint32, tag = "9")]
    pub rating_poor: u32,
}

/// Re-registers messages the client remembers from an earlier session. Ids
/// the server no longer knows come back in `recreate_message_ids`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestReentryBloodMessage {
    #[prost(message, repeated, tag = "1")]
    pub messages: ::prost::alloc::vec::Vec<LocatedMessageId>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LocatedMessageId {
    #[prost(uint32, tag = "1")]
    pub area_id: u32,
    #[prost(uint64, optional, tag = "2")]
    pub cell_id: ::core::option::Option<u64>,
    #[prost(uint32, tag = "3")]
    pub message_id: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestReentryBloodMessageResponse {
    #[prost(uint32, repeated, tag = "1")]
    pub recreate_message_ids: ::prost::alloc::vec::Vec<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestReCreateBloodMessageList {
    #[prost(message, repeated, tag = "1")]
    pub entries: ::prost::alloc::vec::Vec<ReCreateBloodMessageData>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReCreateBloodMessageData {
    #[prost(uint32, tag = "1")]
    pub area_id: u32,
    #[prost(uint64, optional, tag = "2")]
    pub cell_id: ::core::option::Option<u64>,
    #[prost(uint32, optional, tag = "3")]
    pub character_id: ::core::option::Option<u32>,
    #[prost(bytes = "vec", tag = "4")]
    pub data: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestReCreateBloodMessageListResponse {
    /// New ids, in submission order.
    #[prost(uint32, repeated, tag = "1")]
    pub message_ids: ::prost::alloc::vec::Vec<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestGetBloodMessageList {
    #[prost(uint32, tag = "1")]
    pub max_messages: u32,
    #[prost(message, repeated, tag = "2")]
    pub search_areas: ::prost::alloc::vec::Vec<super::shared::DomainLimit>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestGetBloodMessageListResponse {
    #[prost(message, repeated, tag = "1")]
    pub messages: ::prost::alloc::vec::Vec<BloodMessageInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestGetBloodMessageEvaluation {
    #[prost(uint32, repeated, tag = "1")]
    pub message_ids: ::prost::alloc::vec::Vec<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestGetBloodMessageEvaluationResponse {
    #[prost(message, repeated, tag = "1")]
    pub evaluations: ::prost::alloc::vec::Vec<BloodMessageEvaluationData>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BloodMessageEvaluationData {
    #[prost(uint32, tag = "1")]
    pub message_id: u32,
    #[prost(uint32, tag = "2")]
    pub rating_good: u32,
    #[prost(uint32, tag = "3")]
    pub rating_poor: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestEvaluateBloodMessage {
    #[prost(uint32, tag = "1")]
    pub area_id: u32,
    #[prost(uint32, tag = "2")]
    pub message_id: u32,
    #[prost(bool, tag = "3")]
    pub was_poor: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestEvaluateBloodMessageResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestRemoveBloodMessage {
    #[prost(uint32, tag = "1")]
    pub area_id: u32,
    #[prost(uint32, tag = "2")]
    pub message_id: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestRemoveBloodMessageResponse {}

/// Tells an online author their message was rated.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PushRequestEvaluateBloodMessage {
    #[prost(uint32, tag = "1")]
    pub push_message_id: u32,
    #[prost(uint32, tag = "2")]
    pub message_id: u32,
    #[prost(bool, tag = "3")]
    pub was_poor: bool,
    #[prost(uint32, tag = "4")]
    pub rater_player_id: u32,
    #[prost(string, tag = "5")]
    pub rater_steam_id: ::prost::alloc::string::String,
}
