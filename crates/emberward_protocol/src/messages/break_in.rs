//! Invasions: joining another player's world uninvited.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestGetBreakInTargetList {
    #[prost(uint32, tag = "1")]
    pub area_id: u32,
    #[prost(message, optional, tag = "2")]
    pub matching_parameter: ::core::option::Option<super::shared::MatchingParameter>,
    #[prost(uint32, tag = "3")]
    pub max_targets: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestGetBreakInTargetListResponse {
    #[prost(uint32, tag = "1")]
    pub area_id: u32,
    #[prost(message, repeated, tag = "2")]
    pub targets: ::prost::alloc::vec::Vec<BreakInTargetData>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BreakInTargetData {
    #[prost(uint32, tag = "1")]
    pub player_id: u32,
    #[prost(string, tag = "2")]
    pub steam_id: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestBreakInTarget {
    #[prost(uint32, tag = "1")]
    pub player_id: u32,
    #[prost(uint32, tag = "2")]
    pub map_id: u32,
    #[prost(uint32, tag = "3")]
    pub area_id: u32,
    #[prost(bytes = "vec", tag = "4")]
    pub player_struct: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestBreakInTargetResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestRejectBreakInTarget {
    /// The invader being turned away.
    #[prost(uint32, tag = "1")]
    pub player_id: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestRejectBreakInTargetResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PushRequestBreakInTarget {
    #[prost(uint32, tag = "1")]
    pub push_message_id: u32,
    #[prost(uint32, tag = "2")]
    pub invader_player_id: u32,
    #[prost(string, tag = "3")]
    pub invader_steam_id: ::prost::alloc::string::String,
    #[prost(uint32, tag = "4")]
    pub map_id: u32,
    #[prost(uint32, tag = "5")]
    pub area_id: u32,
    #[prost(bytes = "vec", tag = "6")]
    pub player_struct: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PushRequestRejectBreakInTarget {
    #[prost(uint32, tag = "1")]
    pub push_message_id: u32,
    #[prost(uint32, tag = "2")]
    pub target_player_id: u32,
}
