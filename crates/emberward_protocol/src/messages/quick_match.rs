//! Undead matches: host-registered, discoverable, ranked arena fights.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestRegisterQuickMatch {
    #[prost(uint32, tag = "1")]
    pub mode: u32,
    #[prost(uint32, tag = "2")]
    pub map_id: u32,
    #[prost(uint32, tag = "3")]
    pub area_id: u32,
    #[prost(message, optional, tag = "4")]
    pub matching_parameter: ::core::option::Option<super::shared::MatchingParameter>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestRegisterQuickMatchResponse {}

/// Keepalive for a registered match.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestUpdateQuickMatch {
    #[prost(uint32, tag = "1")]
    pub mode: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestUpdateQuickMatchResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestUnregisterQuickMatch {
    #[prost(uint32, tag = "1")]
    pub mode: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestUnregisterQuickMatchResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestSearchQuickMatch {
    #[prost(uint32, tag = "1")]
    pub mode: u32,
    #[prost(uint32, tag = "2")]
    pub map_id: u32,
    #[prost(uint32, tag = "3")]
    pub area_id: u32,
    #[prost(message, optional, tag = "4")]
    pub matching_parameter: ::core::option::Option<super::shared::MatchingParameter>,
    #[prost(uint32, tag = "5")]
    pub max_results: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestSearchQuickMatchResponse {
    #[prost(message, repeated, tag = "1")]
    pub matches: ::prost::alloc::vec::Vec<QuickMatchData>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QuickMatchData {
    #[prost(uint32, tag = "1")]
    pub host_player_id: u32,
    #[prost(string, tag = "2")]
    pub host_steam_id: ::prost::alloc::string::String,
    #[prost(uint32, tag = "3")]
    pub mode: u32,
    #[prost(uint32, tag = "4")]
    pub map_id: u32,
    #[prost(uint32, tag = "5")]
    pub area_id: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestJoinQuickMatch {
    #[prost(uint32, tag = "1")]
    pub mode: u32,
    #[prost(uint32, tag = "2")]
    pub host_player_id: u32,
    #[prost(uint32, tag = "3")]
    pub character_id: u32,
    #[prost(bytes = "vec", tag = "4")]
    pub player_struct: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestJoinQuickMatchResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestAcceptQuickMatch {
    #[prost(uint32, tag = "1")]
    pub mode: u32,
    #[prost(uint32, tag = "2")]
    pub join_player_id: u32,
    #[prost(bytes = "vec", tag = "3")]
    pub player_struct: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestAcceptQuickMatchResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestRejectQuickMatch {
    #[prost(uint32, tag = "1")]
    pub mode: u32,
    #[prost(uint32, tag = "2")]
    pub join_player_id: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestRejectQuickMatchResponse {}

/// The host reports the match has begun; it leaves the registry.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestSendQuickMatchStart {
    #[prost(uint32, tag = "1")]
    pub mode: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestSendQuickMatchStartResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestSendQuickMatchResult {
    #[prost(uint32, tag = "1")]
    pub mode: u32,
    /// 1 win, 2 draw, 3 loss; anything else earns nothing.
    #[prost(uint32, tag = "2")]
    pub result: u32,
    #[prost(uint32, tag = "3")]
    pub character_id: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestSendQuickMatchResultResponse {
    #[prost(uint32, tag = "1")]
    pub rank: u32,
    #[prost(uint32, tag = "2")]
    pub xp: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PushRequestJoinQuickMatch {
    #[prost(uint32, tag = "1")]
    pub push_message_id: u32,
    #[prost(uint32, tag = "2")]
    pub join_player_id: u32,
    #[prost(string, tag = "3")]
    pub join_steam_id: ::prost::alloc::string::String,
    #[prost(uint32, tag = "4")]
    pub character_id: u32,
    #[prost(uint32, tag = "5")]
    pub mode: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PushRequestAcceptQuickMatch {
    #[prost(uint32, tag = "1")]
    pub push_message_id: u32,
    #[prost(uint32, tag = "2")]
    pub host_player_id: u32,
    #[prost(bytes = "vec", tag = "3")]
    pub player_struct: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PushRequestRejectQuickMatch {
    #[prost(uint32, tag = "1")]
    pub push_message_id: u32,
    #[prost(uint32, tag = "2")]
    pub target_player_id: u32,
    #[prost(uint32, tag = "3")]
    pub mode: u32,
}
