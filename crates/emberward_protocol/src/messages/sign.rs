//! Summon signs: the central matchmaking path.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignInfo {
    #[prost(uint32, tag = "1")]
    pub player_id: u32,
    #[prost(uint32, tag = "2")]
    pub sign_id: u32,
}

/// Full sign record, returned only for signs the requester has not yet seen.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignData {
    #[prost(message, optional, tag = "1")]
    pub sign_info: ::core::option::Option<SignInfo>,
    #[prost(uint32, tag = "2")]
    pub area_id: u32,
    #[prost(uint64, optional, tag = "3")]
    pub cell_id: ::core::option::Option<u64>,
    #[prost(message, optional, tag = "4")]
    pub matching_parameter: ::core::option::Option<super::shared::MatchingParameter>,
    /// Opaque session-join payload; entry-list validated before caching.
    #[prost(bytes = "vec", tag = "5")]
    pub player_struct: ::prost::alloc::vec::Vec<u8>,
    #[prost(string, tag = "6")]
    pub steam_id: ::prost::alloc::string::String,
    #[prost(uint32, tag = "7")]
    pub sign_type: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestCreateSign {
    #[prost(uint32, tag = "1")]
    pub sign_type: u32,
    #[prost(uint32, tag = "2")]
    pub area_id: u32,
    #[prost(uint64, optional, tag = "3")]
    pub cell_id: ::core::option::Option<u64>,
    #[prost(message, optional, tag = "4")]
    pub matching_parameter: ::core::option::Option<super::shared::MatchingParameter>,
    #[prost(bytes = "vec", tag = "5")]
    pub player_struct: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestCreateSignResponse {
    #[prost(uint32, tag = "1")]
    pub sign_id: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignDomainGetInfo {
    #[prost(uint32, tag = "1")]
    pub area_id: u32,
    #[prost(uint64, optional, tag = "2")]
    pub cell_id: ::core::option::Option<u64>,
    #[prost(uint32, tag = "3")]
    pub max_signs: u32,
    /// Signs the client already holds data for; these come back id-only.
    #[prost(message, repeated, tag = "4")]
    pub already_have_signs: ::prost::alloc::vec::Vec<SignInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestGetSignList {
    #[prost(uint32, tag = "1")]
    pub max_signs: u32,
    #[prost(message, optional, tag = "2")]
    pub matching_parameter: ::core::option::Option<super::shared::MatchingParameter>,
    #[prost(message, repeated, tag = "3")]
    pub search_areas: ::prost::alloc::vec::Vec<SignDomainGetInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestGetSignListResponse {
    #[prost(message, repeated, tag = "1")]
    pub sign_data: ::prost::alloc::vec::Vec<SignData>,
    #[prost(message, repeated, tag = "2")]
    pub sign_info_without_data: ::prost::alloc::vec::Vec<SignInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestSummonSign {
    #[prost(uint32, tag = "1")]
    pub area_id: u32,
    #[prost(uint64, optional, tag = "2")]
    pub cell_id: ::core::option::Option<u64>,
    #[prost(message, optional, tag = "3")]
    pub sign_info: ::core::option::Option<SignInfo>,
    #[prost(bytes = "vec", tag = "4")]
    pub player_struct: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestSummonSignResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestRejectSign {
    #[prost(uint32, tag = "1")]
    pub sign_id: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestRejectSignResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestRemoveSign {
    #[prost(uint32, tag = "1")]
    pub area_id: u32,
    #[prost(uint32, tag = "2")]
    pub sign_id: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestRemoveSignResponse {}

/// Keepalive; signs live until removed or their owner disconnects.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestUpdateSign {
    #[prost(uint32, tag = "1")]
    pub area_id: u32,
    #[prost(uint32, tag = "2")]
    pub sign_id: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestUpdateSignResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestGetRightMatchingArea {
    #[prost(message, optional, tag = "1")]
    pub matching_parameter: ::core::option::Option<super::shared::MatchingParameter>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestGetRightMatchingAreaResponse {
    #[prost(message, repeated, tag = "1")]
    pub areas: ::prost::alloc::vec::Vec<AreaPopulationInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AreaPopulationInfo {
    #[prost(uint32, tag = "1")]
    pub area_id: u32,
    /// Relative population normalized into 0..=5.
    #[prost(uint32, tag = "2")]
    pub population: u32,
}

/// Tells a sign owner somebody is summoning them.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PushRequestSummonSign {
    #[prost(uint32, tag = "1")]
    pub push_message_id: u32,
    #[prost(uint32, tag = "2")]
    pub summoner_player_id: u32,
    #[prost(string, tag = "3")]
    pub summoner_steam_id: ::prost::alloc::string::String,
    #[prost(uint32, tag = "4")]
    pub sign_id: u32,
    #[prost(bytes = "vec", tag = "5")]
    pub player_struct: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PushRequestRejectSign {
    #[prost(uint32, tag = "1")]
    pub push_message_id: u32,
    #[prost(uint32, tag = "2")]
    pub sign_id: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PushRequestRemoveSign {
    #[prost(uint32, tag = "1")]
    pub push_message_id: u32,
    #[prost(uint32, tag = "2")]
    pub owner_player_id: u32,
    #[prost(uint32, tag = "3")]
    pub sign_id: u32,
}
