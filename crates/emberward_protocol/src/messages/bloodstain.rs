//! Death markers and their attached ghost replays.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BloodstainInfo {
    #[prost(uint32, tag = "1")]
    pub bloodstain_id: u32,
    #[prost(uint32, tag = "2")]
    pub area_id: u32,
    #[prost(uint64, optional, tag = "3")]
    pub cell_id: ::core::option::Option<u64>,
    #[prost(bytes = "vec", tag = "4")]
    pub data: ::prost::alloc::vec::Vec<u8>,
}

/// Fire-and-forget: the client reports a death. No response.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestCreateBloodstain {
    #[prost(uint32, tag = "1")]
    pub area_id: u32,
    #[prost(uint64, optional, tag = "2")]
    pub cell_id: ::core::option::Option<u64>,
    #[prost(bytes = "vec", tag = "3")]
    pub data: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub ghost_data: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestGetBloodstainList {
    #[prost(uint32, tag = "1")]
    pub max_stains: u32,
    #[prost(message, repeated, tag = "2")]
    pub search_areas: ::prost::alloc::vec::Vec<super::shared::DomainLimit>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestGetBloodstainListResponse {
    #[prost(message, repeated, tag = "1")]
    pub bloodstains: ::prost::alloc::vec::Vec<BloodstainInfo>,
}

/// Like `RequestGetBloodstainList` but scoped to the caller's current area.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestGetAreaBloodstainList {
    #[prost(uint32, tag = "1")]
    pub area_id: u32,
    #[prost(uint64, optional, tag = "2")]
    pub cell_id: ::core::option::Option<u64>,
    #[prost(uint32, tag = "3")]
    pub max_stains: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestGetAreaBloodstainListResponse {
    #[prost(message, repeated, tag = "1")]
    pub bloodstains: ::prost::alloc::vec::Vec<BloodstainInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestGetDeadingGhost {
    #[prost(uint32, tag = "1")]
    pub area_id: u32,
    #[prost(uint32, tag = "2")]
    pub bloodstain_id: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestGetDeadingGhostResponse {
    #[prost(uint32, tag = "1")]
    pub bloodstain_id: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub replay_data: ::prost::alloc::vec::Vec<u8>,
}
