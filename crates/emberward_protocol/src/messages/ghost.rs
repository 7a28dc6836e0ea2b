//! Wandering ghost replays.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GhostInfo {
    #[prost(uint32, tag = "1")]
    pub ghost_id: u32,
    #[prost(uint32, tag = "2")]
    pub area_id: u32,
    #[prost(uint64, optional, tag = "3")]
    pub cell_id: ::core::option::Option<u64>,
    #[prost(bytes = "vec", tag = "4")]
    pub replay_data: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestCreateGhostData {
    #[prost(uint32, tag = "1")]
    pub area_id: u32,
    #[prost(uint64, optional, tag = "2")]
    pub cell_id: ::core::option::Option<u64>,
    #[prost(bytes = "vec", tag = "3")]
    pub replay_data: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestCreateGhostDataResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestGetGhostDataList {
    #[prost(uint32, tag = "1")]
    pub max_ghosts: u32,
    #[prost(message, repeated, tag = "2")]
    pub search_areas: ::prost::alloc::vec::Vec<super::shared::DomainLimit>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestGetGhostDataListResponse {
    #[prost(message, repeated, tag = "1")]
    pub ghosts: ::prost::alloc::vec::Vec<GhostInfo>,
}
