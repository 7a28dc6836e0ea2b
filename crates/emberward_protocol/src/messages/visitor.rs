//! Covenant auto-summons: players volunteering into a visitor pool.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestGetVisitorList {
    #[prost(uint32, tag = "1")]
    pub area_id: u32,
    #[prost(uint32, tag = "2")]
    pub visitor_pool: u32,
    #[prost(message, optional, tag = "3")]
    pub matching_parameter: ::core::option::Option<super::shared::MatchingParameter>,
    #[prost(uint32, tag = "4")]
    pub max_visitors: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestGetVisitorListResponse {
    #[prost(uint32, tag = "1")]
    pub area_id: u32,
    #[prost(message, repeated, tag = "2")]
    pub visitors: ::prost::alloc::vec::Vec<VisitorData>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VisitorData {
    #[prost(uint32, tag = "1")]
    pub player_id: u32,
    #[prost(string, tag = "2")]
    pub steam_id: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestVisit {
    #[prost(uint32, tag = "1")]
    pub player_id: u32,
    #[prost(uint32, tag = "2")]
    pub visitor_pool: u32,
    #[prost(uint32, tag = "3")]
    pub map_id: u32,
    #[prost(uint32, tag = "4")]
    pub area_id: u32,
    #[prost(bytes = "vec", tag = "5")]
    pub player_struct: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestVisitResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestRejectVisit {
    #[prost(uint32, tag = "1")]
    pub player_id: u32,
    #[prost(uint32, tag = "2")]
    pub visitor_pool: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestRejectVisitResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PushRequestVisit {
    #[prost(uint32, tag = "1")]
    pub push_message_id: u32,
    #[prost(uint32, tag = "2")]
    pub visitor_player_id: u32,
    #[prost(string, tag = "3")]
    pub visitor_steam_id: ::prost::alloc::string::String,
    #[prost(uint32, tag = "4")]
    pub visitor_pool: u32,
    #[prost(uint32, tag = "5")]
    pub map_id: u32,
    #[prost(uint32, tag = "6")]
    pub area_id: u32,
    #[prost(bytes = "vec", tag = "7")]
    pub player_struct: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PushRequestRejectVisit {
    #[prost(uint32, tag = "1")]
    pub push_message_id: u32,
    #[prost(uint32, tag = "2")]
    pub target_player_id: u32,
    #[prost(uint32, tag = "3")]
    pub visitor_pool: u32,
}

/// Ends the accept path: the server tells the visitor to leave the pool.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PushRequestRemoveVisitor {
    #[prost(uint32, tag = "1")]
    pub push_message_id: u32,
    #[prost(uint32, tag = "2")]
    pub player_id: u32,
    #[prost(uint32, tag = "3")]
    pub visitor_pool: u32,
}
