//! Message types shared across several handler domains.

/// The per-interaction tuple a client submits when it wants to be paired
/// with other players. A tolerance table on the server side decides whether
/// two of these admit a pairing.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MatchingParameter {
    #[prost(uint32, tag = "1")]
    pub soul_level: u32,
    #[prost(uint32, tag = "2")]
    pub max_weapon_level: u32,
    #[prost(string, tag = "3")]
    pub password: ::prost::alloc::string::String,
    /// Soul-memory-based variants match on this instead of soul level.
    #[prost(uint64, optional, tag = "4")]
    pub soul_memory: ::core::option::Option<u64>,
    #[prost(uint32, optional, tag = "5")]
    pub clear_count: ::core::option::Option<u32>,
}

/// The rolling status blob a client uploads. Only the documented fields
/// below are inspected; everything the variant does not know about rides
/// along opaquely.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PlayerStatusData {
    #[prost(message, optional, tag = "1")]
    pub basic: ::core::option::Option<BasicStatus>,
    #[prost(message, optional, tag = "2")]
    pub attributes: ::core::option::Option<AttributeStatus>,
    /// In-client cheat-detection signal array.
    #[prost(uint32, repeated, tag = "3")]
    pub anticheat_data: ::prost::alloc::vec::Vec<u32>,
    #[prost(uint32, repeated, tag = "4")]
    pub lit_bonfires: ::prost::alloc::vec::Vec<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BasicStatus {
    #[prost(string, optional, tag = "1")]
    pub character_name: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(uint32, optional, tag = "2")]
    pub character_id: ::core::option::Option<u32>,
    #[prost(uint32, optional, tag = "3")]
    pub soul_level: ::core::option::Option<u32>,
    #[prost(uint32, optional, tag = "4")]
    pub max_weapon_level: ::core::option::Option<u32>,
    #[prost(uint32, optional, tag = "5")]
    pub area_id: ::core::option::Option<u32>,
    #[prost(bool, optional, tag = "6")]
    pub is_invadable: ::core::option::Option<bool>,
    /// Covenant grouping for auto-summons; see `VisitorPool`.
    #[prost(uint32, optional, tag = "7")]
    pub visitor_pool: ::core::option::Option<u32>,
    #[prost(uint64, optional, tag = "8")]
    pub souls: ::core::option::Option<u64>,
    #[prost(uint64, optional, tag = "9")]
    pub soul_memory: ::core::option::Option<u64>,
    #[prost(uint32, optional, tag = "10")]
    pub death_count: ::core::option::Option<u32>,
    #[prost(uint64, optional, tag = "11")]
    pub play_time_seconds: ::core::option::Option<u64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AttributeStatus {
    #[prost(uint32, optional, tag = "1")]
    pub vigor: ::core::option::Option<u32>,
    #[prost(uint32, optional, tag = "2")]
    pub attunement: ::core::option::Option<u32>,
    #[prost(uint32, optional, tag = "3")]
    pub endurance: ::core::option::Option<u32>,
    #[prost(uint32, optional, tag = "4")]
    pub vitality: ::core::option::Option<u32>,
    #[prost(uint32, optional, tag = "5")]
    pub strength: ::core::option::Option<u32>,
    #[prost(uint32, optional, tag = "6")]
    pub dexterity: ::core::option::Option<u32>,
    #[prost(uint32, optional, tag = "7")]
    pub intelligence: ::core::option::Option<u32>,
    #[prost(uint32, optional, tag = "8")]
    pub faith: ::core::option::Option<u32>,
    #[prost(uint32, optional, tag = "9")]
    pub luck: ::core::option::Option<u32>,
}

/// Bounds one area's slice of a list request.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DomainLimit {
    #[prost(uint32, tag = "1")]
    pub area_id: u32,
    /// Sub-area key used by variants that partition areas into cells.
    #[prost(uint64, optional, tag = "2")]
    pub cell_id: ::core::option::Option<u64>,
    #[prost(uint32, tag = "3")]
    pub max_entries: u32,
}
