//! Rolling player status and character persistence.

/// Periodic partial upload of the client's status blob. Repeated fields with
/// non-empty contents replace the stored ones; scalars merge by presence.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestUpdatePlayerStatus {
    /// Serialized `PlayerStatusData`, treated as opaque beyond the
    /// documented fields.
    #[prost(bytes = "vec", tag = "1")]
    pub status: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestUpdatePlayerStatusResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestUpdatePlayerCharacter {
    #[prost(uint32, tag = "1")]
    pub character_id: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub character_data: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestUpdatePlayerCharacterResponse {}
