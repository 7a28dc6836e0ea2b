//! Bell notifications and raw player-to-player relays.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestNotifyRingBell {
    #[prost(uint32, tag = "1")]
    pub area_id: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub data: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestNotifyRingBellResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PushRequestNotifyRingBell {
    #[prost(uint32, tag = "1")]
    pub push_message_id: u32,
    #[prost(uint32, tag = "2")]
    pub player_id: u32,
    #[prost(uint32, tag = "3")]
    pub area_id: u32,
    #[prost(bytes = "vec", tag = "4")]
    pub data: ::prost::alloc::vec::Vec<u8>,
}

/// Relays an opaque push payload to up to six listed peers. The payload must
/// itself parse as a documented push message before it is forwarded.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestSendMessageToPlayers {
    #[prost(uint32, repeated, tag = "1")]
    pub player_ids: ::prost::alloc::vec::Vec<u32>,
    #[prost(bytes = "vec", tag = "2")]
    pub message: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestSendMessageToPlayersResponse {}
