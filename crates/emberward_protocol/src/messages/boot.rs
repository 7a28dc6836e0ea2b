//! Login and announcement messages handled during client boot.

/// First request after the handshake; binds the connection to an account.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestWaitForUserLogin {
    /// Platform account id as a hex string.
    #[prost(string, tag = "1")]
    pub steam_id: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestWaitForUserLoginResponse {
    #[prost(string, tag = "1")]
    pub steam_id: ::prost::alloc::string::String,
    /// Stable per-account id used to identify the player from here on.
    #[prost(uint32, tag = "2")]
    pub player_id: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestGetAnnounceMessageList {
    #[prost(uint32, tag = "1")]
    pub max_entries: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestGetAnnounceMessageListResponse {
    #[prost(message, repeated, tag = "1")]
    pub announcements: ::prost::alloc::vec::Vec<AnnounceMessageData>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AnnounceMessageData {
    /// Display ordering, lowest first.
    #[prost(uint32, tag = "1")]
    pub index: u32,
    #[prost(string, tag = "2")]
    pub header: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub message: ::prost::alloc::string::String,
}

/// Pushed right after login; tells the client how often to upload its
/// rolling status and which fields to include.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PlayerInfoUploadConfigPushMessage {
    #[prost(uint32, tag = "1")]
    pub push_message_id: u32,
    /// Seconds between full status uploads.
    #[prost(uint32, tag = "2")]
    pub upload_interval: u32,
    /// Seconds the client waits before its first upload.
    #[prost(uint32, tag = "3")]
    pub upload_delay: u32,
    /// Variant-specific field mask enumerating what to include.
    #[prost(uint32, repeated, tag = "4")]
    pub field_mask: ::prost::alloc::vec::Vec<u32>,
}

/// Free-form text shown by the client's management message box. Used for
/// anti-cheat warnings.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ManagementTextMessage {
    #[prost(uint32, tag = "1")]
    pub push_message_id: u32,
    #[prost(string, tag = "2")]
    pub message: ::prost::alloc::string::String,
}
