//! Leaderboards.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RankingData {
    #[prost(uint32, tag = "1")]
    pub board_id: u32,
    #[prost(uint32, tag = "2")]
    pub player_id: u32,
    #[prost(uint32, tag = "3")]
    pub character_id: u32,
    /// Position counting ties distinctly (1, 2, 3, ...).
    #[prost(uint32, tag = "4")]
    pub serial_rank: u32,
    /// Position with ties sharing a rank.
    #[prost(uint32, tag = "5")]
    pub rank: u32,
    #[prost(uint64, tag = "6")]
    pub score: u64,
    #[prost(bytes = "vec", tag = "7")]
    pub data: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestRegisterRankingData {
    #[prost(uint32, tag = "1")]
    pub board_id: u32,
    #[prost(uint32, tag = "2")]
    pub character_id: u32,
    #[prost(uint64, tag = "3")]
    pub score: u64,
    #[prost(bytes = "vec", tag = "4")]
    pub data: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestRegisterRankingDataResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestGetRankingData {
    #[prost(uint32, tag = "1")]
    pub board_id: u32,
    /// 1-based offset into the board, best score first.
    #[prost(uint32, tag = "2")]
    pub offset: u32,
    #[prost(uint32, tag = "3")]
    pub count: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestGetRankingDataResponse {
    #[prost(message, repeated, tag = "1")]
    pub entries: ::prost::alloc::vec::Vec<RankingData>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestGetCharacterRankingData {
    #[prost(uint32, tag = "1")]
    pub board_id: u32,
    #[prost(uint32, tag = "2")]
    pub character_id: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestGetCharacterRankingDataResponse {
    /// Zero-valued when the character has no entry on the board.
    #[prost(message, optional, tag = "1")]
    pub entry: ::core::option::Option<RankingData>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestCountRankingData {
    #[prost(uint32, tag = "1")]
    pub board_id: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestCountRankingDataResponse {
    #[prost(uint32, tag = "1")]
    pub count: u32,
}
