//! Telemetry notifications. None of these expect a response; they feed the
//! statistics tables and, for some, webhook notices.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestNotifyKillEnemy {
    #[prost(message, repeated, tag = "1")]
    pub enemies: ::prost::alloc::vec::Vec<EnemyCountData>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EnemyCountData {
    #[prost(uint32, tag = "1")]
    pub enemy_type_id: u32,
    #[prost(uint32, tag = "2")]
    pub count: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestNotifyDie {
    #[prost(uint32, tag = "1")]
    pub area_id: u32,
    #[prost(uint32, tag = "2")]
    pub cause: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestNotifyKillBoss {
    #[prost(uint32, tag = "1")]
    pub boss_id: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestNotifyUseItem {
    #[prost(uint32, tag = "1")]
    pub item_id: u32,
    #[prost(uint32, tag = "2")]
    pub count: u32,
}
