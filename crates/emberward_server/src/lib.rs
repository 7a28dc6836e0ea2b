//! The shard engine: client sessions, live-cache pools, the matching
//! predicate, all matchmaking managers, anti-cheat, and shard lifecycle.

#![deny(
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
    rustdoc::invalid_codeblock_attributes,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::bare_urls,
    rustdoc::invalid_html_tags
)]

pub mod config;
pub mod handlers;
pub mod live_cache;
pub mod manager;
pub mod matching;
pub mod service;
pub mod session;
pub mod shard;
pub mod webhook;

pub use config::{Announcement, MatchingTable, ShardConfig};
pub use live_cache::{CacheKey, LiveCache};
pub use manager::{AdminCommand, ServerManager, SERVER_TIMEOUT};
pub use matching::{can_match, can_match_params, MatchingInput};
pub use service::{GameService, ServiceContext};
pub use session::{ClientSession, PlayerState, SessionMap};
pub use shard::Shard;
pub use webhook::{Notice, NoticeSender, NoticeType};

#[cfg(test)]
mod tests;
