#![doc = include_str!("../README.md")]
#![deny(
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
    rustdoc::invalid_codeblock_attributes,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::bare_urls,
    rustdoc::invalid_html_tags
)]

pub use emberward_game as game;
#[cfg(feature = "network")]
pub use emberward_network as network;
pub use emberward_protocol as protocol;
pub use emberward_server as server;
#[cfg(feature = "store")]
pub use emberward_store as store;

/// Most-used items under one roof.
pub mod prelude {
    pub use emberward_game::{variant_by_name, AshenVariant, GameVariant, SunkenVariant};
    #[cfg(feature = "network")]
    pub use emberward_network::{Connection, ShardSocket, TicketTable};
    pub use emberward_protocol::{
        ClientMessage, GameMessage, GameRequest, MessageKind, MessageStream, PushMessage,
    };
    pub use emberward_server::{
        GameService, ServerManager, ServiceContext, Shard, ShardConfig,
    };
    #[cfg(feature = "store")]
    pub use emberward_store::{Database, MemoryDatabase};
}
