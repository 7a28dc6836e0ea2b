#![doc = include_str!("../README.md")]
#![deny(
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
    rustdoc::invalid_codeblock_attributes,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::bare_urls,
    rustdoc::invalid_html_tags
)]
#![warn(
    trivial_casts,
    trivial_numeric_casts,
    unused_lifetimes,
    unused_import_braces,
    clippy::dbg_macro
)]

pub mod cipher;
pub mod codec;
pub mod frame;
pub mod message;
pub mod messages;
pub mod reliable;
pub mod sanitizer;

pub use cipher::{CipherDirection, SessionCipher, KEY_LEN};
pub use codec::{PacketDecoder, PacketEncoder};
pub use frame::{Packet, PacketHeader, PacketKind, MAX_DATAGRAM_SIZE};
pub use message::{MessageStream, RawMessage, MESSAGE_HEADER_SIZE, OPCODE_REPLY};
pub use messages::{ClientMessage, GameMessage, GameRequest, MessageKind, PushMessage};
pub use reliable::{
    ReliableStream, StreamState, CLIENT_TIMEOUT, MAX_FRAGMENT_MESSAGE_LENGTH,
    MAX_RETRANSMITS, MAX_SEND_QUEUE_SIZE,
};
pub use sanitizer::{validate_entry_list, validate_nrssr, ValidationError};
use thiserror::Error;

/// Why a datagram could not be decoded into a packet. All of these are
/// dropped without a response on the wire.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Malformed(&'static str),
    /// The authentication tag did not verify; wrong key, tampering, or a
    /// stray datagram.
    #[error("packet failed authentication")]
    AuthFailure,
    #[error("datagram of {0} bytes exceeds the maximum")]
    TooLarge(usize),
}

/// Errors surfaced by the reliable/message stream send paths.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum StreamError {
    /// The unacknowledged backlog exceeded its budget; the connection has
    /// been aborted.
    #[error("send queue full")]
    QueueFull,
    #[error("stream closed")]
    StreamClosed,
    #[error("timed out waiting for a reply")]
    Timeout,
}
