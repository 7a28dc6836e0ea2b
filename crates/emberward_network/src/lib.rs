//! UDP socket runtime for a shard's game service.
//!
//! Owns the listening socket and the auth-ticket table. The shard loop in
//! the server crate drives [`ShardSocket::recv_datagram`] and routes
//! datagrams to per-client [`Connection`]s; brand new peers must lead with
//! a valid ticket token (see [`split_handshake`]).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use byteorder::{ByteOrder, LittleEndian};
use emberward_protocol::MAX_DATAGRAM_SIZE;
use tokio::net::UdpSocket;
use tracing::info;

mod connection;
mod ticket;

pub use connection::Connection;
pub use ticket::{TicketTable, AUTH_TICKET_TIMEOUT};

/// The token prefix on a first datagram, in bytes.
pub const HANDSHAKE_TOKEN_LEN: usize = 8;

/// Splits a first datagram into its little-endian ticket token and the
/// packet bytes that follow. `None` if the datagram is too short to carry a
/// token.
pub fn split_handshake(datagram: &[u8]) -> Option<(u64, &[u8])> {
    if datagram.len() < HANDSHAKE_TOKEN_LEN {
        return None;
    }
    let token = LittleEndian::read_u64(&datagram[..HANDSHAKE_TOKEN_LEN]);
    Some((token, &datagram[HANDSHAKE_TOKEN_LEN..]))
}

/// A shard's bound game-service socket plus its ticket table.
pub struct ShardSocket {
    socket: UdpSocket,
    tickets: Arc<TicketTable>,
    recv_buf: Box<[u8]>,
}

/// What one receive step produced.
pub enum SocketEvent {
    /// A datagram arrived from `peer`.
    Datagram { peer: SocketAddr, len: usize },
    /// The receive window elapsed with nothing to read.
    Idle,
}

impl ShardSocket {
    pub async fn bind(addr: SocketAddr, tickets: Arc<TicketTable>) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .with_context(|| format!("failed to bind game service socket on {addr}"))?;

        info!(addr = %socket.local_addr()?, "game service is listening");

        Ok(Self {
            socket,
            tickets,
            // One datagram per recv; anything beyond the wire maximum is
            // truncated and will fail header or tag validation.
            recv_buf: vec![0; MAX_DATAGRAM_SIZE + 1].into_boxed_slice(),
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn tickets(&self) -> &Arc<TicketTable> {
        &self.tickets
    }

    pub fn socket(&self) -> &UdpSocket {
        &self.socket
    }

    /// Waits up to `window` for one datagram. The returned slice indices
    /// into this socket's receive buffer; copy it before the next call.
    pub async fn recv_datagram(&mut self, window: Duration) -> anyhow::Result<SocketEvent> {
        match tokio::time::timeout(window, self.socket.recv_from(&mut self.recv_buf)).await {
            Ok(result) => {
                let (len, peer) = result.context("udp recv failed")?;
                Ok(SocketEvent::Datagram { peer, len })
            }
            Err(_) => Ok(SocketEvent::Idle),
        }
    }

    /// The bytes of the datagram most recently reported by
    /// [`Self::recv_datagram`].
    pub fn datagram(&self, len: usize) -> &[u8] {
        &self.recv_buf[..len]
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn handshake_token_is_little_endian() {
        let mut datagram = vec![0xEF, 0xBE, 0xAD, 0xDE, 0x00, 0x00, 0x00, 0x00];
        datagram.extend_from_slice(b"packet");

        let (token, rest) = split_handshake(&datagram).unwrap();
        assert_eq!(token, 0x0000_0000_DEAD_BEEF);
        assert_eq!(rest, b"packet");
    }

    #[test]
    fn short_datagrams_have_no_token() {
        assert!(split_handshake(&[1, 2, 3]).is_none());
    }
}
