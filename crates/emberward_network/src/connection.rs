//! One client's connection: the message stream plus correlation state for
//! the few requests the server itself originates.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use bytes::Bytes;
use emberward_protocol::message::{MessageStream, RawMessage};
use emberward_protocol::reliable::StreamState;
use emberward_protocol::{FrameError, GameRequest, StreamError, KEY_LEN};
use prost::Message;
use rustc_hash::FxHashMap;
use tokio::net::UdpSocket;
use tracing::{trace, warn};

/// How long a server-originated request waits for its reply before the
/// receiver resolves with [`StreamError::Timeout`].
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

struct Outstanding {
    reply: flume::Sender<RawMessage>,
    deadline: Instant,
}

pub struct Connection {
    remote_addr: SocketAddr,
    stream: MessageStream,
    outstanding: FxHashMap<u32, Outstanding>,
}

impl Connection {
    pub fn new(remote_addr: SocketAddr, key: &[u8; KEY_LEN], now: Instant) -> Self {
        Self {
            remote_addr,
            stream: MessageStream::new_server(key, now),
            outstanding: FxHashMap::default(),
        }
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn state(&self) -> StreamState {
        self.stream.state()
    }

    pub fn is_closed(&self) -> bool {
        self.stream.is_closed()
    }

    pub fn last_inbound(&self) -> Instant {
        self.stream.last_inbound()
    }

    pub fn close(&mut self) {
        self.stream.close();
    }

    pub fn handle_datagram(&mut self, now: Instant, datagram: &[u8]) -> Result<(), FrameError> {
        self.stream.handle_datagram(now, datagram)
    }

    pub fn pump(&mut self, now: Instant) {
        self.stream.pump(now);

        // Abandon requests whose reply never came; dropping the sender wakes
        // the awaiting side with a channel error it maps to a timeout.
        self.outstanding.retain(|index, outstanding| {
            let keep = now < outstanding.deadline;
            if !keep {
                trace!(index, "server request timed out");
            }
            keep
        });
    }

    /// Sends a push or request under the given wire opcode.
    pub fn send_message<M: Message>(
        &mut self,
        now: Instant,
        opcode: u32,
        message: &M,
    ) -> Result<u32, StreamError> {
        self.stream.send_message(now, opcode, message)
    }

    /// Sends a reply correlated to a client request.
    pub fn send_response<M: Message>(
        &mut self,
        now: Instant,
        request_index: u32,
        message: &M,
    ) -> Result<(), StreamError> {
        self.stream.send_response(now, request_index, message)
    }

    /// Relays an already-encoded body verbatim.
    pub fn send_raw(&mut self, now: Instant, opcode: u32, body: &[u8]) -> Result<u32, StreamError> {
        self.stream.send_raw(now, opcode, body)
    }

    /// Sends a request the server expects the client to answer. Await the
    /// returned receiver; a closed channel means the reply timed out or the
    /// connection went away.
    pub fn send_with_response<R: GameRequest>(
        &mut self,
        now: Instant,
        opcode: u32,
        request: &R,
    ) -> Result<flume::Receiver<RawMessage>, StreamError> {
        let index = self.stream.send_message(now, opcode, request)?;
        let (tx, rx) = flume::bounded(1);
        self.outstanding.insert(
            index,
            Outstanding {
                reply: tx,
                deadline: now + RESPONSE_TIMEOUT,
            },
        );
        Ok(rx)
    }

    /// Pops the next client-originated message. Replies to server-originated
    /// requests are routed to their waiters and never returned here.
    pub fn recv(&mut self) -> Option<RawMessage> {
        loop {
            let message = self.stream.recv()?;
            if !message.is_reply() {
                return Some(message);
            }

            match self.outstanding.remove(&message.index) {
                Some(outstanding) => {
                    let _ = outstanding.reply.try_send(message);
                }
                None => {
                    warn!(index = message.index, "reply with no outstanding request");
                }
            }
        }
    }

    /// Flushes queued datagrams onto the socket. Send errors are logged and
    /// otherwise ignored; the retransmit machinery covers transient loss.
    pub async fn flush(&mut self, socket: &UdpSocket) {
        for datagram in self.stream.take_outgoing() {
            if let Err(e) = socket.send_to(&datagram, self.remote_addr).await {
                warn!(peer = %self.remote_addr, "failed to send datagram: {e}");
            }
        }
    }

    /// Drains queued datagrams without a socket; used by the in-process test
    /// harnesses.
    pub fn take_outgoing(&mut self) -> Vec<Bytes> {
        self.stream.take_outgoing()
    }
}
