//! The message layer: typed request/response/push framing carried as
//! reliable-stream payloads.
//!
//! A message is a 12-byte header followed by a compressed protobuf body:
//!
//! ```text
//! offset 0 u32 header_size   big-endian, always 0x0C
//! offset 4 u32 msg_type      big-endian opcode; zero for replies
//! offset 8 u32 msg_index     little-endian correlation index
//! ```
//!
//! Replies carry opcode zero; the reply's type is recovered by correlating
//! `msg_index` against the outstanding request. The body is the
//! length-prefixed protobuf encoding, DEFLATE-compressed with no dictionary.

use std::io::Write;
use std::time::Instant;

use anyhow::{bail, ensure, Context};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use bytes::{BufMut, Bytes, BytesMut};
use flate2::write::{ZlibDecoder, ZlibEncoder};
use flate2::Compression;
use prost::Message;
use tracing::warn;

use crate::cipher::KEY_LEN;
use crate::reliable::{ReliableStream, StreamState};
use crate::{FrameError, StreamError};

/// Size of the message header in bytes.
pub const MESSAGE_HEADER_SIZE: usize = 12;

/// The opcode reserved for replies.
pub const OPCODE_REPLY: u32 = 0;

/// Upper bound on a decompressed message body; anything larger is treated as
/// hostile.
const MAX_MESSAGE_SIZE: usize = 1 << 20;

/// A decoded inbound message with its body decompressed but not yet parsed
/// as a protobuf.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawMessage {
    /// Wire opcode; [`OPCODE_REPLY`] for replies to our own requests.
    pub opcode: u32,
    /// Correlation index.
    pub index: u32,
    /// Decompressed protobuf bytes.
    pub body: Bytes,
}

impl RawMessage {
    pub fn is_reply(&self) -> bool {
        self.opcode == OPCODE_REPLY
    }

    /// Parses the body as a concrete protobuf message.
    pub fn decode_as<M: Message + Default>(&self) -> anyhow::Result<M> {
        M::decode(&self.body[..]).context("malformed message body")
    }
}

/// Typed message stream layered over a [`ReliableStream`].
pub struct MessageStream {
    stream: ReliableStream,
    next_index: u32,
}

impl MessageStream {
    pub fn new_server(key: &[u8; KEY_LEN], now: Instant) -> Self {
        Self {
            stream: ReliableStream::new_server(key, now),
            next_index: 1,
        }
    }

    pub fn new_client(key: &[u8; KEY_LEN], now: Instant) -> Self {
        Self {
            stream: ReliableStream::new_client(key, now),
            next_index: 1,
        }
    }

    pub fn state(&self) -> StreamState {
        self.stream.state()
    }

    pub fn is_established(&self) -> bool {
        self.stream.is_established()
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
    }

    pub fn take_outgoing(&mut self) -> Vec<Bytes> {
        self.stream.take_outgoing()
    }

    fn fresh_index(&mut self) -> u32 {
        let index = self.next_index;
        self.next_index = self.next_index.wrapping_add(1);
        index
    }

    /// Sends a request or push message, returning the correlation index the
    /// peer will echo in any reply.
    pub fn send_message<M: Message>(
        &mut self,
        now: Instant,
        opcode: u32,
        message: &M,
    ) -> Result<u32, StreamError> {
        let index = self.fresh_index();
        self.send_frame(now, opcode, index, &message.encode_to_vec())?;
        Ok(index)
    }

    /// Sends a reply to the request that carried `request_index`.
    pub fn send_response<M: Message>(
        &mut self,
        now: Instant,
        request_index: u32,
        message: &M,
    ) -> Result<(), StreamError> {
        self.send_frame(now, OPCODE_REPLY, request_index, &message.encode_to_vec())
    }

    /// Sends an already-encoded body under the given opcode. Used when
    /// relaying a payload another client produced.
    pub fn send_raw(
        &mut self,
        now: Instant,
        opcode: u32,
        body: &[u8],
    ) -> Result<u32, StreamError> {
        let index = self.fresh_index();
        self.send_frame(now, opcode, index, body)?;
        Ok(index)
    }

    fn send_frame(
        &mut self,
        now: Instant,
        opcode: u32,
        index: u32,
        body: &[u8],
    ) -> Result<(), StreamError> {
        let mut frame = BytesMut::with_capacity(MESSAGE_HEADER_SIZE + 4 + body.len());
        frame.put_u32(MESSAGE_HEADER_SIZE as u32);
        frame.put_u32(opcode);
        frame.put_u32_le(index);
        frame.put_u32(body.len() as u32);

        let mut encoder = ZlibEncoder::new((&mut frame).writer(), Compression::new(4));
        encoder
            .write_all(body)
            .expect("writing into a BytesMut is infallible");
        encoder
            .finish()
            .expect("writing into a BytesMut is infallible");

        self.stream.send(now, &frame)
    }

    /// Pops the next decoded inbound message. Frames that fail to parse are
    /// logged and skipped; the transport already authenticated them, so a
    /// bad frame is a peer bug rather than an attack worth disconnecting
    /// over.
    pub fn recv(&mut self) -> Option<RawMessage> {
        loop {
            let payload = self.stream.recv()?;
            match decode_frame(&payload) {
                Ok(message) => return Some(message),
                Err(e) => warn!("discarding undecodable message frame: {e:#}"),
            }
        }
    }
}

fn decode_frame(payload: &[u8]) -> anyhow::Result<RawMessage> {
    ensure!(
        payload.len() >= MESSAGE_HEADER_SIZE + 4,
        "frame shorter than message header"
    );

    let header_size = BigEndian::read_u32(&payload[0..4]) as usize;
    ensure!(
        header_size == MESSAGE_HEADER_SIZE,
        "unexpected header size {header_size}"
    );

    let opcode = BigEndian::read_u32(&payload[4..8]);
    let index = LittleEndian::read_u32(&payload[8..12]);

    let raw_len = BigEndian::read_u32(&payload[12..16]) as usize;
    ensure!(
        raw_len <= MAX_MESSAGE_SIZE,
        "message body of {raw_len} bytes is too large"
    );

    let mut body = BytesMut::zeroed(raw_len);
    let mut decoder = ZlibDecoder::new(&mut body[..]);
    decoder
        .write_all(&payload[16..])
        .context("corrupt compressed body")?;
    if !decoder.finish().context("corrupt compressed body")?.is_empty() {
        bail!("compressed body shorter than declared length");
    }

    Ok(RawMessage {
        opcode,
        index,
        body: body.freeze(),
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const KEY: [u8; KEY_LEN] = [0x42; KEY_LEN];

    #[derive(Clone, PartialEq, ::prost::Message)]
    struct Probe {
        #[prost(uint32, tag = "1")]
        id: u32,
        #[prost(string, tag = "2")]
        text: String,
    }

    fn establish(now: Instant) -> (MessageStream, MessageStream) {
        let mut client = MessageStream::new_client(&KEY, now);
        let mut server = MessageStream::new_server(&KEY, now);

        shuttle(&mut client, &mut server, now);
        shuttle(&mut server, &mut client, now);
        shuttle(&mut client, &mut server, now);

        assert!(client.is_established());
        assert!(server.is_established());
        (client, server)
    }

    fn shuttle(from: &mut MessageStream, to: &mut MessageStream, now: Instant) {
        for datagram in from.take_outgoing() {
            to.handle_datagram(now, &datagram).unwrap();
        }
    }

    #[test]
    fn request_response_round_trip() {
        let now = Instant::now();
        let (mut client, mut server) = establish(now);

        let request = Probe {
            id: 7,
            text: "ping".into(),
        };
        let sent_index = client.send_message(now, 0x0310, &request).unwrap();
        shuttle(&mut client, &mut server, now);

        let received = server.recv().unwrap();
        assert_eq!(received.opcode, 0x0310);
        assert_eq!(received.index, sent_index);
        assert_eq!(received.decode_as::<Probe>().unwrap(), request);

        let reply = Probe {
            id: 7,
            text: "pong".into(),
        };
        server.send_response(now, received.index, &reply).unwrap();
        shuttle(&mut server, &mut client, now);

        let received = client.recv().unwrap();
        assert!(received.is_reply());
        assert_eq!(received.index, sent_index);
        assert_eq!(received.decode_as::<Probe>().unwrap(), reply);
    }

    #[test]
    fn indexes_are_fresh_per_message() {
        let now = Instant::now();
        let (mut client, _server) = establish(now);

        let a = client.send_message(now, 1, &Probe::default()).unwrap();
        let b = client.send_message(now, 1, &Probe::default()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn large_message_survives_fragmentation() {
        let now = Instant::now();
        let (mut client, mut server) = establish(now);

        let request = Probe {
            id: 1,
            // Pseudo-random so compression cannot squeeze it back under the
            // fragmentation threshold.
            text: {
                let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
                (0..8000)
                    .map(|_| {
                        state = state
                            .wrapping_mul(6364136223846793005)
                            .wrapping_add(1442695040888963407);
                        char::from(b'a' + (state >> 58) as u8 % 26)
                    })
                    .collect()
            },
        };
        client.send_message(now, 0x0311, &request).unwrap();
        shuttle(&mut client, &mut server, now);

        let received = server.recv().unwrap();
        assert_eq!(received.decode_as::<Probe>().unwrap(), request);
    }

    #[test]
    fn truncated_frame_is_skipped() {
        let err = decode_frame(&[0u8; 8]).unwrap_err();
        assert!(err.to_string().contains("shorter"));
    }

    #[test]
    fn declared_length_is_bounded() {
        let mut frame = BytesMut::new();
        frame.put_u32(MESSAGE_HEADER_SIZE as u32);
        frame.put_u32(1);
        frame.put_u32_le(1);
        frame.put_u32(u32::MAX);

        assert!(decode_frame(&frame).is_err());
    }
}
