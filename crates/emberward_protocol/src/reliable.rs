//! The reliable-UDP stream state machine.
//!
//! A single-peer, sans-io state machine layered over the packet codec. It
//! provides in-order delivery of payloads, automatic retransmission with an
//! RTT-derived backoff, fragmentation of payloads that exceed
//! [`MAX_FRAGMENT_MESSAGE_LENGTH`], and connection liveness signaling.
//!
//! Nothing here touches a socket or a clock: callers push received datagrams
//! in with [`ReliableStream::handle_datagram`], drive timers with
//! [`ReliableStream::pump`], and drain [`ReliableStream::take_outgoing`]
//! onto the wire.

use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace};

use crate::cipher::{CipherDirection, KEY_LEN};
use crate::codec::{PacketDecoder, PacketEncoder};
use crate::frame::{Packet, PacketHeader, PacketKind, FLAG_FINAL_FRAGMENT};
use crate::{FrameError, StreamError};

/// A connection with no inbound packet for this long is closed.
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Total payload bytes that may sit unacknowledged before the connection is
/// aborted.
pub const MAX_SEND_QUEUE_SIZE: usize = 256 * 1024;

/// Retransmit attempts per packet before the stream gives up and closes.
pub const MAX_RETRANSMITS: u32 = 8;

/// Payloads of this size or larger are split into `DAT_FRAG` packets.
pub const MAX_FRAGMENT_MESSAGE_LENGTH: usize = 1024;

/// How many out-of-order packets the receiver will buffer while waiting for
/// a gap to fill. Packets beyond the window are dropped and retransmitted by
/// the peer.
const REORDER_WINDOW: u32 = 32;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);
const INITIAL_RTO: Duration = Duration::from_millis(200);
const MAX_RTO: Duration = Duration::from_secs(5);

/// Connection lifecycle. The server side moves `Listening → SynRecv →
/// Established`; the client side `SynSent → Established`. Both end at
/// `Closing → Closed`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StreamState {
    Listening,
    SynSent,
    SynRecv,
    Established,
    Closing,
    Closed,
}

struct InFlight {
    packet: Packet,
    last_sent: Instant,
    rto: Duration,
    retries: u32,
    retransmitted: bool,
}

pub struct ReliableStream {
    state: StreamState,
    encoder: PacketEncoder,
    decoder: PacketDecoder,

    /// Next sequence index to assign to an outbound packet.
    send_seq: u32,
    /// Next inbound sequence index to deliver.
    expect_seq: u32,
    /// Sequence index of our SYN/SYN-ACK, used to detect handshake
    /// completion.
    handshake_seq: u32,

    unacked: VecDeque<InFlight>,
    unacked_bytes: usize,
    reorder: BTreeMap<u32, Packet>,
    frag_buf: BytesMut,

    inbound: VecDeque<Bytes>,
    outgoing: Vec<Bytes>,

    last_inbound: Instant,
    last_outbound: Instant,
    pending_ack: bool,
    rst_sent: bool,

    srtt: Option<Duration>,
    rto: Duration,
}

impl ReliableStream {
    /// A server-side stream waiting for the peer's SYN.
    pub fn new_server(key: &[u8; KEY_LEN], now: Instant) -> Self {
        Self::new(key, CipherDirection::ServerToClient, StreamState::Listening, now)
    }

    /// A client-side stream; queues the opening SYN immediately.
    pub fn new_client(key: &[u8; KEY_LEN], now: Instant) -> Self {
        let mut stream = Self::new(key, CipherDirection::ClientToServer, StreamState::SynSent, now);
        stream.handshake_seq = stream.send_seq;
        let syn = Packet::control(PacketKind::Syn, stream.next_seq(), 0);
        stream.track_and_emit(syn, now);
        stream
    }

    fn new(key: &[u8; KEY_LEN], direction: CipherDirection, state: StreamState, now: Instant) -> Self {
        Self {
            state,
            encoder: PacketEncoder::new(key, direction),
            decoder: PacketDecoder::new(key, direction.flipped()),
            send_seq: 1,
            expect_seq: 0,
            handshake_seq: 0,
            unacked: VecDeque::new(),
            unacked_bytes: 0,
            reorder: BTreeMap::new(),
            frag_buf: BytesMut::new(),
            inbound: VecDeque::new(),
            outgoing: Vec::new(),
            last_inbound: now,
            last_outbound: now,
            pending_ack: false,
            rst_sent: false,
            srtt: None,
            rto: INITIAL_RTO,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_established(&self) -> bool {
        self.state == StreamState::Established
    }

    pub fn is_closed(&self) -> bool {
        self.state == StreamState::Closed
    }

    pub fn last_inbound(&self) -> Instant {
        self.last_inbound
    }

    fn next_seq(&mut self) -> u32 {
        let seq = self.send_seq;
        self.send_seq = self.send_seq.wrapping_add(1);
        seq
    }

    /// The cumulative acknowledgement value: the sequence index of the last
    /// in-order packet delivered.
    fn ack_value(&self) -> u32 {
        self.expect_seq.wrapping_sub(1)
    }

    /// Processes one datagram received from the peer. Malformed or
    /// unauthenticated datagrams are reported; callers drop them silently.
    pub fn handle_datagram(&mut self, now: Instant, datagram: &[u8]) -> Result<(), FrameError> {
        if matches!(self.state, StreamState::Closed) {
            return Ok(());
        }

        let packet = self.decoder.decode(datagram)?;
        self.last_inbound = now;

        if packet.header.kind.carries_ack() {
            self.process_ack(now, packet.header.ack);
        }

        match packet.header.kind {
            PacketKind::Syn => self.on_syn(now, &packet),
            PacketKind::SynAck => self.on_syn_ack(now, &packet),
            PacketKind::Ack | PacketKind::Hbt => {}
            PacketKind::Rst => {
                debug!("peer reset the connection");
                self.state = StreamState::Closing;
                // The peer is gone; nothing left worth retransmitting.
                self.rst_sent = true;
            }
            PacketKind::Dat | PacketKind::DatAck | PacketKind::DatFrag | PacketKind::DatFragAck => {
                if self.state == StreamState::SynRecv {
                    // Payload implies our SYN-ACK arrived.
                    self.state = StreamState::Established;
                }
                self.on_payload(packet);
            }
        }

        Ok(())
    }

    fn on_syn(&mut self, now: Instant, packet: &Packet) {
        match self.state {
            StreamState::Listening => {
                self.expect_seq = packet.header.seq.wrapping_add(1);
                self.handshake_seq = self.send_seq;

                let mut syn_ack = Packet::control(PacketKind::SynAck, 0, packet.header.seq);
                syn_ack.header.seq = self.next_seq();
                self.track_and_emit(syn_ack, now);

                self.state = StreamState::SynRecv;
            }
            StreamState::SynRecv => {
                // Retransmitted SYN; our SYN-ACK retransmit timer covers it.
                trace!("duplicate SYN ignored");
            }
            _ => {}
        }
    }

    fn on_syn_ack(&mut self, now: Instant, packet: &Packet) {
        if self.state != StreamState::SynSent {
            return;
        }

        self.expect_seq = packet.header.seq.wrapping_add(1);
        self.state = StreamState::Established;

        let ack = Packet::control(PacketKind::Ack, self.next_seq(), packet.header.seq);
        self.emit(ack, now);
    }

    fn on_payload(&mut self, packet: Packet) {
        if !matches!(self.state, StreamState::Established | StreamState::SynRecv) {
            return;
        }

        let seq = packet.header.seq;
        let distance = seq.wrapping_sub(self.expect_seq);

        if distance == 0 {
            self.accept_payload(packet);

            // Drain any buffered successors the gap was holding back.
            while let Some(next) = self.reorder.remove(&self.expect_seq) {
                self.accept_payload(next);
            }
        } else if distance <= REORDER_WINDOW {
            self.reorder.entry(seq).or_insert(packet);
            self.pending_ack = true;
        } else {
            // Either a duplicate of something already delivered or too far
            // ahead to buffer. Re-ack so a retransmitting peer settles down.
            trace!(seq, expect = self.expect_seq, "discarding out-of-window packet");
            self.pending_ack = true;
        }
    }

    fn accept_payload(&mut self, packet: Packet) {
        self.expect_seq = self.expect_seq.wrapping_add(1);
        self.pending_ack = true;

        if packet.header.kind.is_fragment() {
            self.frag_buf.extend_from_slice(&packet.payload);
            if packet.header.is_final_fragment() {
                self.inbound.push_back(self.frag_buf.split().freeze());
            }
        } else {
            self.inbound.push_back(packet.payload);
        }
    }

    fn process_ack(&mut self, now: Instant, ack: u32) {
        while let Some(front) = self.unacked.front() {
            // `ack` is cumulative; in-flight entries are in ascending
            // sequence order.
            let distance = ack.wrapping_sub(front.packet.header.seq);
            if distance > u32::MAX / 2 {
                break;
            }

            let entry = self.unacked.pop_front().expect("front exists");
            self.unacked_bytes -= entry.packet.payload.len();

            if !entry.retransmitted {
                self.sample_rtt(now.duration_since(entry.last_sent));
            }
        }

        if self.state == StreamState::SynRecv {
            let distance = ack.wrapping_sub(self.handshake_seq);
            if distance <= u32::MAX / 2 {
                self.state = StreamState::Established;
            }
        }
    }

    fn sample_rtt(&mut self, sample: Duration) {
        let srtt = match self.srtt {
            Some(prev) => (prev * 7 + sample) / 8,
            None => sample,
        };
        self.srtt = Some(srtt);
        self.rto = (srtt * 2).clamp(INITIAL_RTO, MAX_RTO);
    }

    /// Queues one application payload for reliable, in-order delivery,
    /// fragmenting it if necessary.
    pub fn send(&mut self, now: Instant, payload: &[u8]) -> Result<(), StreamError> {
        match self.state {
            StreamState::Closing | StreamState::Closed => return Err(StreamError::StreamClosed),
            _ => {}
        }

        if self.unacked_bytes + payload.len() > MAX_SEND_QUEUE_SIZE {
            debug!(
                queued = self.unacked_bytes,
                "send queue overflow, aborting connection"
            );
            self.abort(now);
            return Err(StreamError::QueueFull);
        }

        if payload.len() >= MAX_FRAGMENT_MESSAGE_LENGTH {
            let chunks: Vec<&[u8]> = payload.chunks(MAX_FRAGMENT_MESSAGE_LENGTH).collect();
            let last = chunks.len() - 1;

            for (index, chunk) in chunks.into_iter().enumerate() {
                let kind = self.payload_kind(true);
                let mut packet = self.payload_packet(kind, chunk);
                packet.header.fragment_index = index as u16;
                if index == last {
                    packet.header.flags |= FLAG_FINAL_FRAGMENT;
                }
                self.track_and_emit(packet, now);
            }
        } else {
            let kind = self.payload_kind(false);
            let packet = self.payload_packet(kind, payload);
            self.track_and_emit(packet, now);
        }

        Ok(())
    }

    fn payload_kind(&mut self, fragment: bool) -> PacketKind {
        // Piggyback a pending acknowledgement instead of a bare ACK.
        let ack = std::mem::take(&mut self.pending_ack);
        match (fragment, ack) {
            (false, false) => PacketKind::Dat,
            (false, true) => PacketKind::DatAck,
            (true, false) => PacketKind::DatFrag,
            (true, true) => PacketKind::DatFragAck,
        }
    }

    fn payload_packet(&mut self, kind: PacketKind, payload: &[u8]) -> Packet {
        let mut header = PacketHeader::new(kind, self.next_seq());
        if kind.carries_ack() {
            header.ack = self.ack_value();
        }
        Packet {
            header,
            payload: Bytes::copy_from_slice(payload),
        }
    }

    fn track_and_emit(&mut self, packet: Packet, now: Instant) {
        self.unacked_bytes += packet.payload.len();
        self.unacked.push_back(InFlight {
            packet: packet.clone(),
            last_sent: now,
            rto: self.rto,
            retries: 0,
            retransmitted: false,
        });
        self.emit(packet, now);
    }

    fn emit(&mut self, packet: Packet, now: Instant) {
        match self.encoder.encode(&packet) {
            Ok(datagram) => {
                self.outgoing.push(datagram);
                self.last_outbound = now;
            }
            Err(e) => debug!("failed to encode packet: {e}"),
        }
    }

    /// Drives timers: retransmission, delayed acknowledgements, heartbeats,
    /// inactivity timeout and close choreography.
    pub fn pump(&mut self, now: Instant) {
        match self.state {
            StreamState::Closed => return,
            StreamState::Closing => {
                self.finish_close(now);
                return;
            }
            _ => {}
        }

        if now.duration_since(self.last_inbound) > CLIENT_TIMEOUT {
            debug!("connection timed out");
            self.state = StreamState::Closing;
            self.finish_close(now);
            return;
        }

        // Retransmit whatever is due; give up if any packet ran out of
        // attempts.
        let mut exhausted = false;
        let mut resend: Vec<Packet> = Vec::new();
        for entry in &mut self.unacked {
            if now.duration_since(entry.last_sent) < entry.rto {
                continue;
            }

            entry.retries += 1;
            if entry.retries > MAX_RETRANSMITS {
                exhausted = true;
                break;
            }

            entry.last_sent = now;
            entry.rto = (entry.rto * 2).min(MAX_RTO);
            entry.retransmitted = true;
            resend.push(entry.packet.clone());
        }

        if exhausted {
            debug!("retransmit limit reached, closing");
            self.state = StreamState::Closing;
            self.finish_close(now);
            return;
        }

        for packet in resend {
            trace!(seq = packet.header.seq, "retransmitting");
            self.emit(packet, now);
        }

        if self.pending_ack {
            self.pending_ack = false;
            let ack = Packet::control(PacketKind::Ack, self.next_seq(), self.ack_value());
            self.emit(ack, now);
        }

        if self.state == StreamState::Established
            && now.duration_since(self.last_outbound) > HEARTBEAT_INTERVAL
        {
            let hbt = Packet::control(PacketKind::Hbt, self.next_seq(), self.ack_value());
            self.emit(hbt, now);
        }
    }

    fn finish_close(&mut self, now: Instant) {
        if !self.rst_sent {
            self.rst_sent = true;
            let rst = Packet::control(PacketKind::Rst, self.next_seq(), self.ack_value());
            self.emit(rst, now);
        }

        // Unacknowledged writes and partial reassembly state are abandoned.
        self.unacked.clear();
        self.unacked_bytes = 0;
        self.reorder.clear();
        self.frag_buf.clear();
        self.state = StreamState::Closed;
    }

    /// Requests an orderly shutdown; the RST goes out on the next pump.
    pub fn close(&mut self) {
        if !matches!(self.state, StreamState::Closed) {
            self.state = StreamState::Closing;
        }
    }

    fn abort(&mut self, now: Instant) {
        self.state = StreamState::Closing;
        self.finish_close(now);
    }

    /// Pops the next in-order payload, if one is ready.
    pub fn recv(&mut self) -> Option<Bytes> {
        self.inbound.pop_front()
    }

    /// Drains the datagrams queued for the wire.
    pub fn take_outgoing(&mut self) -> Vec<Bytes> {
        std::mem::take(&mut self.outgoing)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const KEY: [u8; KEY_LEN] = [0x42; KEY_LEN];

    fn establish(now: Instant) -> (ReliableStream, ReliableStream) {
        let mut client = ReliableStream::new_client(&KEY, now);
        let mut server = ReliableStream::new_server(&KEY, now);

        shuttle(&mut client, &mut server, now);
        shuttle(&mut server, &mut client, now);
        shuttle(&mut client, &mut server, now);

        assert_eq!(client.state(), StreamState::Established);
        assert_eq!(server.state(), StreamState::Established);
        (client, server)
    }

    /// Delivers everything `from` has queued to `to`.
    fn shuttle(from: &mut ReliableStream, to: &mut ReliableStream, now: Instant) {
        for datagram in from.take_outgoing() {
            to.handle_datagram(now, &datagram).unwrap();
        }
    }

    #[test]
    fn handshake_establishes_both_sides() {
        establish(Instant::now());
    }

    #[test]
    fn in_order_delivery() {
        let now = Instant::now();
        let (mut client, mut server) = establish(now);

        client.send(now, b"first").unwrap();
        client.send(now, b"second").unwrap();
        shuttle(&mut client, &mut server, now);

        assert_eq!(server.recv().unwrap(), &b"first"[..]);
        assert_eq!(server.recv().unwrap(), &b"second"[..]);
        assert_eq!(server.recv(), None);
    }

    #[test]
    fn out_of_order_packets_are_reordered() {
        let now = Instant::now();
        let (mut client, mut server) = establish(now);

        client.send(now, b"first").unwrap();
        client.send(now, b"second").unwrap();
        client.send(now, b"third").unwrap();

        let mut datagrams = client.take_outgoing();
        datagrams.reverse();
        for datagram in datagrams {
            server.handle_datagram(now, &datagram).unwrap();
        }

        assert_eq!(server.recv().unwrap(), &b"first"[..]);
        assert_eq!(server.recv().unwrap(), &b"second"[..]);
        assert_eq!(server.recv().unwrap(), &b"third"[..]);
    }

    #[test]
    fn duplicates_are_acked_but_not_redelivered() {
        let now = Instant::now();
        let (mut client, mut server) = establish(now);

        client.send(now, b"once").unwrap();
        let datagrams = client.take_outgoing();
        for datagram in &datagrams {
            server.handle_datagram(now, datagram).unwrap();
        }
        for datagram in &datagrams {
            server.handle_datagram(now, datagram).unwrap();
        }

        assert_eq!(server.recv().unwrap(), &b"once"[..]);
        assert_eq!(server.recv(), None);

        // The duplicate still provoked an acknowledgement.
        server.pump(now);
        assert!(!server.take_outgoing().is_empty());
    }

    #[test]
    fn lost_packet_is_retransmitted_and_recovered() {
        let now = Instant::now();
        let (mut client, mut server) = establish(now);

        client.send(now, b"lost").unwrap();
        client.take_outgoing(); // Simulate the wire eating it.

        let later = now + Duration::from_secs(1);
        client.pump(later);
        shuttle(&mut client, &mut server, later);

        assert_eq!(server.recv().unwrap(), &b"lost"[..]);
    }

    #[test]
    fn retransmits_carry_identical_datagrams() {
        let now = Instant::now();
        let (mut client, _server) = establish(now);

        client.send(now, b"payload").unwrap();
        let original = client.take_outgoing().remove(0);

        let later = now + Duration::from_secs(1);
        client.pump(later);
        let retransmit = client.take_outgoing().remove(0);

        assert_eq!(original, retransmit);
    }

    #[test]
    fn fragmentation_boundary() {
        let now = Instant::now();
        let (mut client, mut server) = establish(now);

        // One byte under the limit stays a single DAT.
        client
            .send(now, &vec![0xAA; MAX_FRAGMENT_MESSAGE_LENGTH - 1])
            .unwrap();
        assert_eq!(client.take_outgoing().len(), 1);

        // Exactly at the limit is sent fragmented.
        let payload = vec![0xBB; MAX_FRAGMENT_MESSAGE_LENGTH];
        client.send(now, &payload).unwrap();
        shuttle(&mut client, &mut server, now);

        server.recv().unwrap();
        assert_eq!(server.recv().unwrap(), Bytes::from(payload));
    }

    #[test]
    fn large_payload_reassembles() {
        let now = Instant::now();
        let (mut client, mut server) = establish(now);

        let payload: Vec<u8> = (0..5000u32).map(|i| i as u8).collect();
        client.send(now, &payload).unwrap();
        shuttle(&mut client, &mut server, now);

        assert_eq!(server.recv().unwrap(), Bytes::from(payload));
    }

    #[test]
    fn send_queue_overflow_aborts() {
        let now = Instant::now();
        let (mut client, _server) = establish(now);

        let chunk = vec![0u8; MAX_FRAGMENT_MESSAGE_LENGTH - 1];
        let mut result = Ok(());
        for _ in 0..=(MAX_SEND_QUEUE_SIZE / chunk.len() + 1) {
            result = client.send(now, &chunk);
            if result.is_err() {
                break;
            }
        }

        assert!(matches!(result, Err(StreamError::QueueFull)));
        assert_eq!(client.state(), StreamState::Closed);
    }

    #[test]
    fn inactivity_times_out() {
        let now = Instant::now();
        let (_client, mut server) = establish(now);

        server.pump(now + CLIENT_TIMEOUT + Duration::from_secs(1));
        assert_eq!(server.state(), StreamState::Closed);
    }

    #[test]
    fn retransmit_limit_closes_stream() {
        let now = Instant::now();
        let (mut client, _server) = establish(now);

        client.send(now, b"never acked").unwrap();
        client.take_outgoing();

        let mut at = now;
        for _ in 0..=MAX_RETRANSMITS {
            at += MAX_RTO + Duration::from_secs(1);
            client.pump(at);
            client.take_outgoing();
        }

        assert_eq!(client.state(), StreamState::Closed);
    }

    #[test]
    fn rst_closes_peer() {
        let now = Instant::now();
        let (mut client, mut server) = establish(now);

        client.close();
        client.pump(now);
        shuttle(&mut client, &mut server, now);
        server.pump(now);

        assert_eq!(client.state(), StreamState::Closed);
        assert_eq!(server.state(), StreamState::Closed);
    }

    #[test]
    fn sequence_indexes_strictly_increase() {
        let now = Instant::now();
        let (mut client, mut server) = establish(now);

        let decoder = PacketDecoder::new(&KEY, CipherDirection::ClientToServer);

        client.send(now, b"a").unwrap();
        client.send(now, b"b").unwrap();
        client.pump(now);

        let mut last = None;
        for datagram in client.take_outgoing() {
            let packet = decoder.decode(&datagram).unwrap();
            if let Some(prev) = last {
                assert!(packet.header.seq > prev);
            }
            last = Some(packet.header.seq);
            server.handle_datagram(now, &datagram).unwrap();
        }
    }
}
