//! Packet framing for the reliable-UDP layer.
//!
//! Each UDP datagram carries exactly one packet: a fixed 12-byte header
//! followed by an encrypted payload (empty for control packets, but still
//! authenticated). All header fields are big-endian.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::FrameError;

/// Maximum size of a single on-wire datagram, header and tag included.
pub const MAX_DATAGRAM_SIZE: usize = 2048;

/// Size of the packet header in bytes.
pub const PACKET_HEADER_SIZE: usize = 12;

/// Discriminates the packet types of the reliable-UDP layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketKind {
    /// Connection open request (client → server).
    Syn = 0x01,
    /// Connection open acknowledgement (server → client).
    SynAck = 0x02,
    /// Bare acknowledgement carrying no payload.
    Ack = 0x03,
    /// Payload packet.
    Dat = 0x04,
    /// Payload packet piggybacking an acknowledgement.
    DatAck = 0x05,
    /// Fragment of a payload too large for one packet.
    DatFrag = 0x06,
    /// Fragment piggybacking an acknowledgement.
    DatFragAck = 0x07,
    /// Heartbeat keeping an idle connection alive.
    Hbt = 0x08,
    /// Connection reset.
    Rst = 0x09,
}

impl PacketKind {
    pub fn from_u8(raw: u8) -> Option<Self> {
        Some(match raw {
            0x01 => Self::Syn,
            0x02 => Self::SynAck,
            0x03 => Self::Ack,
            0x04 => Self::Dat,
            0x05 => Self::DatAck,
            0x06 => Self::DatFrag,
            0x07 => Self::DatFragAck,
            0x08 => Self::Hbt,
            0x09 => Self::Rst,
            _ => return None,
        })
    }

    /// Whether the `ack` header field is meaningful for this type.
    pub fn carries_ack(self) -> bool {
        matches!(
            self,
            Self::SynAck | Self::Ack | Self::DatAck | Self::DatFragAck | Self::Hbt
        )
    }

    /// Whether this type carries application payload.
    pub fn carries_payload(self) -> bool {
        matches!(
            self,
            Self::Dat | Self::DatAck | Self::DatFrag | Self::DatFragAck
        )
    }

    /// Whether this type is a fragment of a larger payload.
    pub fn is_fragment(self) -> bool {
        matches!(self, Self::DatFrag | Self::DatFragAck)
    }
}

/// Marks the last fragment of a fragmented payload.
pub const FLAG_FINAL_FRAGMENT: u8 = 0b0000_0001;

/// The fixed-layout packet header.
///
/// Layout on the wire:
///
/// ```text
/// offset 0  u8   kind
/// offset 1  u8   flags
/// offset 2  u32  sequence index
/// offset 6  u32  acknowledged index
/// offset 10 u16  fragment index
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PacketHeader {
    pub kind: PacketKind,
    pub flags: u8,
    /// Monotonically increasing per-connection sequence index.
    pub seq: u32,
    /// Highest in-order sequence index received from the peer. Only
    /// meaningful when [`PacketKind::carries_ack`] holds; echoed back
    /// verbatim otherwise.
    pub ack: u32,
    /// Ordinal of this fragment within its message; zero for whole payloads.
    pub fragment_index: u16,
}

impl PacketHeader {
    pub fn new(kind: PacketKind, seq: u32) -> Self {
        Self {
            kind,
            flags: 0,
            seq,
            ack: 0,
            fragment_index: 0,
        }
    }

    pub fn is_final_fragment(&self) -> bool {
        self.flags & FLAG_FINAL_FRAGMENT != 0
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.kind as u8);
        buf.put_u8(self.flags);
        buf.put_u32(self.seq);
        buf.put_u32(self.ack);
        buf.put_u16(self.fragment_index);
    }

    pub fn decode(buf: &mut impl Buf) -> Result<Self, FrameError> {
        if buf.remaining() < PACKET_HEADER_SIZE {
            return Err(FrameError::Malformed("datagram shorter than header"));
        }

        let kind = PacketKind::from_u8(buf.get_u8())
            .ok_or(FrameError::Malformed("unknown packet type"))?;

        Ok(Self {
            kind,
            flags: buf.get_u8(),
            seq: buf.get_u32(),
            ack: buf.get_u32(),
            fragment_index: buf.get_u16(),
        })
    }

    /// The header bytes as additional authenticated data for the cipher.
    pub fn aad(&self) -> [u8; PACKET_HEADER_SIZE] {
        let mut out = [0; PACKET_HEADER_SIZE];
        out[0] = self.kind as u8;
        out[1] = self.flags;
        out[2..6].copy_from_slice(&self.seq.to_be_bytes());
        out[6..10].copy_from_slice(&self.ack.to_be_bytes());
        out[10..12].copy_from_slice(&self.fragment_index.to_be_bytes());
        out
    }
}

/// A single reliable-UDP packet with its decrypted payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    pub header: PacketHeader,
    pub payload: Bytes,
}

impl Packet {
    pub fn control(kind: PacketKind, seq: u32, ack: u32) -> Self {
        let mut header = PacketHeader::new(kind, seq);
        header.ack = ack;
        Self {
            header,
            payload: Bytes::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn header_round_trip() {
        let header = PacketHeader {
            kind: PacketKind::DatFragAck,
            flags: FLAG_FINAL_FRAGMENT,
            seq: 0xDEAD_BEEF,
            ack: 0x0102_0304,
            fragment_index: 7,
        };

        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        assert_eq!(buf.len(), PACKET_HEADER_SIZE);
        assert_eq!(&buf[..], &header.aad());

        let decoded = PacketHeader::decode(&mut buf.freeze()).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn short_datagram_is_malformed() {
        let err = PacketHeader::decode(&mut &[0x04u8, 0x00][..]).unwrap_err();
        assert!(matches!(err, FrameError::Malformed(_)));
    }

    #[test]
    fn unknown_kind_is_malformed() {
        let bytes = [0xFFu8; PACKET_HEADER_SIZE];
        let err = PacketHeader::decode(&mut &bytes[..]).unwrap_err();
        assert!(matches!(err, FrameError::Malformed(_)));
    }
}
