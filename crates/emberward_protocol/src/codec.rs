//! Datagram-level packet codec: pairs the header framing with the session
//! cipher. One datagram in, one packet out, and vice versa.

use bytes::{Bytes, BytesMut};

use crate::cipher::{CipherDirection, SessionCipher, KEY_LEN};
use crate::frame::{Packet, PacketHeader, MAX_DATAGRAM_SIZE, PACKET_HEADER_SIZE};
use crate::FrameError;

/// Encodes packets into sealed datagrams.
pub struct PacketEncoder {
    cipher: SessionCipher,
    buf: BytesMut,
}

impl PacketEncoder {
    pub fn new(key: &[u8; KEY_LEN], direction: CipherDirection) -> Self {
        Self {
            cipher: SessionCipher::new(key, direction),
            buf: BytesMut::new(),
        }
    }

    pub fn encode(&mut self, packet: &Packet) -> Result<Bytes, FrameError> {
        let sealed = self
            .cipher
            .seal(packet.header.seq, &packet.header.aad(), &packet.payload);

        let total = PACKET_HEADER_SIZE + sealed.len();
        if total > MAX_DATAGRAM_SIZE {
            return Err(FrameError::TooLarge(total));
        }

        self.buf.reserve(total);
        packet.header.encode(&mut self.buf);
        self.buf.extend_from_slice(&sealed);

        Ok(self.buf.split().freeze())
    }
}

/// Decodes sealed datagrams into packets.
pub struct PacketDecoder {
    cipher: SessionCipher,
}

impl PacketDecoder {
    pub fn new(key: &[u8; KEY_LEN], direction: CipherDirection) -> Self {
        Self {
            cipher: SessionCipher::new(key, direction),
        }
    }

    pub fn decode(&self, datagram: &[u8]) -> Result<Packet, FrameError> {
        if datagram.len() > MAX_DATAGRAM_SIZE {
            return Err(FrameError::TooLarge(datagram.len()));
        }

        let mut rest = datagram;
        let header = PacketHeader::decode(&mut rest)?;

        let payload = self.cipher.open(header.seq, &header.aad(), rest)?;

        Ok(Packet {
            header,
            payload: payload.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::frame::PacketKind;

    const KEY: [u8; KEY_LEN] = [0xAB; KEY_LEN];

    fn pair() -> (PacketEncoder, PacketDecoder) {
        (
            PacketEncoder::new(&KEY, CipherDirection::ServerToClient),
            PacketDecoder::new(&KEY, CipherDirection::ServerToClient),
        )
    }

    #[test]
    fn encode_decode_round_trip() {
        let (mut enc, dec) = pair();

        let mut packet = Packet::control(PacketKind::DatAck, 5, 3);
        packet.payload = Bytes::from_static(b"hello world");

        let datagram = enc.encode(&packet).unwrap();
        assert_eq!(dec.decode(&datagram).unwrap(), packet);
    }

    #[test]
    fn oversized_packet_is_rejected() {
        let (mut enc, _) = pair();

        let mut packet = Packet::control(PacketKind::Dat, 1, 0);
        packet.payload = vec![0u8; MAX_DATAGRAM_SIZE].into();

        assert!(matches!(
            enc.encode(&packet),
            Err(FrameError::TooLarge(_))
        ));
    }

    #[test]
    fn flipped_header_byte_fails_auth() {
        let (mut enc, dec) = pair();

        let packet = Packet::control(PacketKind::Hbt, 9, 9);
        let mut datagram = BytesMut::from(&enc.encode(&packet).unwrap()[..]);

        // Corrupt the ack field; the AAD no longer matches the tag.
        datagram[6] ^= 0x01;
        assert!(matches!(
            dec.decode(&datagram),
            Err(FrameError::AuthFailure)
        ));
    }

    #[test]
    fn wrong_key_fails_auth() {
        let (mut enc, _) = pair();
        let other = PacketDecoder::new(&[0xCD; KEY_LEN], CipherDirection::ServerToClient);

        let packet = Packet::control(PacketKind::Syn, 0, 0);
        let datagram = enc.encode(&packet).unwrap();

        assert!(matches!(
            other.decode(&datagram),
            Err(FrameError::AuthFailure)
        ));
    }
}
