//! Per-session AEAD cipher.
//!
//! Each session is keyed with the 16-byte symmetric key carried by its auth
//! ticket. Packets are sealed with AES-128-GCM; the 12-byte nonce is derived
//! from the packet sequence index, a salt taken from the session key, and a
//! direction byte so the two halves of a connection never share a nonce.
//! Retransmits reuse the sequence index deliberately: same key, same nonce,
//! same plaintext.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Key, Nonce};

use crate::FrameError;

/// Length of the session key in bytes.
pub const KEY_LEN: usize = 16;

/// Length of the authentication tag appended to every sealed payload.
pub const TAG_LEN: usize = 16;

const NONCE_LEN: usize = 12;

/// Which half of the connection is sealing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CipherDirection {
    ClientToServer = 0x01,
    ServerToClient = 0x02,
}

impl CipherDirection {
    pub fn flipped(self) -> Self {
        match self {
            Self::ClientToServer => Self::ServerToClient,
            Self::ServerToClient => Self::ClientToServer,
        }
    }
}

/// Seals and opens packet payloads for one direction of a session.
pub struct SessionCipher {
    cipher: Aes128Gcm,
    salt: [u8; 7],
    direction: CipherDirection,
}

impl SessionCipher {
    pub fn new(key: &[u8; KEY_LEN], direction: CipherDirection) -> Self {
        let mut salt = [0; 7];
        salt.copy_from_slice(&key[9..16]);

        Self {
            cipher: Aes128Gcm::new(Key::<Aes128Gcm>::from_slice(key)),
            salt,
            direction,
        }
    }

    fn nonce(&self, seq: u32) -> [u8; NONCE_LEN] {
        let mut nonce = [0; NONCE_LEN];
        nonce[0] = self.direction as u8;
        nonce[1..8].copy_from_slice(&self.salt);
        nonce[8..12].copy_from_slice(&seq.to_be_bytes());
        nonce
    }

    /// Encrypts `plaintext` for the packet with sequence index `seq`,
    /// authenticating `aad` alongside it. The tag is appended.
    pub fn seal(&self, seq: u32, aad: &[u8], plaintext: &[u8]) -> Vec<u8> {
        let nonce = self.nonce(seq);

        self.cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .expect("AES-GCM encryption is infallible for in-memory buffers")
    }

    /// Decrypts and authenticates a sealed payload. Tampered or misdirected
    /// packets surface as [`FrameError::AuthFailure`] and are dropped by the
    /// caller without a response.
    pub fn open(&self, seq: u32, aad: &[u8], sealed: &[u8]) -> Result<Vec<u8>, FrameError> {
        if sealed.len() < TAG_LEN {
            return Err(FrameError::AuthFailure);
        }

        let nonce = self.nonce(seq);

        self.cipher
            .decrypt(Nonce::from_slice(&nonce), Payload { msg: sealed, aad })
            .map_err(|_| FrameError::AuthFailure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; KEY_LEN] = [
        0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1A, 0x1B, 0x1C, 0x1D, 0x1E,
        0x1F,
    ];

    #[test]
    fn seal_open_round_trip() {
        let sealer = SessionCipher::new(&KEY, CipherDirection::ServerToClient);
        let opener = SessionCipher::new(&KEY, CipherDirection::ServerToClient);

        let sealed = sealer.seal(42, b"aad", b"payload");
        assert_eq!(opener.open(42, b"aad", &sealed).unwrap(), b"payload");
    }

    #[test]
    fn wrong_direction_fails_auth() {
        let sealer = SessionCipher::new(&KEY, CipherDirection::ClientToServer);
        let opener = SessionCipher::new(&KEY, CipherDirection::ServerToClient);

        let sealed = sealer.seal(1, b"", b"payload");
        assert!(matches!(
            opener.open(1, b"", &sealed),
            Err(FrameError::AuthFailure)
        ));
    }

    #[test]
    fn tampered_payload_fails_auth() {
        let cipher = SessionCipher::new(&KEY, CipherDirection::ClientToServer);

        let mut sealed = cipher.seal(7, b"hdr", b"payload");
        sealed[0] ^= 0x01;
        assert!(matches!(
            cipher.open(7, b"hdr", &sealed),
            Err(FrameError::AuthFailure)
        ));
    }

    #[test]
    fn wrong_seq_fails_auth() {
        let cipher = SessionCipher::new(&KEY, CipherDirection::ClientToServer);

        let sealed = cipher.seal(7, b"", b"payload");
        assert!(matches!(
            cipher.open(8, b"", &sealed),
            Err(FrameError::AuthFailure)
        ));
    }

    #[test]
    fn empty_payload_is_still_authenticated() {
        let cipher = SessionCipher::new(&KEY, CipherDirection::ClientToServer);

        let sealed = cipher.seal(1, b"hdr", b"");
        assert_eq!(sealed.len(), TAG_LEN);
        assert_eq!(cipher.open(1, b"hdr", &sealed).unwrap(), b"");
    }
}
