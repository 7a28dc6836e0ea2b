//! Validation of the opaque binary blobs clients upload.
//!
//! Several request fields carry size-delimited entry lists which, in some
//! sub-contexts, embed a serialized session-search record the game uses to
//! bootstrap peer-to-peer connections. The retail client parses that record
//! with no bounds checking; a crafted blob relayed through the server is a
//! reliable remote-code-execution vector (CVE-2022-24126). Every such blob
//! is validated here before it is cached, relayed, or persisted. Valid blobs
//! are otherwise treated as opaque.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use thiserror::Error;

/// Signature identifying a session-search record inside an entry payload.
pub const NRSSR_SIGNATURE: u32 = 0x5652_584E;

/// Record version the validator understands. The retail client rejects
/// anything else, so flagged-but-valid data cannot occur in practice.
pub const NRSSR_VERSION: u16 = 0x8405;

/// Size in bytes of the session-data field. On PC this is always 8 and holds
/// the lobby id the client should connect to.
const SESSION_DATA_SIZE: usize = 8;

/// Size in bytes of the host online-id field.
const HOST_ONLINE_ID_SIZE: usize = 8;

/// Client stack buffer sizes, in UTF-16 code units, for property strings and
/// the host name string.
const MAX_PROP_STRING_UNITS: usize = 1024;
const MAX_NAME_STRING_UNITS: usize = 256;

/// Why a blob was rejected.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("an entry size field does not match the remaining data")]
    EntryListSizeMismatch,
    #[error("session record signature or version mismatch")]
    SignatureOrVersionMismatch,
    #[error("not enough data to read property metadata")]
    PropertyMetadataTruncated,
    #[error("invalid property type tag")]
    InvalidPropertyType,
    #[error("not enough data for a 4-byte property")]
    Property4ByteTruncated,
    #[error("not enough data for an 8-byte property")]
    Property8ByteTruncated,
    #[error("property string overflows the client buffer or is unterminated")]
    PropertyStringOverflow,
    #[error("host name string overflows the client buffer or is unterminated")]
    NameStringOverflow,
    #[error("unexpected amount of data after the host name")]
    RemainingDataSizeMismatch,
    #[error("session size field does not hold the expected value")]
    SessionSizeAbnormal,
}

/// Validates a size-delimited entry list: a concatenation of
/// `(4-byte tag, 4-byte size, size bytes of payload)` entries whose sizes
/// must exactly consume the buffer. Any entry that looks like a
/// session-search record is fully validated as one.
pub fn validate_entry_list(data: &[u8]) -> Result<(), ValidationError> {
    let mut pos = 0;

    while pos + 8 <= data.len() {
        let entry_size = LittleEndian::read_u32(&data[pos + 4..pos + 8]) as usize;
        let payload_start = pos + 8;
        let payload_end = payload_start
            .checked_add(entry_size)
            .ok_or(ValidationError::EntryListSizeMismatch)?;

        if payload_end > data.len() {
            return Err(ValidationError::EntryListSizeMismatch);
        }

        let payload = &data[payload_start..payload_end];
        if has_nrssr_signature(payload) {
            validate_nrssr(payload)?;
        }

        pos = payload_end;
    }

    // Every byte must be accounted for.
    if pos == data.len() {
        Ok(())
    } else {
        Err(ValidationError::EntryListSizeMismatch)
    }
}

/// Whether a payload starts with the session-search signature and version.
pub fn has_nrssr_signature(data: &[u8]) -> bool {
    data.len() >= 6
        && LittleEndian::read_u32(&data[0..4]) == NRSSR_SIGNATURE
        && LittleEndian::read_u16(&data[4..6]) == NRSSR_VERSION
}

/// Validates a serialized session-search record: a property count, that many
/// typed properties, a host name string, the host online id, and a session
/// size field which is big-endian where everything else is little-endian.
pub fn validate_nrssr(data: &[u8]) -> Result<(), ValidationError> {
    if !has_nrssr_signature(data) {
        return Err(ValidationError::SignatureOrVersionMismatch);
    }

    if data.len() < 7 {
        return Err(ValidationError::PropertyMetadataTruncated);
    }
    let property_count = data[6];

    let mut pos = 7;
    for _ in 0..property_count {
        // Four bytes of property id and an unknown byte precede the type
        // tag; only the sizes matter here.
        if data.len() - pos < 6 {
            return Err(ValidationError::PropertyMetadataTruncated);
        }
        let type_tag = data[pos + 4];
        pos += 6;

        match type_tag {
            1 => {
                if data.len() - pos < 4 {
                    return Err(ValidationError::Property4ByteTruncated);
                }
                pos += 4;
            }
            2 | 3 => {
                if data.len() - pos < 8 {
                    return Err(ValidationError::Property8ByteTruncated);
                }
                pos += 8;
            }
            4 => {
                let units = utf16_units_until_nul(&data[pos..])
                    .ok_or(ValidationError::PropertyStringOverflow)?;
                if units >= MAX_PROP_STRING_UNITS {
                    return Err(ValidationError::PropertyStringOverflow);
                }
                pos += 2 * (units + 1);
            }
            _ => return Err(ValidationError::InvalidPropertyType),
        }
    }

    let units =
        utf16_units_until_nul(&data[pos..]).ok_or(ValidationError::NameStringOverflow)?;
    if units >= MAX_NAME_STRING_UNITS {
        return Err(ValidationError::NameStringOverflow);
    }
    pos += 2 * (units + 1);

    if data.len() - pos != 2 + HOST_ONLINE_ID_SIZE + SESSION_DATA_SIZE {
        return Err(ValidationError::RemainingDataSizeMismatch);
    }

    let session_size = BigEndian::read_u16(
        &data[pos + HOST_ONLINE_ID_SIZE..pos + HOST_ONLINE_ID_SIZE + 2],
    );
    if session_size as usize != SESSION_DATA_SIZE {
        return Err(ValidationError::SessionSizeAbnormal);
    }

    Ok(())
}

/// Counts UTF-16 code units before the nul terminator, or `None` if the data
/// ends (or runs out of whole units) before one is found.
fn utf16_units_until_nul(data: &[u8]) -> Option<usize> {
    let mut units = 0;
    let mut chunks = data.chunks_exact(2);
    for chunk in &mut chunks {
        if chunk[0] == 0 && chunk[1] == 0 {
            return Some(units);
        }
        units += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use bytes::BufMut;

    use super::*;

    fn entry(tag: u32, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.put_u32_le(tag);
        out.put_u32_le(payload.len() as u32);
        out.extend_from_slice(payload);
        out
    }

    fn utf16(text: &str) -> Vec<u8> {
        let mut out = Vec::new();
        for unit in text.encode_utf16() {
            out.put_u16_le(unit);
        }
        out.put_u16_le(0);
        out
    }

    /// A minimal well-formed session-search record.
    fn nrssr(properties: &[(u8, Vec<u8>)], host_name: &str, session_size: u16) -> Vec<u8> {
        let mut out = Vec::new();
        out.put_u32_le(NRSSR_SIGNATURE);
        out.put_u16_le(NRSSR_VERSION);
        out.put_u8(properties.len() as u8);
        for (type_tag, body) in properties {
            out.put_u32_le(0x1234); // property id
            out.put_u8(*type_tag);
            out.put_u8(0);
            out.extend_from_slice(body);
        }
        out.extend_from_slice(&utf16(host_name));
        out.extend_from_slice(&[0u8; HOST_ONLINE_ID_SIZE]);
        out.put_u16(session_size);
        out.extend_from_slice(&[0u8; SESSION_DATA_SIZE]);
        out
    }

    #[test]
    fn empty_list_is_valid() {
        assert_eq!(validate_entry_list(&[]), Ok(()));
    }

    #[test]
    fn plain_entries_are_valid() {
        let mut list = entry(1, b"abc");
        list.extend(entry(2, b""));
        list.extend(entry(3, &[0xFF; 64]));
        assert_eq!(validate_entry_list(&list), Ok(()));
    }

    #[test]
    fn oversized_entry_is_rejected() {
        // Declares 10000 bytes but only 100 follow.
        let mut list = Vec::new();
        list.put_u32_le(1);
        list.put_u32_le(10000);
        list.extend_from_slice(&[0u8; 100]);
        assert_eq!(
            validate_entry_list(&list),
            Err(ValidationError::EntryListSizeMismatch)
        );
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut list = entry(1, b"abc");
        list.extend_from_slice(&[0u8; 3]);
        assert_eq!(
            validate_entry_list(&list),
            Err(ValidationError::EntryListSizeMismatch)
        );
    }

    #[test]
    fn valid_session_record_passes() {
        let record = nrssr(
            &[
                (1, vec![0u8; 4]),
                (2, vec![0u8; 8]),
                (4, utf16("lobby")),
            ],
            "host",
            SESSION_DATA_SIZE as u16,
        );
        assert_eq!(validate_nrssr(&record), Ok(()));

        let list = entry(9, &record);
        assert_eq!(validate_entry_list(&list), Ok(()));
    }

    #[test]
    fn bad_property_type_is_rejected() {
        let record = nrssr(&[(9, vec![])], "host", SESSION_DATA_SIZE as u16);
        assert_eq!(
            validate_nrssr(&record),
            Err(ValidationError::InvalidPropertyType)
        );
    }

    #[test]
    fn unterminated_host_name_is_rejected() {
        let mut record = Vec::new();
        record.put_u32_le(NRSSR_SIGNATURE);
        record.put_u16_le(NRSSR_VERSION);
        record.put_u8(0);
        // Name with no terminator runs to the end of the buffer.
        for unit in "endless".encode_utf16() {
            record.put_u16_le(unit);
        }
        assert_eq!(
            validate_nrssr(&record),
            Err(ValidationError::NameStringOverflow)
        );
    }

    #[test]
    fn wrong_session_size_is_rejected() {
        let record = nrssr(&[], "host", 9);
        assert_eq!(
            validate_nrssr(&record),
            Err(ValidationError::SessionSizeAbnormal)
        );
    }

    #[test]
    fn truncated_property_is_rejected() {
        let mut record = Vec::new();
        record.put_u32_le(NRSSR_SIGNATURE);
        record.put_u16_le(NRSSR_VERSION);
        record.put_u8(1);
        record.put_u32_le(0x1234);
        record.put_u8(1);
        record.put_u8(0);
        record.put_u16_le(0); // Only two of the four declared bytes.
        assert_eq!(
            validate_nrssr(&record),
            Err(ValidationError::Property4ByteTruncated)
        );
    }

    #[test]
    fn entry_embedding_bad_record_is_rejected() {
        let record = nrssr(&[], "host", 9);
        let list = entry(1, &record);
        assert_eq!(
            validate_entry_list(&list),
            Err(ValidationError::SessionSizeAbnormal)
        );
    }
}
