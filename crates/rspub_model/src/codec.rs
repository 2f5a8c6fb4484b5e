//! CBOR encoding for persisted values.
//!
//! Store blobs are written as a small envelope:
//!
//! ```text
//! +--------+---------+------------------+
//! | magic  | version | CBOR payload     |
//! | 4 bytes| u16 LE  | serde / ciborium |
//! +--------+---------+------------------+
//! ```
//!
//! Encoding is deterministic for the types in this crate: maps are
//! `BTreeMap`s and struct fields serialize in declaration order, so equal
//! values always produce identical bytes.

use crate::error::{CodecError, CodecResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Size of the envelope header (magic + version).
pub const HEADER_LEN: usize = 6;

/// Encodes a value to CBOR bytes.
pub fn to_cbor<T: Serialize>(value: &T) -> CodecResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf)
        .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
    Ok(buf)
}

/// Decodes a value from CBOR bytes.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    ciborium::from_reader(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))
}

/// Encodes a value wrapped in a versioned envelope.
pub fn encode_envelope<T: Serialize>(magic: [u8; 4], version: u16, value: &T) -> CodecResult<Vec<u8>> {
    let payload = to_cbor(value)?;
    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.extend_from_slice(&magic);
    buf.extend_from_slice(&version.to_le_bytes());
    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Decodes a versioned envelope.
///
/// Returns the stored version together with the value. Envelopes written by
/// a version newer than `max_version` are rejected.
pub fn decode_envelope<T: DeserializeOwned>(
    magic: [u8; 4],
    max_version: u16,
    bytes: &[u8],
) -> CodecResult<(u16, T)> {
    if bytes.len() < HEADER_LEN {
        return Err(CodecError::UnexpectedEof);
    }
    if bytes[0..4] != magic {
        return Err(CodecError::InvalidMagic {
            expected: magic,
            found: bytes[0..4].to_vec(),
        });
    }

    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version > max_version {
        return Err(CodecError::UnsupportedVersion {
            found: version,
            supported: max_version,
        });
    }

    let value = from_cbor(&bytes[HEADER_LEN..])?;
    Ok((version, value))
}
