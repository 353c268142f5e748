//! CBOR encoding and length-prefixed framing.
//!
//! Every message on the wire is a 4-byte big-endian length followed by a CBOR
//! body of exactly that many bytes.

use crate::error::{ProtocolError, ProtocolResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Size of the frame length prefix.
pub const FRAME_HEADER_LEN: usize = 4;

/// Largest accepted frame body (16 MiB).
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Encodes a value to CBOR bytes.
pub fn to_cbor<T: Serialize>(value: &T) -> ProtocolResult<Vec<u8>> {
    let mut out = Vec::new();
    ciborium::into_writer(value, &mut out)
        .map_err(|e| ProtocolError::encoding_failed(e.to_string()))?;
    Ok(out)
}

/// Decodes a value from CBOR bytes.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> ProtocolResult<T> {
    ciborium::from_reader(bytes).map_err(|e| ProtocolError::decoding_failed(e.to_string()))
}

/// Prepends the length header to an encoded body.
pub fn frame(body: &[u8]) -> ProtocolResult<Vec<u8>> {
    check_frame_len(body.len())?;
    let mut out = Vec::with_capacity(FRAME_HEADER_LEN + body.len());
    // check_frame_len bounds the length well below u32::MAX
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(body);
    Ok(out)
}

/// Validates a body length read from a frame header.
pub fn check_frame_len(len: usize) -> ProtocolResult<()> {
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            size: len,
            limit: MAX_FRAME_LEN,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_prefixes_length() {
        let framed = frame(&[1, 2, 3]).unwrap();
        assert_eq!(framed, vec![0, 0, 0, 3, 1, 2, 3]);
    }

    #[test]
    fn oversized_frames_are_rejected() {
        assert!(check_frame_len(MAX_FRAME_LEN).is_ok());
        assert_eq!(
            check_frame_len(MAX_FRAME_LEN + 1),
            Err(ProtocolError::FrameTooLarge {
                size: MAX_FRAME_LEN + 1,
                limit: MAX_FRAME_LEN,
            })
        );
    }

    #[test]
    fn decoding_wrong_shape_fails() {
        let bytes = to_cbor(&"just a string").unwrap();
        let result: ProtocolResult<Vec<u32>> = from_cbor(&bytes);
        assert!(matches!(result, Err(ProtocolError::DecodingFailed { .. })));
    }
}
