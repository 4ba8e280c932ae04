//! Portable text encoding for binary values
//!
//! Salt, IV and ciphertext cross the crate boundary as base64 in the
//! standard alphabet, with padding and without line wraps.

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::error::{ErrorCategory, ErrorKind, PwsealError, Result};

/// Encode bytes as portable text.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode portable text back into bytes.
pub fn decode(text: &str) -> Result<Vec<u8>> {
    STANDARD.decode(text).map_err(|e| {
        PwsealError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::EncodingInvalid,
            format!("base64 decoding failed: {}", e),
            e,
        )
    })
}

/// Decode portable text that must hold exactly `N` bytes.
///
/// `what` names the value in the error message.
pub fn decode_fixed<const N: usize>(text: &str, what: &str) -> Result<[u8; N]> {
    let bytes = decode(text).map_err(|e| e.with_context(format!("invalid {}", what)))?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| {
        PwsealError::with_kind(
            ErrorCategory::User,
            ErrorKind::EncodingInvalid,
            format!("{} must be {} bytes, got {}", what, N, len),
        )
    })
}
