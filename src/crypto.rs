//! Small cryptographic helpers used by the authentication gate.

use base64::Engine;

/// Encodes bytes to standard base64.
#[must_use]
pub fn base64_encode(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// Decodes a standard base64 string to bytes.
pub fn base64_decode(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    base64::engine::general_purpose::STANDARD.decode(data)
}
