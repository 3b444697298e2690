//! Byte-level encodings used by the authorization flow.
//!
//! Three primitives live here: RFC 4122 version-4 UUID formatting from raw
//! random bytes, base64url without padding (RFC 4648 §5), and the S256 PKCE
//! challenge transform `BASE64URL(SHA256(input))` from RFC 7636 §4.2.
//!
//! Everything in this module is pure and deterministic; randomness quality is
//! the caller's responsibility.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};

/// Formats 16 raw bytes as a version-4 UUID string.
///
/// Bits 4–7 of byte 6 are forced to `0100` (version 4) and bits 6–7 of
/// byte 8 to `10` (RFC 4122 variant), per RFC 4122 §4.4. All other bits are
/// taken from the input unchanged, so the output is deterministic given the
/// input bytes.
#[must_use]
pub fn uuid_v4(bytes: [u8; 16]) -> String {
    uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .to_string()
}

/// Encodes bytes as base64url without padding.
#[must_use]
pub fn base64url_encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decodes a base64url string, with or without trailing `=` padding.
///
/// # Errors
///
/// Returns a decode error if the input is not valid base64url.
pub fn base64url_decode(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    // The no-pad engine re-derives the length itself; padding just has to go.
    URL_SAFE_NO_PAD.decode(input.trim_end_matches('='))
}

/// Computes the S256 PKCE code challenge: `BASE64URL(SHA256(input))`.
#[must_use]
pub fn sha256_base64url(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}
