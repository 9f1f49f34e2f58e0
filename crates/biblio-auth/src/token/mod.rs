//! Signed token encoding, decoding, and claims management.

pub mod claims;
pub mod codec;

pub use claims::{Claims, TokenClass};
pub use codec::TokenCodec;

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hex digest of a token string.
///
/// Session records store these digests, never raw tokens, so that a leaked
/// store dump cannot be replayed as credentials.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write;
        let _ = write!(out, "{byte:02x}");
    }
    out
}
