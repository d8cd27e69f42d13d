//! Hashing helpers for unique-index columns.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of the lowercased input.
///
/// Used for the `ap_id_hash` and `domain_hash` unique columns, which index
/// long IRIs and hostnames without a key-length limit.
#[must_use]
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.to_lowercase().as_bytes());
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex_is_case_insensitive() {
        assert_eq!(
            sha256_hex("https://Example.COM/users/alice"),
            sha256_hex("https://example.com/users/alice")
        );
    }

    #[test]
    fn test_sha256_hex_known_value() {
        // SHA-256 of "example.com"
        assert_eq!(
            sha256_hex("example.com"),
            "a379a6f6eeafb9a55e378c118034e2751e682fab9f2d30ab13d2125586ce1947"
        );
    }

    #[test]
    fn test_sha256_hex_length() {
        assert_eq!(sha256_hex("anything").len(), 64);
    }
}
