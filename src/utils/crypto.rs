// src/utils/crypto.rs
//! Hashing utilities.
//!
//! SHA-256 via `ring`, the same provider that backs key generation.

use ring::digest::{digest, SHA256};

use crate::utils::codec::hex_encode;

/// Computes the SHA-256 digest of the input data.
///
/// # Arguments
/// * `data` - Binary data to hash
///
/// # Returns
/// Fixed-size 32-byte array containing the digest.
pub fn hash_data(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(digest(&SHA256, data).as_ref());
    out
}

/// Lowercase hex SHA-256 of a UTF-8 message.
///
/// Stored credentials are keyed by this value.
pub fn sha256_hex(message: &str) -> String {
    hex_encode(hash_data(message.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex_known_vectors() {
        assert_eq!(
            sha256_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
