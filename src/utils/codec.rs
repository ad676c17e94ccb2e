// src/utils/codec.rs
//! Encoding primitives shared by every component of the wallet.
//!
//! - base64url (RFC 4648 §5) without padding on output, lenient on input
//! - base58 with a selectable alphabet (Bitcoin by default)
//! - unsigned-varint multicodec prefixing
//! - hex
//!
//! All functions are pure. Decoders return the underlying crate's error so
//! callers can fold it into their own failure kind.

pub use bs58::Alphabet;

/// Bitcoin base58 alphabet, as used by multibase `z` and `did:key`.
pub const BITCOIN_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Multicodec code for an uncompressed-or-compressed P-256 public key.
pub const P256_PUB_MULTICODEC: u64 = 0x1200;

/// Encodes bytes as base64url without padding.
pub fn base64url_encode(data: impl AsRef<[u8]>) -> String {
    base64::encode_config(data, base64::URL_SAFE_NO_PAD)
}

/// Decodes base64url or standard base64, padded or not.
pub fn base64url_decode(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let normalized: String = input
        .trim()
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    base64::decode_config(normalized, base64::URL_SAFE_NO_PAD)
}

/// WebAuthn flavour of [`base64url_encode`] for authenticator buffers.
pub fn buffer_encode(buffer: &[u8]) -> String {
    base64url_encode(buffer)
}

/// Reverse of [`buffer_encode`].
pub fn buffer_decode(value: &str) -> Result<Vec<u8>, base64::DecodeError> {
    base64url_decode(value)
}

/// Big-endian base58 encoding. Each leading zero byte maps to one
/// `alphabet[0]` character.
pub fn base58_encode(data: &[u8], alphabet: &Alphabet) -> String {
    bs58::encode(data).with_alphabet(alphabet).into_string()
}

pub fn base58_decode(input: &str, alphabet: &Alphabet) -> Result<Vec<u8>, bs58::decode::Error> {
    bs58::decode(input).with_alphabet(alphabet).into_vec()
}

/// Prepends the unsigned-varint encoding of `code` to `data`.
pub fn multicodec_prefix(code: u64, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 10);
    let mut value = code;
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
    out.extend_from_slice(data);
    out
}

pub fn hex_encode(data: impl AsRef<[u8]>) -> String {
    hex::encode(data)
}

pub fn hex_decode(input: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(input.trim_start_matches("0x"))
}

/// Serde adapter for byte fields carried as base64url strings on the wire.
pub mod base64url_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::base64url_encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        super::base64url_decode(&encoded).map_err(serde::de::Error::custom)
    }
}
