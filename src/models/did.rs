// src/models/did.rs
//! Key and identifier types owned by the DID key manager.
//!
//! Keys are exported as JSON Web Keys (RFC 7517) so the caller can hand them
//! to whatever store it uses. The `did:key` identifier is derived from the
//! public half and never changes once computed.

use serde::{Deserialize, Serialize};

/// An EC JSON Web Key on curve P-256.
///
/// `d` is present only on the private half.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Jwk {
    /// Key type, always `"EC"`
    pub kty: String,

    /// Curve name, always `"P-256"`
    pub crv: String,

    /// base64url X coordinate (32 bytes)
    pub x: String,

    /// base64url Y coordinate (32 bytes)
    pub y: String,

    /// base64url private scalar (32 bytes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,

    /// Extractable flag, mirrors WebCrypto exports
    #[serde(default)]
    pub ext: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_ops: Vec<String>,
}

/// Result of [`crate::wallet::key_management::DidKeyManager::generate_key_and_did`].
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DidKeyPair {
    /// `did:key:z...` identifier of the public key
    pub did: String,

    pub private_key: Jwk,

    pub public_key: Jwk,
}
