// src/wallet/key_management.rs
//! Key generation and `did:key` derivation for the wallet holder.
//!
//! Generates a P-256 (secp256r1) key pair, exports both halves as JWK and
//! derives the holder's `did:key` from the compressed public key:
//!
//! ```text
//! did:key:z + base58btc( 0x80 0x24 || (0x02|0x03) || X )
//! ```
//!
//! The crypto provider is pluggable through [`KeyProvider`]; the default is
//! backed by `ring`.

use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_FIXED_SIGNING};

use crate::error::{WalletError, WalletResult};
use crate::models::did::{DidKeyPair, Jwk};
use crate::utils::codec::{base58_encode, base64url_encode, multicodec_prefix, Alphabet, P256_PUB_MULTICODEC};
use crate::utils::crypto;
use crate::wallet::credential_storage::CredentialStore;

/// Offset of the private scalar inside a P-256 PKCS#8 document.
pub const PKCS8_SCALAR_OFFSET: usize = 36;

/// Length of the P-256 private scalar and of each public coordinate.
pub const P256_FIELD_LEN: usize = 32;

/// Length of an uncompressed SEC1 P-256 point (`0x04 || X || Y`).
pub const P256_RAW_PUBLIC_LEN: usize = 65;

pub const DID_KEY_PREFIX: &str = "did:key:z";

/// Settings keys under which [`DidKeyManager::ensure_identity`] persists the holder.
pub const SETTING_DID: &str = "did";
pub const SETTING_PRIVATE_KEY: &str = "privateKey";
pub const SETTING_PUBLIC_KEY: &str = "publicKey";

/// Key material as exported by a provider.
#[derive(Debug, Clone)]
pub struct GeneratedKey {
    /// PKCS#8 v1 DER document of the private key
    pub pkcs8: Vec<u8>,
    /// Uncompressed SEC1 public key
    pub public_key: Vec<u8>,
}

#[derive(Debug, Clone)]
pub enum ProviderError {
    /// The provider cannot do P-256 at all.
    Unsupported(String),
    Failed(String),
}

/// Platform elliptic-curve provider.
pub trait KeyProvider: Send + Sync {
    /// Generates a fresh, extractable P-256 signing key.
    fn generate_p256(&self) -> Result<GeneratedKey, ProviderError>;
}

/// [`KeyProvider`] backed by `ring`.
pub struct RingKeyProvider {
    rng: SystemRandom,
}

impl RingKeyProvider {
    pub fn new() -> Self {
        RingKeyProvider { rng: SystemRandom::new() }
    }
}

impl Default for RingKeyProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyProvider for RingKeyProvider {
    fn generate_p256(&self) -> Result<GeneratedKey, ProviderError> {
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &self.rng)
            .map_err(|_| ProviderError::Failed("P-256 key generation failed".into()))?;
        let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8.as_ref())
            .map_err(|e| ProviderError::Failed(e.to_string()))?;
        Ok(GeneratedKey {
            pkcs8: pkcs8.as_ref().to_vec(),
            public_key: key_pair.public_key().as_ref().to_vec(),
        })
    }
}

/// Generates the holder key and derives its DID.
///
/// Key material is never kept here: every call returns a new pair and
/// persistence is the caller's concern.
pub struct DidKeyManager {
    provider: Box<dyn KeyProvider>,
}

impl DidKeyManager {
    /// Creates a manager using the `ring` provider.
    pub fn new() -> Self {
        Self::with_provider(RingKeyProvider::new())
    }

    pub fn with_provider(provider: impl KeyProvider + 'static) -> Self {
        DidKeyManager { provider: Box::new(provider) }
    }

    /// Generates a P-256 key pair and its `did:key`.
    ///
    /// # Errors
    /// - `CryptoUnavailable` if the provider has no P-256 support
    /// - `KeyGenerationFailed` on any other provider error, or if the
    ///   exported key material does not have the expected layout
    pub fn generate_key_and_did(&self) -> WalletResult<DidKeyPair> {
        let key = self.provider.generate_p256().map_err(|e| match e {
            ProviderError::Unsupported(detail) => WalletError::CryptoUnavailable(detail),
            ProviderError::Failed(detail) => WalletError::KeyGenerationFailed(detail),
        })?;

        let scalar_end = PKCS8_SCALAR_OFFSET + P256_FIELD_LEN;
        if key.pkcs8.len() < scalar_end {
            return Err(WalletError::KeyGenerationFailed(format!(
                "PKCS#8 export too short: {} bytes",
                key.pkcs8.len()
            )));
        }
        let scalar = &key.pkcs8[PKCS8_SCALAR_OFFSET..scalar_end];

        let (x, y) = split_public_key(&key.public_key)?;
        let did = did_from_public_key(&key.public_key)?;

        let public_key = Jwk {
            kty: "EC".to_string(),
            crv: "P-256".to_string(),
            x: base64url_encode(x),
            y: base64url_encode(y),
            d: None,
            ext: true,
            key_ops: vec!["verify".to_string()],
        };
        let private_key = Jwk {
            d: Some(base64url_encode(scalar)),
            key_ops: vec!["sign".to_string()],
            ..public_key.clone()
        };

        log::debug!("derived holder identifier {}", did);
        Ok(DidKeyPair { did, private_key, public_key })
    }

    /// Returns the stored holder DID, generating and persisting a key pair
    /// on first use.
    pub async fn ensure_identity(&self, store: &dyn CredentialStore) -> WalletResult<String> {
        if let Some(did) = store.get_setting(SETTING_DID).await? {
            return Ok(did);
        }

        let identity = self.generate_key_and_did()?;
        let private_key = serde_json::to_string(&identity.private_key)
            .map_err(|e| WalletError::KeyGenerationFailed(e.to_string()))?;
        let public_key = serde_json::to_string(&identity.public_key)
            .map_err(|e| WalletError::KeyGenerationFailed(e.to_string()))?;

        store.put_setting(SETTING_PRIVATE_KEY, &private_key).await?;
        store.put_setting(SETTING_PUBLIC_KEY, &public_key).await?;
        store.put_setting(SETTING_DID, &identity.did).await?;
        log::info!("created holder identity {}", identity.did);
        Ok(identity.did)
    }

    /// Lowercase hex SHA-256 of `message`.
    pub fn sha256_hex(message: &str) -> String {
        crypto::sha256_hex(message)
    }
}

impl Default for DidKeyManager {
    fn default() -> Self {
        Self::new()
    }
}

fn split_public_key(raw: &[u8]) -> WalletResult<(&[u8], &[u8])> {
    if raw.len() != P256_RAW_PUBLIC_LEN || raw[0] != 0x04 {
        return Err(WalletError::KeyGenerationFailed(format!(
            "expected a {}-byte uncompressed P-256 point",
            P256_RAW_PUBLIC_LEN
        )));
    }
    Ok(raw[1..].split_at(P256_FIELD_LEN))
}

/// SEC1 point compression: `0x02` for even Y, `0x03` for odd Y, then X.
///
/// Parity is the least-significant bit of Y, which agrees with the parity
/// of the last digit of Y's decimal rendering.
pub fn compress_public_key(raw: &[u8]) -> WalletResult<[u8; 33]> {
    let (x, y) = split_public_key(raw)?;
    let mut compressed = [0u8; 33];
    compressed[0] = if y[P256_FIELD_LEN - 1] & 1 == 0 { 0x02 } else { 0x03 };
    compressed[1..].copy_from_slice(x);
    Ok(compressed)
}

/// Derives `did:key:z...` from an uncompressed P-256 public key.
pub fn did_from_public_key(raw: &[u8]) -> WalletResult<String> {
    let compressed = compress_public_key(raw)?;
    let tagged = multicodec_prefix(P256_PUB_MULTICODEC, &compressed);
    Ok(format!("{}{}", DID_KEY_PREFIX, base58_encode(&tagged, Alphabet::BITCOIN)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::codec::{base58_decode, base64url_decode, hex_decode};
    use crate::wallet::credential_storage::MemoryStore;
    use num_bigint::BigUint;

    const GX: &str = "6b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c296";
    const GY: &str = "4fe342e2fe1a7f9b8ee7eb4a7c0f9e162bce33576b315ececbb6406837bf51f5";

    fn generator_point() -> Vec<u8> {
        let mut raw = vec![0x04];
        raw.extend(hex_decode(GX).unwrap());
        raw.extend(hex_decode(GY).unwrap());
        raw
    }

    fn decode_did(did: &str) -> Vec<u8> {
        let suffix = did.strip_prefix(DID_KEY_PREFIX).unwrap();
        base58_decode(suffix, Alphabet::BITCOIN).unwrap()
    }

    struct FailingProvider(ProviderError);

    impl KeyProvider for FailingProvider {
        fn generate_p256(&self) -> Result<GeneratedKey, ProviderError> {
            Err(self.0.clone())
        }
    }

    struct FixedProvider(GeneratedKey);

    impl KeyProvider for FixedProvider {
        fn generate_p256(&self) -> Result<GeneratedKey, ProviderError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_generated_did_has_p256_multicodec() {
        let manager = DidKeyManager::new();
        let identity = manager.generate_key_and_did().unwrap();
        assert!(identity.did.starts_with("did:key:zDn"));

        let decoded = decode_did(&identity.did);
        assert_eq!(&decoded[..2], &[0x80, 0x24]);
        assert_eq!(decoded.len(), 35);
        assert!(decoded[2] == 0x02 || decoded[2] == 0x03);
        assert_eq!(decoded[3..].to_vec(), base64url_decode(&identity.public_key.x).unwrap());
    }

    #[test]
    fn test_private_scalar_is_read_at_pkcs8_offset() {
        let key = RingKeyProvider::new().generate_p256().unwrap();
        assert_eq!(key.pkcs8.len(), 138);
        // ring embeds the public point after the scalar
        assert_eq!(&key.pkcs8[73..], key.public_key.as_slice());

        let identity = DidKeyManager::with_provider(FixedProvider(key.clone()))
            .generate_key_and_did()
            .unwrap();
        let d = base64url_decode(identity.private_key.d.as_deref().unwrap()).unwrap();
        assert_eq!(d, key.pkcs8[36..68].to_vec());
        assert!(identity.public_key.d.is_none());
        assert_eq!(identity.private_key.x, identity.public_key.x);
        assert_eq!(identity.private_key.y, identity.public_key.y);
    }

    #[test]
    fn test_compression_of_generator_point() {
        let compressed = compress_public_key(&generator_point()).unwrap();
        assert_eq!(compressed[0], 0x03);
        assert_eq!(compressed[1..].to_vec(), hex_decode(GX).unwrap());

        let did = did_from_public_key(&generator_point()).unwrap();
        let mut expected = vec![0x80, 0x24, 0x03];
        expected.extend(hex_decode(GX).unwrap());
        assert_eq!(decode_did(&did), expected);
    }

    #[test]
    fn test_even_y_uses_0x02() {
        let mut raw = generator_point();
        raw[64] = 0xf4;
        assert_eq!(compress_public_key(&raw).unwrap()[0], 0x02);
    }

    #[test]
    fn test_bit_parity_matches_decimal_digit_parity() {
        let manager = DidKeyManager::new();
        for _ in 0..16 {
            let identity = manager.generate_key_and_did().unwrap();
            let y = base64url_decode(&identity.public_key.y).unwrap();
            let decimal = BigUint::from_bytes_be(&y).to_string();
            let last_digit = decimal.chars().last().unwrap().to_digit(10).unwrap();
            let expected = if last_digit % 2 == 0 { 0x02 } else { 0x03 };
            assert_eq!(decode_did(&identity.did)[2], expected);
        }
    }

    #[test]
    fn test_rejects_malformed_public_key() {
        assert!(matches!(
            did_from_public_key(&[0x04; 33]),
            Err(WalletError::KeyGenerationFailed(_))
        ));
        let mut raw = generator_point();
        raw[0] = 0x02;
        assert!(compress_public_key(&raw).is_err());
    }

    #[test]
    fn test_provider_failures_map_to_taxonomy() {
        let unsupported = DidKeyManager::with_provider(FailingProvider(ProviderError::Unsupported(
            "no P-256".into(),
        )));
        assert!(matches!(
            unsupported.generate_key_and_did(),
            Err(WalletError::CryptoUnavailable(_))
        ));

        let failing = DidKeyManager::with_provider(FailingProvider(ProviderError::Failed("rng".into())));
        assert!(matches!(
            failing.generate_key_and_did(),
            Err(WalletError::KeyGenerationFailed(_))
        ));

        let short = DidKeyManager::with_provider(FixedProvider(GeneratedKey {
            pkcs8: vec![0; 40],
            public_key: generator_point(),
        }));
        assert!(matches!(short.generate_key_and_did(), Err(WalletError::KeyGenerationFailed(_))));
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            DidKeyManager::sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_ensure_identity_is_stable() {
        let store = MemoryStore::new();
        let manager = DidKeyManager::new();
        let first = manager.ensure_identity(&store).await.unwrap();
        let second = manager.ensure_identity(&store).await.unwrap();
        assert_eq!(first, second);

        let stored: Jwk = serde_json::from_str(
            &store.get_setting(SETTING_PRIVATE_KEY).await.unwrap().unwrap(),
        )
        .unwrap();
        assert!(stored.d.is_some());
    }
}
