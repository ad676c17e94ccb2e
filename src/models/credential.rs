// src/models/credential.rs
//! Verifiable Credential issuance data model.
//!
//! Wire types for the OIDC4VCI pre-authorized-code exchange and the
//! [`StoredCredential`] record handed to the credential store.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utils::codec::base64url_decode;
use crate::utils::crypto::sha256_hex;

/// Grant type URN of the pre-authorized-code flow.
pub const PRE_AUTHORIZED_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:pre-authorized_code";

/// A credential offer as published behind `credential_offer_uri`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CredentialOffer {
    /// Base URL of the issuer, used for `.well-known` discovery
    pub credential_issuer: String,

    #[serde(default)]
    pub grants: Grants,

    #[serde(default)]
    pub credentials: Vec<OfferedCredential>,
}

impl CredentialOffer {
    /// The pre-authorized code, if the offer carries that grant.
    pub fn pre_authorized_code(&self) -> Option<&str> {
        self.grants
            .pre_authorized_code
            .as_ref()
            .map(|grant| grant.pre_authorized_code.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Grants {
    #[serde(
        rename = "urn:ietf:params:oauth:grant-type:pre-authorized_code",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub pre_authorized_code: Option<PreAuthorizedCodeGrant>,

    /// Grants this wallet does not act on (e.g. `authorization_code`)
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PreAuthorizedCodeGrant {
    #[serde(rename = "pre-authorized_code")]
    pub pre_authorized_code: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_pin_required: Option<bool>,
}

/// One entry of the offer's `credentials` list.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OfferedCredential {
    /// Requested format, e.g. `jwt_vc_json`
    pub format: String,

    /// Requested credential types
    #[serde(rename = "type", alias = "types", default)]
    pub types: Vec<String>,
}

/// Subset of the issuer's `/.well-known/openid-configuration` this wallet uses.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OpenIdConfig {
    pub token_endpoint: String,

    pub credential_endpoint: String,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TokenResponse {
    pub access_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_nonce: Option<String>,
}

/// Body of the credential endpoint request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CredentialRequest {
    pub format: String,
    pub types: Vec<String>,
}

/// Credential endpoint response. `credential` is either a compact encoded VC
/// (a JSON string) or a structured VC object, depending on the format.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CredentialResponse {
    pub credential: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl CredentialResponse {
    /// The credential as the text that gets persisted.
    pub fn encoded(&self) -> String {
        match &self.credential {
            Value::String(encoded) => encoded.clone(),
            other => other.to_string(),
        }
    }
}

/// Status recorded for credentials received from an issuer.
pub const STATUS_SIGNED: &str = "signed";

/// A credential as persisted by the credential store.
///
/// `hash` doubles as the record identifier.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StoredCredential {
    /// SHA-256 hex of `encoded`
    pub hash: String,

    /// The credential exactly as received
    pub encoded: String,

    /// JSON payload of the credential (no signature check is made)
    pub decoded: Value,

    /// Most specific VC type, e.g. `EmployeeCredential`
    #[serde(rename = "type")]
    pub credential_type: String,

    pub status: String,

    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl StoredCredential {
    /// Builds the stored record for an encoded credential.
    ///
    /// JSON text is parsed as-is; a compact JWT has its payload segment
    /// decoded. Anything else keeps a `null` payload.
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        let encoded = encoded.into();
        let decoded = decode_payload(&encoded);
        let credential_type = credential_type(&decoded);
        StoredCredential {
            hash: sha256_hex(&encoded),
            encoded,
            decoded,
            credential_type,
            status: STATUS_SIGNED.to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn id(&self) -> &str {
        &self.hash
    }

    /// True when `encoded` is a compact JWS rather than JSON text.
    pub fn is_compact_jwt(&self) -> bool {
        is_compact_jwt(&self.encoded)
    }
}

pub(crate) fn is_compact_jwt(encoded: &str) -> bool {
    let trimmed = encoded.trim();
    !trimmed.starts_with('{')
        && !trimmed.starts_with('"')
        && trimmed.split('.').count() == 3
}

fn decode_payload(encoded: &str) -> Value {
    let trimmed = encoded.trim();
    if trimmed.starts_with('{') {
        return serde_json::from_str(trimmed).unwrap_or(Value::Null);
    }
    if !is_compact_jwt(trimmed) {
        return Value::Null;
    }
    trimmed
        .split('.')
        .nth(1)
        .and_then(|segment| base64url_decode(segment).ok())
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or(Value::Null)
}

fn credential_type(decoded: &Value) -> String {
    let vc = decoded.get("vc").unwrap_or(decoded);
    match vc.get("type") {
        Some(Value::Array(types)) => types
            .iter()
            .rev()
            .find_map(Value::as_str)
            .unwrap_or("VerifiableCredential")
            .to_string(),
        Some(Value::String(t)) => t.clone(),
        _ => "VerifiableCredential".to_string(),
    }
}
