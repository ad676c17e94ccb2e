// src/models/webauthn.rs
//! WebAuthn ceremony data model.
//!
//! The relying-party server sends options with binary fields as base64url
//! strings; they are decoded to bytes while deserializing so the platform
//! authenticator receives raw buffers. Results travel the opposite way.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utils::codec::{base64url_bytes, buffer_encode};

/// Begin response of either ceremony: options for the platform call plus the
/// opaque session the server expects back on finish.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WebAuthnSession<O> {
    pub options: O,
    pub session: Value,
}

impl<O> WebAuthnSession<O> {
    /// Value sent in the `session_id` header.
    pub fn session_id(&self) -> String {
        match &self.session {
            Value::String(id) => id.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CredentialCreationOptions {
    #[serde(rename = "publicKey")]
    pub public_key: PublicKeyCredentialCreationOptions,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredentialCreationOptions {
    #[serde(with = "base64url_bytes")]
    pub challenge: Vec<u8>,

    pub rp: Value,

    pub user: UserEntity,

    #[serde(default)]
    pub pub_key_cred_params: Vec<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    #[serde(default)]
    pub exclude_credentials: Vec<CredentialDescriptor>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_selection: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation: Option<String>,

    /// Extensions and anything else the server sends, passed through
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserEntity {
    #[serde(with = "base64url_bytes")]
    pub id: Vec<u8>,

    pub name: String,

    #[serde(default)]
    pub display_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CredentialDescriptor {
    #[serde(rename = "type")]
    pub credential_type: String,

    #[serde(with = "base64url_bytes")]
    pub id: Vec<u8>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transports: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CredentialRequestOptions {
    #[serde(rename = "publicKey")]
    pub public_key: PublicKeyCredentialRequestOptions,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredentialRequestOptions {
    #[serde(with = "base64url_bytes")]
    pub challenge: Vec<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rp_id: Option<String>,

    #[serde(default)]
    pub allow_credentials: Vec<CredentialDescriptor>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_verification: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Platform result of a "create credential" call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationCredential {
    pub id: String,
    pub raw_id: Vec<u8>,
    pub credential_type: String,
    pub attestation_object: Vec<u8>,
    pub client_data_json: Vec<u8>,
}

/// Platform result of a "get assertion" call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionCredential {
    pub id: String,
    pub raw_id: Vec<u8>,
    pub credential_type: String,
    pub authenticator_data: Vec<u8>,
    pub client_data_json: Vec<u8>,
    pub signature: Vec<u8>,
    pub user_handle: Option<Vec<u8>>,
}

/// Finish request body shared by both ceremonies.
#[derive(Serialize, Debug, Clone)]
pub struct FinishRequest<R> {
    pub response: R,
    pub session: Value,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub id: String,
    pub raw_id: String,
    #[serde(rename = "type")]
    pub credential_type: String,
    pub response: AttestationResponse,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AttestationResponse {
    #[serde(rename = "attestationObject")]
    pub attestation_object: String,
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
}

impl From<&AttestationCredential> for RegistrationResponse {
    fn from(credential: &AttestationCredential) -> Self {
        RegistrationResponse {
            id: credential.id.clone(),
            raw_id: buffer_encode(&credential.raw_id),
            credential_type: credential.credential_type.clone(),
            response: AttestationResponse {
                attestation_object: buffer_encode(&credential.attestation_object),
                client_data_json: buffer_encode(&credential.client_data_json),
            },
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResponse {
    pub id: String,
    pub raw_id: String,
    #[serde(rename = "type")]
    pub credential_type: String,
    pub response: AssertionResponse,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AssertionResponse {
    #[serde(rename = "authenticatorData")]
    pub authenticator_data: String,
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub signature: String,
    #[serde(rename = "userHandle")]
    pub user_handle: String,
}

impl From<&AssertionCredential> for AuthenticationResponse {
    fn from(credential: &AssertionCredential) -> Self {
        AuthenticationResponse {
            id: credential.id.clone(),
            raw_id: buffer_encode(&credential.raw_id),
            credential_type: credential.credential_type.clone(),
            response: AssertionResponse {
                authenticator_data: buffer_encode(&credential.authenticator_data),
                client_data_json: buffer_encode(&credential.client_data_json),
                signature: buffer_encode(&credential.signature),
                user_handle: credential
                    .user_handle
                    .as_deref()
                    .map(buffer_encode)
                    .unwrap_or_default(),
            },
        }
    }
}
