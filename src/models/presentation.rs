// src/models/presentation.rs
//! OpenID4VP authorization request and the presentation objects sent back.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{WalletError, WalletResult};
use crate::models::credential::{is_compact_jwt, StoredCredential};

/// Scheme marker a SIOP request carries when scanned from a QR code.
pub const OPENID_PREFIX: &str = "openid://?";

pub const VP_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";

/// Query parameters of a verifier's authorization request.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub redirect_uri: String,
    pub state: String,
    pub scope: String,
    pub response_type: Option<String>,
    pub response_mode: Option<String>,
    pub client_id: Option<String>,
    pub nonce: Option<String>,
    pub request_uri: Option<String>,
}

impl AuthorizationRequest {
    /// Parses an `openid://?...` URL, or any URL whose query carries the
    /// request parameters.
    ///
    /// # Errors
    /// `InvalidSource` when `redirect_uri` or `scope` is missing.
    pub fn parse(url: &str) -> WalletResult<Self> {
        let url = url.trim();
        let query = match url.strip_prefix(OPENID_PREFIX) {
            Some(rest) => rest,
            None => url.split_once('?').map(|(_, q)| q).unwrap_or(url),
        };

        let mut request = AuthorizationRequest::default();
        let mut redirect_uri = None;
        let mut scope = None;
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = value.into_owned();
            match key.as_ref() {
                "redirect_uri" => redirect_uri = Some(value),
                "state" => request.state = value,
                "scope" => scope = Some(value),
                "response_type" => request.response_type = Some(value),
                "response_mode" => request.response_mode = Some(value),
                "client_id" => request.client_id = Some(value),
                "nonce" => request.nonce = Some(value),
                "request_uri" => request.request_uri = Some(value),
                _ => {}
            }
        }

        request.redirect_uri = redirect_uri
            .filter(|uri| !uri.is_empty())
            .ok_or_else(|| WalletError::InvalidSource("authorization request has no redirect_uri".into()))?;
        request.scope = scope
            .ok_or_else(|| WalletError::InvalidSource("authorization request has no scope".into()))?;
        Ok(request)
    }
}

/// W3C Verifiable Presentation wrapping stored credentials unchanged.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VerifiablePresentation {
    #[serde(rename = "@context")]
    pub context: Vec<String>,

    #[serde(rename = "type")]
    pub types: Vec<String>,

    #[serde(rename = "verifiableCredential")]
    pub verifiable_credential: Vec<Value>,

    pub holder: String,
}

impl VerifiablePresentation {
    /// Wraps the stored credentials for `holder`.
    ///
    /// Entries are joined into one JSON array text and parsed once; compact
    /// JWTs are quoted as JSON strings first.
    ///
    /// # Errors
    /// `MalformedCredential` if the joined array is not valid JSON.
    pub fn wrap(credentials: &[StoredCredential], holder: &str) -> WalletResult<Self> {
        let entries: Vec<String> = credentials
            .iter()
            .map(|credential| {
                if is_compact_jwt(&credential.encoded) {
                    Value::String(credential.encoded.trim().to_string()).to_string()
                } else {
                    credential.encoded.clone()
                }
            })
            .collect();
        let array = format!("[{}]", entries.join(","));
        let verifiable_credential: Vec<Value> = serde_json::from_str(&array)
            .map_err(|e| WalletError::MalformedCredential(e.to_string()))?;

        Ok(VerifiablePresentation {
            context: vec![VP_CONTEXT.to_string()],
            types: vec!["VerifiablePresentation".to_string()],
            verifiable_credential,
            holder: holder.to_string(),
        })
    }
}

/// Presentation submission sent alongside the VP. No presentation
/// definition is evaluated, so the values are fixed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PresentationSubmission {
    pub id: String,
    pub definition_id: String,
}

impl Default for PresentationSubmission {
    fn default() -> Self {
        PresentationSubmission {
            id: "Placeholder - not yet evaluated.".to_string(),
            definition_id: "Example definition.".to_string(),
        }
    }
}

/// Body posted to the verifier's `redirect_uri`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PresentationForm {
    /// base64url JSON of the [`VerifiablePresentation`]
    pub vp_token: String,

    /// base64url JSON of the [`PresentationSubmission`]
    pub presentation_submission: String,
}
