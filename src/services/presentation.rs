// src/services/presentation.rs
//! OpenID4VP presentation of stored credentials to a verifier.
//!
//! The scanned authorization request is checked against the one scope this
//! wallet serves, the most recent stored credentials are wrapped in a
//! Verifiable Presentation for the holder DID, and the result is posted to
//! the verifier's `redirect_uri`. How the verifier's answer is read depends
//! on [`VerifierMode`]; in status-code mode it may hand over to a passkey
//! ceremony before the flow completes.

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use url::Url;

use crate::config::VerifierMode;
use crate::error::{WalletError, WalletResult};
use crate::models::credential::StoredCredential;
use crate::models::presentation::{
    AuthorizationRequest, PresentationForm, PresentationSubmission, VerifiablePresentation,
};
use crate::services::webauthn::WebAuthnCeremony;
use crate::utils::codec::base64url_encode;
use crate::wallet::context::WalletContext;

/// Terminal state of a presentation flow that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentationOutcome {
    /// The wallet holds no credentials; the verifier was not contacted.
    NothingToSend,
    /// The presentation was delivered (opaque mode).
    Submitted,
    /// The verifier asked for a new passkey and registration completed.
    Registered { username: String },
    /// The verifier asked for an existing passkey and login completed.
    Authenticated { username: String },
}

/// Encodes the presentation and its submission into the posted form.
///
/// # Errors
/// `MalformedCredential` if a stored entry is not embeddable JSON.
pub fn build_form(credentials: &[StoredCredential], holder: &str) -> WalletResult<PresentationForm> {
    let presentation = VerifiablePresentation::wrap(credentials, holder)?;
    let submission = PresentationSubmission::default();
    let vp_json = serde_json::to_string(&presentation)
        .map_err(|e| WalletError::MalformedCredential(e.to_string()))?;
    let submission_json = serde_json::to_string(&submission)
        .map_err(|e| WalletError::MalformedCredential(e.to_string()))?;
    Ok(PresentationForm {
        vp_token: base64url_encode(vp_json),
        presentation_submission: base64url_encode(submission_json),
    })
}

/// `{redirect_uri}?state={state}`, appending to an existing query.
fn submission_url(request: &AuthorizationRequest) -> WalletResult<Url> {
    let mut url = Url::parse(&request.redirect_uri)
        .map_err(|e| WalletError::InvalidSource(format!("redirect_uri {}: {}", request.redirect_uri, e)))?;
    url.query_pairs_mut().append_pair("state", &request.state);
    Ok(url)
}

/// The 404 body names the account to register; verifiers send it bare or
/// as a JSON string.
fn username_from_body(body: &str) -> Option<String> {
    let username = body.trim().trim_matches('"').trim();
    if username.is_empty() {
        None
    } else {
        Some(username.to_string())
    }
}

pub struct PresentationFlow<'a> {
    ctx: &'a WalletContext,
}

impl<'a> PresentationFlow<'a> {
    pub fn new(ctx: &'a WalletContext) -> Self {
        PresentationFlow { ctx }
    }

    /// Answers the authorization request in `url`.
    ///
    /// # Errors
    /// - `InvalidSource` when the request lacks `redirect_uri` or `scope`
    /// - `UnsupportedScope` before any network call when the scope differs
    /// - `Forbidden` or `PresentationRejected` from the verifier
    /// - any WebAuthn failure kind from a follow-up ceremony
    pub async fn resolve_from_url(&self, url: &str) -> WalletResult<PresentationOutcome> {
        let request = AuthorizationRequest::parse(url)?;
        if request.scope != self.ctx.config.supported_scope {
            log::warn!("refusing presentation request for scope {}", request.scope);
            return Err(WalletError::UnsupportedScope(request.scope));
        }

        let credentials = self.ctx.store.list_recent(self.ctx.config.recent_limit).await?;
        if credentials.is_empty() {
            log::info!("no stored credentials to present");
            return Ok(PresentationOutcome::NothingToSend);
        }

        let holder = self.ctx.holder_did().await?;
        let form = build_form(&credentials, &holder)?;
        let target = submission_url(&request)?;
        let body = serde_json::to_string(&form)
            .map_err(|e| WalletError::PresentationRejected(e.to_string()))?;

        log::debug!("posting {} credential(s) to {}", credentials.len(), target);
        let http = &self.ctx.http;
        let exchange = http
            .exchange(
                http.post(target.as_str())
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(body),
            )
            .await;

        let (status, body) = match exchange {
            Ok(answer) => answer,
            Err(e) => {
                log::error!("presentation to {} failed: {}", target, e);
                return Err(WalletError::PresentationRejected(e.to_string()));
            }
        };

        match self.ctx.config.verifier_mode {
            VerifierMode::Opaque => {
                log::info!("presentation delivered to {}", target);
                Ok(PresentationOutcome::Submitted)
            }
            VerifierMode::StatusCode => self.follow_up(&request, &target, status, &body).await,
        }
    }

    async fn follow_up(
        &self,
        request: &AuthorizationRequest,
        target: &Url,
        status: StatusCode,
        body: &str,
    ) -> WalletResult<PresentationOutcome> {
        match status {
            StatusCode::FORBIDDEN => Err(WalletError::Forbidden(format!("{} answered 403", target))),
            StatusCode::NOT_FOUND => {
                let username = username_from_body(body).ok_or_else(|| {
                    WalletError::PresentationRejected("verifier asked for registration without a username".into())
                })?;
                let origin = self.webauthn_origin(target);
                WebAuthnCeremony::new(self.ctx)
                    .register(&origin, &username, &request.state)
                    .await?;
                Ok(PresentationOutcome::Registered { username })
            }
            StatusCode::OK => {
                let username = username_from_body(body).ok_or_else(|| {
                    WalletError::PresentationRejected("verifier asked for login without a username".into())
                })?;
                let origin = self.webauthn_origin(target);
                WebAuthnCeremony::new(self.ctx)
                    .login(&origin, &username, &request.state)
                    .await?;
                Ok(PresentationOutcome::Authenticated { username })
            }
            other => {
                let detail = if body.trim().is_empty() {
                    format!("HTTP {} from {}", other, target)
                } else {
                    body.to_string()
                };
                log::error!("verifier rejected presentation: {}", detail);
                Err(WalletError::PresentationRejected(detail))
            }
        }
    }

    fn webauthn_origin(&self, target: &Url) -> String {
        match &self.ctx.config.webauthn_origin {
            Some(origin) => origin.clone(),
            None => target.origin().ascii_serialization(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WalletConfig;
    use crate::utils::codec::base64url_decode;
    use crate::wallet::authenticator::test_support::ScriptedAuthenticator;
    use crate::wallet::authenticator::UnavailableAuthenticator;
    use crate::wallet::credential_storage::{CredentialStore, MemoryStore};
    use mockito::Matcher;
    use serde_json::{json, Value};
    use std::sync::Arc;

    const SCOPE: &str = "dsba.credentials.presentation.Employee";

    fn request_url(redirect_uri: &str) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("scope", SCOPE)
            .append_pair("response_type", "vp_token")
            .append_pair("response_mode", "post")
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("state", "st-1")
            .append_pair("nonce", "n-1")
            .finish();
        format!("openid://?{}", query)
    }

    async fn store_with_credential() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store
            .save_credential(StoredCredential::from_encoded(
                r#"{"type":["VerifiableCredential","EmployeeCredential"],"credentialSubject":{"id":"x"}}"#,
            ))
            .await
            .unwrap();
        store
    }

    fn context_with(config: WalletConfig, store: Arc<MemoryStore>) -> WalletContext {
        WalletContext::new(config, store, Arc::new(UnavailableAuthenticator)).unwrap()
    }

    #[test]
    fn test_build_form_decodes_to_presentation() {
        let credentials = vec![
            StoredCredential::from_encoded(r#"{"id":"urn:vc:1"}"#),
            StoredCredential::from_encoded("aGVhZA.cGF5bG9hZA.c2ln"),
        ];
        let form = build_form(&credentials, "did:key:zDnTest").unwrap();

        let vp: Value = serde_json::from_slice(&base64url_decode(&form.vp_token).unwrap()).unwrap();
        assert_eq!(vp["holder"], "did:key:zDnTest");
        assert_eq!(vp["type"], json!(["VerifiablePresentation"]));
        assert_eq!(vp["verifiableCredential"][0]["id"], "urn:vc:1");
        assert_eq!(vp["verifiableCredential"][1], "aGVhZA.cGF5bG9hZA.c2ln");

        let submission: Value =
            serde_json::from_slice(&base64url_decode(&form.presentation_submission).unwrap()).unwrap();
        assert_eq!(submission["id"], "Placeholder - not yet evaluated.");
        assert_eq!(submission["definition_id"], "Example definition.");
    }

    #[test]
    fn test_submission_url_appends_state() {
        let mut request = AuthorizationRequest::default();
        request.redirect_uri = "https://verifier.example/cb".into();
        request.state = "a b".into();
        assert_eq!(submission_url(&request).unwrap().as_str(), "https://verifier.example/cb?state=a+b");

        request.redirect_uri = "https://verifier.example/cb?x=1".into();
        assert_eq!(submission_url(&request).unwrap().as_str(), "https://verifier.example/cb?x=1&state=a+b");
    }

    #[test]
    fn test_username_from_body() {
        assert_eq!(username_from_body("\"alice@example.com\"\n").as_deref(), Some("alice@example.com"));
        assert_eq!(username_from_body(" bob ").as_deref(), Some("bob"));
        assert_eq!(username_from_body("  "), None);
    }

    #[tokio::test]
    async fn test_scope_mismatch_makes_no_request() {
        let mut server = mockito::Server::new_async().await;
        let verifier = server.mock("POST", Matcher::Any).expect(0).create_async().await;

        let config = WalletConfig {
            supported_scope: "other.scope".into(),
            ..WalletConfig::default()
        };
        let ctx = context_with(config, store_with_credential().await);
        let err = PresentationFlow::new(&ctx)
            .resolve_from_url(&request_url(&format!("{}/cb", server.url())))
            .await
            .unwrap_err();

        assert_eq!(err, WalletError::UnsupportedScope(SCOPE.into()));
        verifier.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_wallet_sends_nothing() {
        let mut server = mockito::Server::new_async().await;
        let verifier = server.mock("POST", Matcher::Any).expect(0).create_async().await;

        let store = Arc::new(MemoryStore::new());
        let ctx = context_with(WalletConfig::default(), store.clone());
        let outcome = PresentationFlow::new(&ctx)
            .resolve_from_url(&request_url(&format!("{}/cb", server.url())))
            .await
            .unwrap();

        assert_eq!(outcome, PresentationOutcome::NothingToSend);
        assert!(store.get_setting("did").await.unwrap().is_none());
        verifier.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_redirect_uri_is_invalid_source() {
        let ctx = context_with(WalletConfig::default(), Arc::new(MemoryStore::new()));
        let err = PresentationFlow::new(&ctx)
            .resolve_from_url(&format!("openid://?scope={}&state=s", SCOPE))
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::InvalidSource(_)));
    }

    #[tokio::test]
    async fn test_opaque_mode_ignores_status() {
        let mut server = mockito::Server::new_async().await;
        let verifier = server
            .mock("POST", "/cb")
            .match_query(Matcher::UrlEncoded("state".into(), "st-1".into()))
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(Matcher::Regex(r#""vp_token":"[A-Za-z0-9_-]+""#.into()))
            .with_status(500)
            .create_async()
            .await;

        let config = WalletConfig {
            verifier_mode: VerifierMode::Opaque,
            ..WalletConfig::default()
        };
        let store = store_with_credential().await;
        let ctx = context_with(config, store.clone());
        let outcome = PresentationFlow::new(&ctx)
            .resolve_from_url(&request_url(&format!("{}/cb", server.url())))
            .await
            .unwrap();

        assert_eq!(outcome, PresentationOutcome::Submitted);
        assert!(store.get_setting("did").await.unwrap().unwrap().starts_with("did:key:zDn"));
        verifier.assert_async().await;
    }

    #[tokio::test]
    async fn test_opaque_mode_transport_error_is_rejection() {
        let config = WalletConfig {
            verifier_mode: VerifierMode::Opaque,
            ..WalletConfig::default()
        };
        let ctx = context_with(config, store_with_credential().await);
        let err = PresentationFlow::new(&ctx)
            .resolve_from_url(&request_url("http://127.0.0.1:1/cb"))
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::PresentationRejected(_)));
    }

    #[tokio::test]
    async fn test_status_mode_rejection_carries_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/cb")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body("credential expired")
            .create_async()
            .await;

        let ctx = context_with(WalletConfig::default(), store_with_credential().await);
        let err = PresentationFlow::new(&ctx)
            .resolve_from_url(&request_url(&format!("{}/cb", server.url())))
            .await
            .unwrap_err();
        assert_eq!(err, WalletError::PresentationRejected("credential expired".into()));
    }

    #[tokio::test]
    async fn test_status_mode_403_is_forbidden() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/cb")
            .match_query(Matcher::Any)
            .with_status(403)
            .create_async()
            .await;

        let ctx = context_with(WalletConfig::default(), store_with_credential().await);
        let err = PresentationFlow::new(&ctx)
            .resolve_from_url(&request_url(&format!("{}/cb", server.url())))
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_404_registers_passkey() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/cb")
            .match_query(Matcher::UrlEncoded("state".into(), "st-1".into()))
            .with_status(404)
            .with_body("\"alice\"")
            .create_async()
            .await;
        let begin = server
            .mock("GET", "/webauthn/register/begin/alice")
            .match_query(Matcher::UrlEncoded("state".into(), "st-1".into()))
            .with_body(
                json!({
                    "options": { "publicKey": {
                        "challenge": "AQID",
                        "rp": { "name": "Verifier" },
                        "user": { "id": "BAU", "name": "alice" }
                    }},
                    "session": "sess-1"
                })
                .to_string(),
            )
            .create_async()
            .await;
        let finish = server
            .mock("POST", "/webauthn/register/finish/alice")
            .match_query(Matcher::UrlEncoded("state".into(), "st-1".into()))
            .match_header("session_id", "sess-1")
            .create_async()
            .await;

        let store = store_with_credential().await;
        let ctx = WalletContext::new(
            WalletConfig::default(),
            store.clone(),
            Arc::new(ScriptedAuthenticator::new()),
        )
        .unwrap();
        let outcome = PresentationFlow::new(&ctx)
            .resolve_from_url(&request_url(&format!("{}/cb", server.url())))
            .await
            .unwrap();

        assert_eq!(outcome, PresentationOutcome::Registered { username: "alice".into() });
        assert_eq!(store.get_setting("wauth-alice").await.unwrap().as_deref(), Some("AQI"));
        begin.assert_async().await;
        finish.assert_async().await;
    }

    #[tokio::test]
    async fn test_200_logs_in_with_configured_origin() {
        let mut verifier = mockito::Server::new_async().await;
        let mut relying_party = mockito::Server::new_async().await;
        verifier
            .mock("POST", "/cb")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("bob")
            .create_async()
            .await;
        relying_party
            .mock("GET", "/webauthn/login/begin/bob")
            .match_query(Matcher::UrlEncoded("state".into(), "st-1".into()))
            .with_body(json!({ "options": { "publicKey": { "challenge": "CQo" } }, "session": "s2" }).to_string())
            .create_async()
            .await;
        let finish = relying_party
            .mock("POST", "/webauthn/login/finish/bob")
            .match_query(Matcher::UrlEncoded("state".into(), "st-1".into()))
            .match_header("session_id", "s2")
            .create_async()
            .await;

        let config = WalletConfig {
            webauthn_origin: Some(relying_party.url()),
            ..WalletConfig::default()
        };
        let ctx = WalletContext::new(
            config,
            store_with_credential().await,
            Arc::new(ScriptedAuthenticator::new()),
        )
        .unwrap();
        let outcome = PresentationFlow::new(&ctx)
            .resolve_from_url(&request_url(&format!("{}/cb", verifier.url())))
            .await
            .unwrap();

        assert_eq!(outcome, PresentationOutcome::Authenticated { username: "bob".into() });
        finish.assert_async().await;
    }

    #[tokio::test]
    async fn test_cancelled_registration_fails_flow() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/cb")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body("carol")
            .create_async()
            .await;
        server
            .mock("GET", "/webauthn/register/begin/carol")
            .match_query(Matcher::Any)
            .with_body(
                json!({
                    "options": { "publicKey": {
                        "challenge": "AQID",
                        "rp": {},
                        "user": { "id": "BAU", "name": "carol" }
                    }},
                    "session": "s3"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let ctx = context_with(WalletConfig::default(), store_with_credential().await);
        let err = PresentationFlow::new(&ctx)
            .resolve_from_url(&request_url(&format!("{}/cb", server.url())))
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::CeremonyCancelled(_)));
    }
}
