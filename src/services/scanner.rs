// src/services/scanner.rs
//! Classifies a scanned QR code or deep link and runs the matching flow.
//!
//! Recognised shapes:
//! - `http(s)://...?credential_offer_uri=...` → credential offer
//! - `openid://?scope=...` or `openid://?request_uri=...` → presentation
//! - `http(s)://...?command=getvc&vcid=...` → direct credential link

use url::Url;

use crate::error::{WalletError, WalletResult};
use crate::models::presentation::OPENID_PREFIX;
use crate::services::credential_offer::{parse_source, CredentialOfferFlow, CREDENTIAL_OFFER_URI};
use crate::services::presentation::{PresentationFlow, PresentationOutcome};
use crate::wallet::context::WalletContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanKind {
    Offer,
    Presentation,
    DirectCredential,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Identifiers of the credentials stored
    Issued(Vec<String>),
    Presented(PresentationOutcome),
}

fn has_param(url: &Url, name: &str) -> bool {
    url.query_pairs().any(|(key, _)| key == name)
}

pub struct Scanner<'a> {
    ctx: &'a WalletContext,
}

impl<'a> Scanner<'a> {
    pub fn new(ctx: &'a WalletContext) -> Self {
        Scanner { ctx }
    }

    /// # Errors
    /// `InvalidSource` for anything that matches none of the known shapes.
    pub fn classify(url: &str) -> WalletResult<ScanKind> {
        let url = url.trim();
        if let Some(query) = url.strip_prefix(OPENID_PREFIX) {
            let presentation = url::form_urlencoded::parse(query.as_bytes())
                .any(|(key, _)| key == "scope" || key == "request_uri");
            return if presentation {
                Ok(ScanKind::Presentation)
            } else {
                Err(WalletError::InvalidSource("openid request carries neither scope nor request_uri".into()))
            };
        }

        let source = parse_source(url)?;
        if has_param(&source, CREDENTIAL_OFFER_URI) {
            return Ok(ScanKind::Offer);
        }
        let getvc = source
            .query_pairs()
            .any(|(key, value)| key == "command" && value == "getvc");
        if getvc && has_param(&source, "vcid") {
            return Ok(ScanKind::DirectCredential);
        }
        Err(WalletError::InvalidSource(format!("unrecognised link {}", source)))
    }

    /// Classifies `url` and runs the flow it calls for.
    pub async fn handle(&self, url: &str) -> WalletResult<ScanOutcome> {
        let kind = Self::classify(url)?;
        log::debug!("scanned {:?} link", kind);
        match kind {
            ScanKind::Offer | ScanKind::DirectCredential => CredentialOfferFlow::new(self.ctx)
                .resolve_from_url(url)
                .await
                .map(ScanOutcome::Issued),
            ScanKind::Presentation => PresentationFlow::new(self.ctx)
                .resolve_from_url(url)
                .await
                .map(ScanOutcome::Presented),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WalletConfig;
    use crate::wallet::authenticator::UnavailableAuthenticator;
    use crate::wallet::credential_storage::MemoryStore;
    use std::sync::Arc;

    fn context() -> WalletContext {
        WalletContext::new(
            WalletConfig::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(UnavailableAuthenticator),
        )
        .unwrap()
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            Scanner::classify("https://wallet.example/?credential_offer_uri=https%3A%2F%2Fissuer.example%2Fo").unwrap(),
            ScanKind::Offer
        );
        assert_eq!(
            Scanner::classify("openid://?scope=dsba.credentials.presentation.Employee&redirect_uri=x").unwrap(),
            ScanKind::Presentation
        );
        assert_eq!(
            Scanner::classify("openid://?request_uri=https%3A%2F%2Fverifier.example%2Freq").unwrap(),
            ScanKind::Presentation
        );
        assert_eq!(
            Scanner::classify("https://issuer.example/api?command=getvc&vcid=42").unwrap(),
            ScanKind::DirectCredential
        );
    }

    #[test]
    fn test_classify_rejects_unknown_shapes() {
        for url in [
            "https://issuer.example/api?command=getvc",
            "https://example.com/",
            "openid://?state=x",
            "ftp://example.com/?credential_offer_uri=x",
            "",
        ] {
            assert!(
                matches!(Scanner::classify(url), Err(WalletError::InvalidSource(_))),
                "{url} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_handle_direct_link() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api")
            .match_query(mockito::Matcher::Any)
            .with_body(r#"{"type":["VerifiableCredential","EmployeeCredential"]}"#)
            .create_async()
            .await;

        let ctx = context();
        let outcome = Scanner::new(&ctx)
            .handle(&format!("{}/api?command=getvc&vcid=42", server.url()))
            .await
            .unwrap();
        match outcome {
            ScanOutcome::Issued(ids) => assert_eq!(ids.len(), 1),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_handle_presentation_with_empty_wallet() {
        let ctx = context();
        let outcome = Scanner::new(&ctx)
            .handle("openid://?scope=dsba.credentials.presentation.Employee&redirect_uri=https%3A%2F%2Fverifier.example%2Fcb&state=s")
            .await
            .unwrap();
        assert_eq!(outcome, ScanOutcome::Presented(PresentationOutcome::NothingToSend));
    }
}
