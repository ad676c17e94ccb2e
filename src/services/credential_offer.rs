// src/services/credential_offer.rs
//! Credential issuance from a scanned QR code or deep link.
//!
//! Two disjoint paths, chosen by the presence of `credential_offer_uri`:
//!
//! ### Offer-based issuance (OIDC4VCI pre-authorized code)
//! 1. GET `credential_offer_uri` → [`CredentialOffer`]
//! 2. GET `{credential_issuer}/.well-known/openid-configuration`
//! 3. POST the pre-authorized code to `token_endpoint` (form-urlencoded)
//! 4. POST `{format, types}` to `credential_endpoint` with the bearer token,
//!    once per offered credential
//! 5. Persist each returned credential
//!
//! ### Direct-link issuance
//! GET the scanned URL itself and persist the response text.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use url::Url;

use crate::error::{WalletError, WalletResult};
use crate::models::credential::{
    CredentialOffer, CredentialRequest, CredentialResponse, OpenIdConfig, StoredCredential,
    TokenResponse, PRE_AUTHORIZED_CODE_GRANT,
};
use crate::wallet::context::WalletContext;

/// Query parameter that marks an OIDC4VCI offer.
pub const CREDENTIAL_OFFER_URI: &str = "credential_offer_uri";

const WELL_KNOWN_OPENID: &str = ".well-known/openid-configuration";

/// Form body of the pre-authorized-code token request.
pub fn token_request_body(code: &str) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("grant_type", PRE_AUTHORIZED_CODE_GRANT)
        .append_pair("code", code)
        .finish()
}

/// Parses a scanned URL, accepting only `http` and `https`.
pub fn parse_source(url: &str) -> WalletResult<Url> {
    let parsed = Url::parse(url.trim()).map_err(|e| WalletError::InvalidSource(format!("{}: {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(WalletError::InvalidSource(format!("unsupported scheme '{}'", other))),
    }
}

/// Resolves a credential offer or direct credential link into stored
/// credentials.
pub struct CredentialOfferFlow<'a> {
    ctx: &'a WalletContext,
}

impl<'a> CredentialOfferFlow<'a> {
    pub fn new(ctx: &'a WalletContext) -> Self {
        CredentialOfferFlow { ctx }
    }

    /// Runs the issuance flow for `url`.
    ///
    /// # Returns
    /// Identifiers of the stored credentials, in offer order.
    ///
    /// # Errors
    /// - `InvalidSource` for anything but an `http(s)` URL
    /// - `Forbidden` if any step answers 403
    /// - the failing step's own kind otherwise
    pub async fn resolve_from_url(&self, url: &str) -> WalletResult<Vec<String>> {
        let source = parse_source(url)?;
        let offer_uri = source
            .query_pairs()
            .find(|(key, _)| key == CREDENTIAL_OFFER_URI)
            .map(|(_, value)| value.into_owned());

        match offer_uri {
            Some(offer_uri) => self.issue_from_offer(&offer_uri).await,
            None => self.issue_from_link(&source).await.map(|id| vec![id]),
        }
    }

    async fn issue_from_offer(&self, offer_uri: &str) -> WalletResult<Vec<String>> {
        let http = &self.ctx.http;

        log::debug!("fetching credential offer from {}", offer_uri);
        let offer: CredentialOffer = http
            .send_json(http.get(offer_uri), WalletError::OfferFetchFailed)
            .await?;
        let code = offer
            .pre_authorized_code()
            .ok_or_else(|| WalletError::OfferFetchFailed("offer has no pre-authorized code grant".into()))?;
        if offer.credentials.is_empty() {
            return Err(WalletError::OfferFetchFailed("offer lists no credentials".into()));
        }

        let discovery = format!("{}/{}", offer.credential_issuer.trim_end_matches('/'), WELL_KNOWN_OPENID);
        log::debug!("discovering issuer endpoints at {}", discovery);
        let openid: OpenIdConfig = http
            .send_json(http.get(&discovery), WalletError::DiscoveryFailed)
            .await?;

        log::debug!("exchanging pre-authorized code at {}", openid.token_endpoint);
        let token: TokenResponse = http
            .send_json(
                http.post(&openid.token_endpoint)
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(token_request_body(code)),
                WalletError::TokenExchangeFailed,
            )
            .await?;

        let mut ids = Vec::with_capacity(offer.credentials.len());
        for offered in &offer.credentials {
            let request = CredentialRequest {
                format: offered.format.clone(),
                types: offered.types.clone(),
            };
            log::debug!("requesting {:?} ({}) from {}", request.types, request.format, openid.credential_endpoint);
            let response: CredentialResponse = http
                .send_json(
                    http.post(&openid.credential_endpoint)
                        .header(AUTHORIZATION, format!("Bearer {}", token.access_token))
                        .json(&request),
                    WalletError::CredentialFetchFailed,
                )
                .await?;
            ids.push(self.persist(response.encoded()).await?);
        }

        log::info!("stored {} credential(s) from {}", ids.len(), offer.credential_issuer);
        Ok(ids)
    }

    async fn issue_from_link(&self, source: &Url) -> WalletResult<String> {
        let http = &self.ctx.http;
        log::debug!("fetching credential directly from {}", source);
        let encoded = http
            .send(http.get(source.as_str()), WalletError::CredentialFetchFailed)
            .await?;
        if encoded.trim().is_empty() {
            return Err(WalletError::CredentialFetchFailed(format!("{} returned no credential", source)));
        }
        let id = self.persist(encoded).await?;
        log::info!("stored credential {} from direct link", id);
        Ok(id)
    }

    async fn persist(&self, encoded: String) -> WalletResult<String> {
        self.ctx
            .store
            .save_credential(StoredCredential::from_encoded(encoded))
            .await
    }
}
