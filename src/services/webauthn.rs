// src/services/webauthn.rs
//! Passkey registration and login against the verifier's relying party.
//!
//! Both ceremonies run *begin → platform authenticator → finish*:
//!
//! | Step | Registration | Login |
//! |------|--------------|-------|
//! | begin | GET `/webauthn/register/begin/{user}?state=` | GET `/webauthn/login/begin/{user}?state=` |
//! | platform | create credential | get assertion |
//! | finish | POST `/webauthn/register/finish/{user}?state=` | POST `/webauthn/login/finish/{user}?state=` |
//!
//! Finish requests carry the begin `session` both in the body and in a
//! `session_id` header. A successful registration is remembered under the
//! `wauth-{username}` setting.

use serde::Serialize;
use url::Url;

use crate::error::{WalletError, WalletResult};
use crate::models::webauthn::{
    AuthenticationResponse, CredentialCreationOptions, CredentialRequestOptions, FinishRequest,
    RegistrationResponse, WebAuthnSession,
};
use crate::network::http_client::Failure;
use crate::wallet::authenticator::PlatformError;
use crate::wallet::context::WalletContext;

/// Settings key prefix recording a completed registration.
pub const SETTING_PREFIX: &str = "wauth-";

pub const SESSION_HEADER: &str = "session_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ceremony {
    Register,
    Login,
}

impl Ceremony {
    fn path(self) -> &'static str {
        match self {
            Ceremony::Register => "register",
            Ceremony::Login => "login",
        }
    }
}

/// Settings key for `username`'s registered credential id.
pub fn setting_key(username: &str) -> String {
    format!("{}{}", SETTING_PREFIX, username)
}

fn endpoint(origin: &str, ceremony: Ceremony, step: &str, username: &str, state: &str, fail: Failure) -> WalletResult<Url> {
    let mut url = Url::parse(origin).map_err(|e| fail(format!("invalid origin {}: {}", origin, e)))?;
    url.path_segments_mut()
        .map_err(|_| fail(format!("origin {} cannot carry a path", origin)))?
        .pop_if_empty()
        .extend(["webauthn", ceremony.path(), step, username]);
    url.query_pairs_mut().append_pair("state", state);
    Ok(url)
}

fn platform_failure(error: PlatformError) -> WalletError {
    match error {
        PlatformError::NotAllowed(detail) => WalletError::CeremonyCancelled(detail),
        PlatformError::Other(detail) => WalletError::CeremonyFailed(detail),
    }
}

pub struct WebAuthnCeremony<'a> {
    ctx: &'a WalletContext,
}

impl<'a> WebAuthnCeremony<'a> {
    pub fn new(ctx: &'a WalletContext) -> Self {
        WebAuthnCeremony { ctx }
    }

    /// Registers a new passkey for `username`.
    ///
    /// # Returns
    /// The base64url id of the new credential, also saved under
    /// [`setting_key`].
    ///
    /// # Errors
    /// `BeginFailed`, `CeremonyCancelled`, `CeremonyFailed`, `FinishFailed`,
    /// or `Forbidden` on a 403.
    pub async fn register(&self, origin: &str, username: &str, state: &str) -> WalletResult<String> {
        let http = &self.ctx.http;
        let begin = endpoint(origin, Ceremony::Register, "begin", username, state, WalletError::BeginFailed)?;
        log::debug!("beginning passkey registration for {}", username);
        let mut session: WebAuthnSession<CredentialCreationOptions> = http
            .send_json(http.get(begin.as_str()), WalletError::BeginFailed)
            .await?;

        // A fresh device has nothing to exclude; a stale list would block it.
        let key = setting_key(username);
        if self.ctx.store.get_setting(&key).await?.is_none() {
            session.options.public_key.exclude_credentials.clear();
        }

        let attestation = self
            .ctx
            .authenticator
            .create(&session.options.public_key)
            .await
            .map_err(platform_failure)?;

        let response = RegistrationResponse::from(&attestation);
        let credential_id = response.raw_id.clone();
        self.finish(origin, Ceremony::Register, username, state, response, &session)
            .await?;

        self.ctx.store.put_setting(&key, &credential_id).await?;
        log::info!("registered passkey for {}", username);
        Ok(credential_id)
    }

    /// Authenticates `username` with an existing passkey.
    ///
    /// # Errors
    /// Same kinds as [`register`](Self::register).
    pub async fn login(&self, origin: &str, username: &str, state: &str) -> WalletResult<()> {
        let http = &self.ctx.http;
        let begin = endpoint(origin, Ceremony::Login, "begin", username, state, WalletError::BeginFailed)?;
        log::debug!("beginning passkey login for {}", username);
        let session: WebAuthnSession<CredentialRequestOptions> = http
            .send_json(http.get(begin.as_str()), WalletError::BeginFailed)
            .await?;

        let assertion = self
            .ctx
            .authenticator
            .get(&session.options.public_key)
            .await
            .map_err(platform_failure)?;

        self.finish(
            origin,
            Ceremony::Login,
            username,
            state,
            AuthenticationResponse::from(&assertion),
            &session,
        )
        .await?;
        log::info!("passkey login succeeded for {}", username);
        Ok(())
    }

    async fn finish<R: Serialize, O>(
        &self,
        origin: &str,
        ceremony: Ceremony,
        username: &str,
        state: &str,
        response: R,
        session: &WebAuthnSession<O>,
    ) -> WalletResult<()> {
        let http = &self.ctx.http;
        let finish = endpoint(origin, ceremony, "finish", username, state, WalletError::FinishFailed)?;
        let body = FinishRequest {
            response,
            session: session.session.clone(),
        };
        http.send(
            http.post(finish.as_str())
                .header(SESSION_HEADER, session.session_id())
                .json(&body),
            WalletError::FinishFailed,
        )
        .await?;
        Ok(())
    }
}
