// src/wallet/authenticator.rs
//! Platform authenticator (passkey) interface.
//!
//! The WebAuthn ceremony hands decoded options to the platform and gets raw
//! buffers back. A browser embedding bridges this to
//! `navigator.credentials.create/get`; other hosts plug in a security-key
//! library or refuse.

use async_trait::async_trait;

use crate::models::webauthn::{
    AssertionCredential, AttestationCredential, PublicKeyCredentialCreationOptions,
    PublicKeyCredentialRequestOptions,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// The user cancelled, timed out or the platform refused the request.
    NotAllowed(String),
    Other(String),
}

#[async_trait]
pub trait PlatformAuthenticator: Send + Sync {
    /// Creates a new credential. May wait indefinitely for the user.
    async fn create(
        &self,
        options: &PublicKeyCredentialCreationOptions,
    ) -> Result<AttestationCredential, PlatformError>;

    /// Produces an assertion with an existing credential.
    async fn get(
        &self,
        options: &PublicKeyCredentialRequestOptions,
    ) -> Result<AssertionCredential, PlatformError>;
}

/// Authenticator for hosts without passkey support. Refuses every request.
pub struct UnavailableAuthenticator;

#[async_trait]
impl PlatformAuthenticator for UnavailableAuthenticator {
    async fn create(
        &self,
        _options: &PublicKeyCredentialCreationOptions,
    ) -> Result<AttestationCredential, PlatformError> {
        Err(PlatformError::NotAllowed("no platform authenticator available".into()))
    }

    async fn get(
        &self,
        _options: &PublicKeyCredentialRequestOptions,
    ) -> Result<AssertionCredential, PlatformError> {
        Err(PlatformError::NotAllowed("no platform authenticator available".into()))
    }
}
