// src/error.rs
//! Error taxonomy for the wallet core.
//!
//! Every flow returns [`WalletResult`]. Failures are terminal for the flow
//! invocation that produced them: nothing here is retried, and each variant
//! carries the detail (usually the server's response body) that the calling
//! UI layer renders next to [`WalletError::title`].

use thiserror::Error;

/// All failure kinds surfaced by the wallet core.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// The scanned or deep-linked URL is malformed or not supported.
    #[error("invalid source: {0}")]
    InvalidSource(String),

    /// Any network step answered HTTP 403.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("credential offer fetch failed: {0}")]
    OfferFetchFailed(String),

    #[error("issuer discovery failed: {0}")]
    DiscoveryFailed(String),

    #[error("token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("credential fetch failed: {0}")]
    CredentialFetchFailed(String),

    #[error("unsupported scope: {0}")]
    UnsupportedScope(String),

    #[error("presentation rejected: {0}")]
    PresentationRejected(String),

    /// A stored entry could not be embedded in a presentation.
    #[error("malformed stored credential: {0}")]
    MalformedCredential(String),

    #[error("webauthn begin failed: {0}")]
    BeginFailed(String),

    /// The user dismissed or refused the platform authenticator prompt.
    #[error("webauthn ceremony cancelled: {0}")]
    CeremonyCancelled(String),

    #[error("webauthn ceremony failed: {0}")]
    CeremonyFailed(String),

    #[error("webauthn finish failed: {0}")]
    FinishFailed(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// No P-256 provider is available on this platform.
    #[error("crypto unavailable: {0}")]
    CryptoUnavailable(String),

    #[error("key generation failed: {0}")]
    KeyGenerationFailed(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl WalletError {
    /// Short human-readable title for the failure.
    pub fn title(&self) -> &'static str {
        match self {
            WalletError::InvalidSource(_) => "Unsupported QR code or link",
            WalletError::Forbidden(_) => "Access denied",
            WalletError::OfferFetchFailed(_) => "Could not retrieve the credential offer",
            WalletError::DiscoveryFailed(_) => "Could not contact the issuer",
            WalletError::TokenExchangeFailed(_) => "The issuer refused the offer code",
            WalletError::CredentialFetchFailed(_) => "Could not retrieve the credential",
            WalletError::UnsupportedScope(_) => "Credential type not supported",
            WalletError::PresentationRejected(_) => "The verifier rejected the presentation",
            WalletError::MalformedCredential(_) => "A stored credential is damaged",
            WalletError::BeginFailed(_) => "Could not start authentication",
            WalletError::CeremonyCancelled(_) => "Authentication cancelled",
            WalletError::CeremonyFailed(_) => "Authenticator error",
            WalletError::FinishFailed(_) => "Could not complete authentication",
            WalletError::StorageUnavailable(_) => "Wallet storage unavailable",
            WalletError::CryptoUnavailable(_) => "Cryptography not available",
            WalletError::KeyGenerationFailed(_) => "Could not create a key",
            WalletError::Config(_) => "Invalid wallet configuration",
        }
    }

    /// Detail carried by the failure, typically the server's response body.
    pub fn message(&self) -> &str {
        match self {
            WalletError::InvalidSource(m)
            | WalletError::Forbidden(m)
            | WalletError::OfferFetchFailed(m)
            | WalletError::DiscoveryFailed(m)
            | WalletError::TokenExchangeFailed(m)
            | WalletError::CredentialFetchFailed(m)
            | WalletError::UnsupportedScope(m)
            | WalletError::PresentationRejected(m)
            | WalletError::MalformedCredential(m)
            | WalletError::BeginFailed(m)
            | WalletError::CeremonyCancelled(m)
            | WalletError::CeremonyFailed(m)
            | WalletError::FinishFailed(m)
            | WalletError::StorageUnavailable(m)
            | WalletError::CryptoUnavailable(m)
            | WalletError::KeyGenerationFailed(m)
            | WalletError::Config(m) => m,
        }
    }
}

impl From<config::ConfigError> for WalletError {
    fn from(e: config::ConfigError) -> Self {
        WalletError::Config(e.to_string())
    }
}

/// Result type shared by every wallet operation.
pub type WalletResult<T> = Result<T, WalletError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_and_message() {
        let err = WalletError::Forbidden("GET https://issuer.example/offer".into());
        assert_eq!(err.title(), "Access denied");
        assert_eq!(err.message(), "GET https://issuer.example/offer");
        assert_eq!(err.to_string(), "forbidden: GET https://issuer.example/offer");
    }
}
