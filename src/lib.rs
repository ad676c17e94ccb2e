// src/lib.rs
//! Protocol core of a browser identity wallet.
//!
//! - [`wallet::key_management`]: P-256 `did:key` holder identity
//! - [`services::credential_offer`]: OIDC4VCI pre-authorized-code issuance
//! - [`services::presentation`]: OpenID4VP presentation to a verifier
//! - [`services::webauthn`]: passkey ceremonies requested by a verifier
//! - [`services::scanner`]: routing of scanned links to the flows above
//!
//! Storage and the platform authenticator are host collaborators behind
//! [`wallet::credential_storage::CredentialStore`] and
//! [`wallet::authenticator::PlatformAuthenticator`].

pub mod config;
pub mod error;
pub mod models;
pub mod network;
pub mod services;
pub mod utils;
pub mod wallet;
