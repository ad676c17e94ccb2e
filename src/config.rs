// src/config.rs
//! Wallet configuration.
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults
//! 2. an optional `wallet.{toml,json,yaml,...}` in the working directory
//! 3. `WALLET_*` environment variables (a `.env` file is loaded first)
//!
//! ## Environment Variables
//! - `WALLET_SUPPORTED_SCOPE`: credential scope this wallet presents
//! - `WALLET_VERIFIER_MODE`: `opaque` or `status_code`
//! - `WALLET_WEBAUTHN_ORIGIN`: relying-party origin for passkey ceremonies
//! - `WALLET_REQUEST_TIMEOUT_SECS`: per-request timeout (unset = none)
//! - `WALLET_RECENT_LIMIT`: credentials considered for a presentation

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::time::Duration;

use crate::error::WalletResult;

pub const DEFAULT_SCOPE: &str = "dsba.credentials.presentation.Employee";
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// How the verifier's answer to a presentation POST is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerifierMode {
    /// Any completed request counts as delivered; acceptance is out of band.
    Opaque,
    /// 404 starts passkey registration, 200 starts passkey login, anything
    /// else is a rejection.
    #[default]
    StatusCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WalletConfig {
    #[serde(default = "default_scope")]
    pub supported_scope: String,

    #[serde(default)]
    pub verifier_mode: VerifierMode,

    /// Falls back to the origin of the verifier's `redirect_uri`
    #[serde(default)]
    pub webauthn_origin: Option<String>,

    /// No timeout unless set
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

fn default_recent_limit() -> usize {
    DEFAULT_RECENT_LIMIT
}

impl Default for WalletConfig {
    fn default() -> Self {
        WalletConfig {
            supported_scope: default_scope(),
            verifier_mode: VerifierMode::default(),
            webauthn_origin: None,
            request_timeout_secs: None,
            recent_limit: default_recent_limit(),
        }
    }
}

impl WalletConfig {
    /// Loads `.env`, the optional `wallet` file and `WALLET_*` variables.
    ///
    /// # Errors
    /// `Config` if a source is present but unreadable or has bad values.
    pub fn load() -> WalletResult<Self> {
        dotenv::dotenv().ok();
        let config = Config::builder()
            .add_source(File::with_name("wallet").required(false))
            .add_source(Environment::with_prefix("WALLET").try_parsing(true))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Parses configuration from TOML text, defaults filling the gaps.
    pub fn from_toml(text: &str) -> WalletResult<Self> {
        let config = Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
