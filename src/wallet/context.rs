// src/wallet/context.rs
//! Shared collaborators handed to every flow.

use std::sync::Arc;

use crate::config::WalletConfig;
use crate::error::WalletResult;
use crate::network::http_client::HttpClient;
use crate::wallet::authenticator::PlatformAuthenticator;
use crate::wallet::credential_storage::CredentialStore;
use crate::wallet::key_management::DidKeyManager;

/// Everything a flow needs besides its own transient state.
///
/// Built once by the host and borrowed by each flow constructor. Holds no
/// per-flow state, so concurrent flows can share it.
pub struct WalletContext {
    pub config: WalletConfig,
    pub http: HttpClient,
    pub store: Arc<dyn CredentialStore>,
    pub authenticator: Arc<dyn PlatformAuthenticator>,
    pub keys: DidKeyManager,
}

impl WalletContext {
    /// # Errors
    /// `Config` if the HTTP client cannot be built.
    pub fn new(
        config: WalletConfig,
        store: Arc<dyn CredentialStore>,
        authenticator: Arc<dyn PlatformAuthenticator>,
    ) -> WalletResult<Self> {
        let http = HttpClient::new(config.request_timeout())?;
        Ok(WalletContext {
            config,
            http,
            store,
            authenticator,
            keys: DidKeyManager::new(),
        })
    }

    /// The holder DID, created on first use.
    pub async fn holder_did(&self) -> WalletResult<String> {
        self.keys.ensure_identity(self.store.as_ref()).await
    }
}
