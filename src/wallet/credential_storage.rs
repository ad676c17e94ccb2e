// src/wallet/credential_storage.rs
//! Credential storage interface for the wallet.
//!
//! The flows only ever talk to [`CredentialStore`]. Durable storage belongs
//! to the embedding application; [`MemoryStore`] keeps everything in
//! hashmaps for the command-line binary and for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::{WalletError, WalletResult};
use crate::models::credential::StoredCredential;

/// Keyed storage of credentials and small opaque settings.
///
/// Implementations must serialize concurrent writes to the same key.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Stores a credential, overwriting any record with the same id, and
    /// returns its id.
    async fn save_credential(&self, credential: StoredCredential) -> WalletResult<String>;

    async fn get_credential(&self, id: &str) -> WalletResult<Option<StoredCredential>>;

    /// Up to `limit` credentials, newest first.
    async fn list_recent(&self, limit: usize) -> WalletResult<Vec<StoredCredential>>;

    /// Returns true if a credential was removed.
    async fn delete_credential(&self, id: &str) -> WalletResult<bool>;

    async fn get_setting(&self, key: &str) -> WalletResult<Option<String>>;

    async fn put_setting(&self, key: &str, value: &str) -> WalletResult<()>;
}

/// In-memory [`CredentialStore`].
///
/// # Note
/// Nothing survives the process. Embedders supply a persistent store.
#[derive(Default)]
pub struct MemoryStore {
    credentials: Mutex<HashMap<String, StoredCredential>>,
    settings: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored credentials.
    pub fn count_credentials(&self) -> usize {
        self.credentials.lock().map(|c| c.len()).unwrap_or(0)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> WalletResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| WalletError::StorageUnavailable("store lock poisoned".into()))
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn save_credential(&self, credential: StoredCredential) -> WalletResult<String> {
        let id = credential.id().to_string();
        lock(&self.credentials)?.insert(id.clone(), credential);
        Ok(id)
    }

    async fn get_credential(&self, id: &str) -> WalletResult<Option<StoredCredential>> {
        Ok(lock(&self.credentials)?.get(id).cloned())
    }

    async fn list_recent(&self, limit: usize) -> WalletResult<Vec<StoredCredential>> {
        let mut all: Vec<StoredCredential> = lock(&self.credentials)?.values().cloned().collect();
        all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.hash.cmp(&b.hash)));
        all.truncate(limit);
        Ok(all)
    }

    async fn delete_credential(&self, id: &str) -> WalletResult<bool> {
        Ok(lock(&self.credentials)?.remove(id).is_some())
    }

    async fn get_setting(&self, key: &str) -> WalletResult<Option<String>> {
        Ok(lock(&self.settings)?.get(key).cloned())
    }

    async fn put_setting(&self, key: &str, value: &str) -> WalletResult<()> {
        lock(&self.settings)?.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
