//! Speech Provider Credentials
//!
//! A `Credentials` value is immutable. The process-wide current set lives in a
//! `CredentialHandle`, which hands out `Arc` snapshots and replaces the whole
//! set in one step, so a reader sees either the old pair or the new pair and
//! never a mix of the two.

use async_trait::async_trait;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;
use tracing::info;

/// Key value shipped in sample configuration files; treated as "no key".
pub const PLACEHOLDER_KEY: &str = "your_azure_speech_key";

/// Region applied when an update request does not name one.
pub const DEFAULT_REGION: &str = "japaneast";

/// A provider subscription key and the region it belongs to.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub key: String,
    pub region: String,
}

impl Credentials {
    pub fn new(key: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            region: region.into(),
        }
    }

    /// Both fields are present and the key is not the sample placeholder.
    pub fn is_configured(&self) -> bool {
        !self.key.is_empty() && !self.region.is_empty() && self.key != PLACEHOLDER_KEY
    }
}

/// Region names are lowercase ASCII letters and digits, e.g. `westeurope2`.
///
/// The region becomes part of the provider host name, so anything else is refused.
pub fn is_valid_region(region: &str) -> bool {
    !region.is_empty()
        && region
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

// The key never reaches logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &if self.key.is_empty() { "" } else { "<redacted>" })
            .field("region", &self.region)
            .finish()
    }
}

/// Shared, atomically swappable reference to the current `Credentials`.
#[derive(Clone, Default)]
pub struct CredentialHandle {
    current: Arc<RwLock<Arc<Credentials>>>,
}

impl CredentialHandle {
    pub fn new(initial: Credentials) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(initial))),
        }
    }

    /// The credentials in effect right now.
    pub fn snapshot(&self) -> Arc<Credentials> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Installs `next` for every later `snapshot` call.
    pub fn replace(&self, next: Credentials) {
        let next = Arc::new(next);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

/// Errors reported by the credential update path.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Invalid credentials provided")]
    Invalid,
    #[error("Failed to persist credentials: {0}")]
    Persist(String),
}

/// Durable storage for the credential pair.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Writes `credentials` so that a restarted process picks them up.
    async fn persist(&self, credentials: &Credentials) -> anyhow::Result<()>;
}

/// Validates, persists and installs new credentials.
pub struct CredentialManager {
    handle: CredentialHandle,
    store: Arc<dyn CredentialStore>,
    // Held across persist and replace so the stored pair and the live pair agree.
    update: Mutex<()>,
}

impl CredentialManager {
    pub fn new(handle: CredentialHandle, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            handle,
            store,
            update: Mutex::new(()),
        }
    }

    pub fn handle(&self) -> &CredentialHandle {
        &self.handle
    }

    /// Applies a new key/region pair.
    ///
    /// The pair is persisted before it is installed. On any failure the
    /// previous credentials stay in effect. Concurrent updates are applied
    /// one at a time.
    pub async fn apply(&self, key: &str, region: &str) -> Result<(), CredentialError> {
        if key.is_empty() || !is_valid_region(region) {
            return Err(CredentialError::Invalid);
        }

        let next = Credentials::new(key, region);
        let _update = self.update.lock().await;
        self.store
            .persist(&next)
            .await
            .map_err(|e| CredentialError::Persist(format!("{:#}", e)))?;

        self.handle.replace(next);
        info!(%region, "Speech credentials updated.");
        Ok(())
    }
}
