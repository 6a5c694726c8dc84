//! In-memory session vault.

use std::sync::RwLock;

use agent_console_core::types::{PERSISTED_SESSION_VERSION, PersistedSession};
use agent_console_core::{SessionVault, VaultError};
use async_trait::async_trait;

/// In-memory vault implementation.
///
/// Useful for tests and demos. Data is lost on restart.
#[derive(Default)]
pub struct MemoryVault {
    blob: RwLock<Option<PersistedSession>>,
}

impl MemoryVault {
    /// Create an empty in-memory vault.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionVault for MemoryVault {
    async fn load(&self) -> Option<PersistedSession> {
        let stored = self.blob.read().unwrap().clone()?;
        if stored.version == PERSISTED_SESSION_VERSION {
            Some(stored)
        } else {
            None
        }
    }

    async fn save(&self, session: &PersistedSession) -> Result<(), VaultError> {
        *self.blob.write().unwrap() = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), VaultError> {
        *self.blob.write().unwrap() = None;
        Ok(())
    }
}
