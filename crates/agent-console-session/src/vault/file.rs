//! File-backed session vault.

use std::path::PathBuf;

use agent_console_core::types::{PERSISTED_SESSION_VERSION, PersistedSession};
use agent_console_core::{SessionVault, VaultError};
use async_trait::async_trait;

/// Vault storing the session blob as one JSON file.
///
/// Loading is fail-soft: a missing file, unreadable content, malformed
/// JSON, or an unknown schema version all restore as "no session".
pub struct FileVault {
    path: PathBuf,
}

impl FileVault {
    /// Create a vault at an explicit path.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Vault at the platform data directory (`agent-console/session.json`).
    ///
    /// Falls back to the current directory when no data directory exists.
    #[must_use]
    pub fn at_default_path() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join("agent-console").join("session.json"))
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl SessionVault for FileVault {
    async fn load(&self) -> Option<PersistedSession> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Failed to read session file: {e}");
                return None;
            }
        };

        let stored: PersistedSession = match serde_json::from_str(&raw) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("Discarding malformed session file: {e}");
                return None;
            }
        };

        if stored.version == PERSISTED_SESSION_VERSION {
            Some(stored)
        } else {
            tracing::warn!(
                "Discarding session file with unknown schema version {}",
                stored.version
            );
            None
        }
    }

    async fn save(&self, session: &PersistedSession) -> Result<(), VaultError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_string_pretty(session)?;
        tokio::fs::write(&self.path, raw).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), VaultError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn temp_vault() -> FileVault {
        let dir = std::env::temp_dir()
            .join("agent-console-tests")
            .join(Uuid::new_v4().to_string());
        FileVault::new(dir.join("session.json"))
    }

    #[tokio::test]
    async fn missing_file_loads_as_no_session() {
        let vault = temp_vault();
        assert!(vault.load().await.is_none());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let vault = temp_vault();
        let blob = PersistedSession::new(Some("t1".into()), Some("r1".into()), None);

        vault.save(&blob).await.unwrap();
        let loaded = vault.load().await.unwrap();

        assert_eq!(loaded.access_token.as_deref(), Some("t1"));
        assert_eq!(loaded.refresh_token.as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn malformed_json_loads_as_no_session() {
        let vault = temp_vault();
        tokio::fs::create_dir_all(vault.path().parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(vault.path(), "{not json").await.unwrap();

        assert!(vault.load().await.is_none());
    }

    #[tokio::test]
    async fn unknown_schema_version_loads_as_no_session() {
        let vault = temp_vault();
        let blob = PersistedSession {
            version: 99,
            ..PersistedSession::default()
        };

        vault.save(&blob).await.unwrap();
        assert!(vault.load().await.is_none());
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let vault = temp_vault();
        vault.clear().await.unwrap();

        vault
            .save(&PersistedSession::new(Some("t1".into()), None, None))
            .await
            .unwrap();
        vault.clear().await.unwrap();
        vault.clear().await.unwrap();

        assert!(vault.load().await.is_none());
    }
}
