use serde_json::{Map, Value};
use std::io::ErrorKind;
use tracing::debug;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::id::SessionId;

pub type Payload = Map<String, Value>;

/// On-disk session files, one JSON object per session
#[derive(Debug, Clone)]
pub struct SessionStore {
    config: SessionConfig,
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Create the session directory if it is missing
    pub async fn ensure_dir(&self) -> Result<(), SessionError> {
        tokio::fs::create_dir_all(&self.config.dir).await?;
        Ok(())
    }

    /// Read a session file. `Ok(None)` when no file exists for `id`.
    pub async fn load(&self, id: &SessionId) -> Result<Option<Payload>, SessionError> {
        let path = self.config.file_path(id);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let payload = serde_json::from_slice::<Payload>(&bytes)
            .map_err(|source| SessionError::Corrupt { path, source })?;

        Ok(Some(payload))
    }

    /// Rewrite the whole file. The payload goes to a temporary sibling first
    /// and is renamed into place, so readers see either the old or the new
    /// contents.
    pub async fn save(&self, id: &SessionId, payload: &Payload) -> Result<(), SessionError> {
        let path = self.config.file_path(id);
        let tmp = self
            .config
            .dir
            .join(format!(".sess-px-{}.{}.tmp", id, Uuid::new_v4().simple()));

        let bytes = serde_json::to_vec(payload)?;
        tokio::fs::write(&tmp, bytes).await?;

        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!("Saved session {}", id);
        Ok(())
    }

    /// Delete the file if present
    pub async fn remove(&self, id: &SessionId) -> Result<(), SessionError> {
        match tokio::fs::remove_file(self.config.file_path(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_in(dir: &tempfile::TempDir) -> SessionStore {
        SessionStore::new(SessionConfig::default().with_dir(dir.path()))
    }

    #[tokio::test]
    async fn test_load_missing_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let loaded = store.load(&SessionId::generate()).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let id = SessionId::generate();

        let mut payload = Payload::new();
        payload.insert("_sid".into(), json!(id.as_str()));
        payload.insert("visits".into(), json!(3));
        store.save(&id, &payload).await.unwrap();

        let loaded = store.load(&id).await.unwrap().unwrap();
        assert_eq!(loaded, payload);

        // No temporary files are left behind
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let id = SessionId::generate();

        std::fs::write(store.config().file_path(&id), b"{not json").unwrap();

        let err = store.load(&id).await.unwrap_err();
        assert!(matches!(err, SessionError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let id = SessionId::generate();

        store.save(&id, &Payload::new()).await.unwrap();
        store.remove(&id).await.unwrap();
        store.remove(&id).await.unwrap();
        assert!(!store.config().file_path(&id).exists());
    }

    #[tokio::test]
    async fn test_save_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(
            SessionConfig::default().with_dir(dir.path().join("does-not-exist")),
        );

        let err = store.save(&SessionId::generate(), &Payload::new()).await;
        assert!(matches!(err, Err(SessionError::Io(_))));

        store.ensure_dir().await.unwrap();
        store.save(&SessionId::generate(), &Payload::new()).await.unwrap();
    }
}
