/*
[INPUT]:  Persisted sessions and a storage location
[OUTPUT]: Durable load/save/clear of the current session
[POS]:    Auth layer - passive persistence surface owned by the token manager
[UPDATE]: When the token file format or write strategy changes
*/

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::http::{PrecogError, Result};

use super::PersistedSession;

/// Persistence for the single current session.
///
/// "Nothing stored yet" is `Ok(None)`, never an error.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self) -> Result<Option<PersistedSession>>;

    /// Replace any stored session; readers never observe a partial write
    async fn save(&self, session: &PersistedSession) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

/// JSON token file on local disk
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "tokens".to_string());
        self.path
            .with_file_name(format!(".{name}.{}.tmp", Uuid::new_v4()))
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<Option<PersistedSession>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) if err.kind() == ErrorKind::InvalidData => {
                warn!(path = %self.path.display(), error = %err, "token file is not valid UTF-8, ignoring");
                return Ok(None);
            }
            Err(err) => {
                return Err(PrecogError::storage(format!(
                    "failed to read {}: {err}",
                    self.path.display()
                )));
            }
        };

        match serde_json::from_str(&content) {
            Ok(session) => Ok(Some(session)),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "unreadable token file, treating as no session");
                Ok(None)
            }
        }
    }

    async fn save(&self, session: &PersistedSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    PrecogError::storage(format!("failed to create {}: {e}", parent.display()))
                })?;
            }
        }

        let content = serde_json::to_string_pretty(session)?;

        // Atomic write: write to temp file then rename
        let temp_path = self.temp_path();
        let written = async {
            write_private(&temp_path, content.as_bytes()).await?;
            fs::rename(&temp_path, &self.path).await
        }
        .await;

        if let Err(err) = written {
            let _ = fs::remove_file(&temp_path).await;
            return Err(PrecogError::storage(format!(
                "failed to write {}: {err}",
                self.path.display()
            )));
        }

        debug!(path = %self.path.display(), "session saved");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(PrecogError::storage(format!(
                "failed to remove {}: {err}",
                self.path.display()
            ))),
        }
    }
}

/// Create `path` readable by the owner only, from the first byte on
async fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(content).await?;
    file.sync_all().await
}

/// Process-local store, for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    session: RwLock<Option<PersistedSession>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: PersistedSession) -> Self {
        Self {
            session: RwLock::new(Some(session)),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<PersistedSession>> {
        let guard = self
            .session
            .read()
            .map_err(|_| PrecogError::storage("memory store lock poisoned"))?;
        Ok(guard.clone())
    }

    async fn save(&self, session: &PersistedSession) -> Result<()> {
        let mut guard = self
            .session
            .write()
            .map_err(|_| PrecogError::storage("memory store lock poisoned"))?;
        *guard = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut guard = self
            .session
            .write()
            .map_err(|_| PrecogError::storage("memory store lock poisoned"))?;
        *guard = None;
        Ok(())
    }
}
