use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::warn;

use super::Session;
use crate::models::Profile;

/// Where a [`SessionStore`](super::SessionStore) persists its state.
pub trait SessionBackend: Send + Sync {
    /// Read the persisted session, if any.
    fn load(&self) -> Result<Option<Session>>;
    /// Replace the persisted session.
    fn store(&self, session: &Session) -> Result<()>;
    /// Remove the persisted session. Must succeed when nothing is stored.
    fn clear(&self) -> Result<()>;
}

/// Keeps the session only for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    stored: Mutex<Option<Session>>,
}

impl MemoryBackend {
    /// Backend seeded with an existing session.
    pub fn with_session(session: Session) -> Self {
        Self {
            stored: Mutex::new(Some(session)),
        }
    }
}

impl SessionBackend for MemoryBackend {
    fn load(&self) -> Result<Option<Session>> {
        Ok(self.stored.lock().clone())
    }

    fn store(&self, session: &Session) -> Result<()> {
        *self.stored.lock() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.stored.lock() = None;
        Ok(())
    }
}

/// On-disk layout, keyed like the browser storage slots of the web console.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    #[serde(default)]
    token: Option<String>,
    #[serde(rename = "isAdmin", default)]
    is_admin: bool,
    #[serde(rename = "usuarioLogado", default)]
    profile: Option<Profile>,
}

/// Persists the session as a JSON file, replaced atomically on every write.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    /// Backend writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the session file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionBackend for FileBackend {
    fn load(&self) -> Result<Option<Session>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read session {}", self.path.display()))
            }
        };

        match serde_json::from_str::<StoredSession>(&contents) {
            Ok(stored) => Ok(Some(Session {
                token: stored.token,
                is_admin: stored.is_admin,
                profile: stored.profile,
            })),
            Err(err) => {
                warn!(path = %self.path.display(), %err, "ignoring malformed session file");
                Ok(None)
            }
        }
    }

    fn store(&self, session: &Session) -> Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;

        let stored = StoredSession {
            token: session.token.clone(),
            is_admin: session.is_admin,
            profile: session.profile.clone(),
        };
        let serialized = serde_json::to_vec_pretty(&stored).context("failed to serialize session")?;

        let mut file = NamedTempFile::new_in(parent)
            .with_context(|| format!("failed to create temp file in {}", parent.display()))?;
        file.write_all(&serialized)
            .context("failed to write session temp file")?;
        file.persist(&self.path)
            .with_context(|| format!("failed to write session {}", self.path.display()))?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err)
                .with_context(|| format!("failed to remove session {}", self.path.display())),
        }
    }
}
