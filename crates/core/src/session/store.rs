use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::backend::{FileBackend, MemoryBackend, SessionBackend};
use crate::models::Profile;

/// Snapshot of the authenticated operator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque bearer token; absent means unauthenticated.
    pub token: Option<String>,
    /// Admin flag stored next to the token.
    pub is_admin: bool,
    /// Cached operator profile.
    pub profile: Option<Profile>,
}

impl Session {
    /// A session only counts when it carries a non-empty token.
    pub fn is_authenticated(&self) -> bool {
        self.token
            .as_deref()
            .map(|token| !token.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Thread-safe session shared by the API client, the guard and the login flow.
///
/// All fields are replaced under one write lock, so readers never observe a
/// token paired with another operator's profile. Persistence failures are
/// logged; the in-memory state stays authoritative for the running process.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<Session>>,
    backend: Arc<dyn SessionBackend>,
}

impl SessionStore {
    /// Store that forgets everything on exit.
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Session::default())),
            backend: Arc::new(MemoryBackend::default()),
        }
    }

    /// Store persisted to the JSON file at `path`, restoring any previous session.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_backend(Arc::new(FileBackend::new(path)))
    }

    /// Store backed by an arbitrary backend.
    pub fn with_backend(backend: Arc<dyn SessionBackend>) -> Result<Self> {
        let restored = backend.load()?.unwrap_or_default();
        let session = if restored.is_authenticated() {
            info!(
                operator_id = restored.profile.as_ref().map(|profile| profile.operator_id),
                "restored session"
            );
            restored
        } else {
            Session::default()
        };
        Ok(Self {
            inner: Arc::new(RwLock::new(session)),
            backend,
        })
    }

    /// Current bearer token, if authenticated.
    pub fn token(&self) -> Option<String> {
        let session = self.inner.read();
        if session.is_authenticated() {
            session.token.clone()
        } else {
            None
        }
    }

    /// Whether a usable token is present.
    pub fn is_authenticated(&self) -> bool {
        self.inner.read().is_authenticated()
    }

    /// Admin flag of the logged-in operator.
    pub fn is_admin(&self) -> bool {
        let session = self.inner.read();
        session.is_authenticated() && session.is_admin
    }

    /// Profile of the logged-in operator.
    pub fn profile(&self) -> Option<Profile> {
        let session = self.inner.read();
        if session.is_authenticated() {
            session.profile.clone()
        } else {
            None
        }
    }

    /// Consistent copy of every field.
    pub fn snapshot(&self) -> Session {
        self.inner.read().clone()
    }

    /// Replace the whole session after a successful login.
    pub fn set_session(&self, token: impl Into<String>, is_admin: bool, profile: Profile) {
        let mut session = self.inner.write();
        *session = Session {
            token: Some(token.into()),
            is_admin,
            profile: Some(profile),
        };
        if let Err(err) = self.backend.store(&session) {
            warn!(?err, "failed to persist session");
        }
    }

    /// Forget the session. Safe to call repeatedly.
    pub fn clear(&self) {
        let mut session = self.inner.write();
        *session = Session::default();
        if let Err(err) = self.backend.clear() {
            warn!(?err, "failed to remove persisted session");
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.inner.read();
        f.debug_struct("SessionStore")
            .field("authenticated", &session.is_authenticated())
            .field("is_admin", &session.is_admin)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn ana() -> Profile {
        Profile {
            operator_id: 7,
            name: "Ana".to_string(),
            email: "a@b.com".to_string(),
            is_admin: false,
        }
    }

    #[test]
    fn set_and_clear() {
        let store = SessionStore::in_memory();
        assert!(store.token().is_none());

        store.set_session("T1", false, ana());
        assert_eq!(store.token().as_deref(), Some("T1"));
        assert!(!store.is_admin());
        assert_eq!(store.profile().map(|p| p.operator_id), Some(7));

        store.clear();
        store.clear();
        assert!(store.token().is_none());
        assert!(store.profile().is_none());
        assert_eq!(store.snapshot(), Session::default());
    }

    #[test]
    fn clones_share_state() {
        let store = SessionStore::in_memory();
        let other = store.clone();
        store.set_session("T2", true, ana());
        assert_eq!(other.token().as_deref(), Some("T2"));
        assert!(other.is_admin());
        other.clear();
        assert!(!store.is_authenticated());
    }

    #[test]
    fn tokenless_state_is_unauthenticated() -> Result<()> {
        let backend = MemoryBackend::with_session(Session {
            token: Some("   ".to_string()),
            is_admin: true,
            profile: Some(ana()),
        });
        let store = SessionStore::with_backend(Arc::new(backend))?;
        assert!(store.token().is_none());
        assert!(!store.is_admin());
        assert!(store.profile().is_none());
        Ok(())
    }

    #[test]
    fn reopening_restores_persisted_session() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("session.json");

        let store = SessionStore::open(&path)?;
        store.set_session("T3", true, ana());
        drop(store);

        let reopened = SessionStore::open(&path)?;
        assert_eq!(reopened.token().as_deref(), Some("T3"));
        assert!(reopened.is_admin());

        reopened.clear();
        assert!(!path.exists());
        assert!(!SessionStore::open(&path)?.is_authenticated());
        Ok(())
    }
}
