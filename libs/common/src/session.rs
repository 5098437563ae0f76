//! Session token management
//!
//! The bearer token lives in a [`Session`] handle that is passed to every
//! component needing it. Storage is pluggable through [`TokenStorage`]; the
//! file backend keeps the token under a single well-known key so other tools
//! can find it. Sign-ins and invalidations are published on a broadcast
//! channel so that interested components learn about forced logouts without
//! polling storage, and never miss a transition that is quickly followed by
//! another one.

use serde_json::{Map, Value};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, RwLock},
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::StorageResult;

/// Key under which the token is persisted
pub const TOKEN_KEY: &str = "auth_token";

/// Events buffered per subscriber before the oldest are dropped
const EVENT_CAPACITY: usize = 16;

/// Persistence backend for the session token
pub trait TokenStorage: Send + Sync {
    /// Load the stored token, if any
    fn load(&self) -> StorageResult<Option<String>>;

    /// Persist a token, replacing any previous one
    fn store(&self, token: &str) -> StorageResult<()>;

    /// Forget the stored token
    fn remove(&self) -> StorageResult<()>;
}

/// Token storage backed by a small JSON document on disk
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> StorageResult<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }

        Ok(serde_json::from_str(&raw)?)
    }

    fn write_document(&self, document: &Map<String, Value>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
            options.mode(0o600);
            // `mode` only applies on creation
            if self.path.exists() {
                fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
            }
        }

        let mut file = options.open(&self.path)?;
        file.write_all(&serde_json::to_vec_pretty(document)?)?;
        Ok(())
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> StorageResult<Option<String>> {
        let document = self.read_document()?;
        Ok(document
            .get(TOKEN_KEY)
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(str::to_string))
    }

    fn store(&self, token: &str) -> StorageResult<()> {
        let mut document = self.read_document()?;
        document.insert(TOKEN_KEY.to_string(), Value::String(token.to_string()));
        self.write_document(&document)
    }

    fn remove(&self) -> StorageResult<()> {
        let mut document = self.read_document()?;
        if document.remove(TOKEN_KEY).is_some() {
            self.write_document(&document)?;
        }
        Ok(())
    }
}

/// Token storage that only lives as long as the process
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStorage {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Mutex::new(token),
        }
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> StorageResult<Option<String>> {
        Ok(self
            .token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    fn store(&self, token: &str) -> StorageResult<()> {
        *self
            .token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(token.to_string());
        Ok(())
    }

    fn remove(&self) -> StorageResult<()> {
        *self
            .token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        Ok(())
    }
}

/// Why a session lost its token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationReason {
    /// The user signed out
    Logout,
    /// The backend rejected the token with 401
    Unauthorized,
}

/// Session transition, observed through [`Session::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A token was written
    SignedIn,
    /// The token was cleared
    Invalidated(InvalidationReason),
}

struct SessionInner {
    storage: Box<dyn TokenStorage>,
    token: RwLock<Option<String>>,
    events: broadcast::Sender<SessionEvent>,
}

/// Shared handle over the current bearer token
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Open a session, loading any previously persisted token
    pub fn new(storage: impl TokenStorage + 'static) -> Self {
        let token = match storage.load() {
            Ok(token) => token,
            Err(e) => {
                warn!("Failed to load stored session token: {}", e);
                None
            }
        };

        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(SessionInner {
                storage: Box::new(storage),
                token: RwLock::new(token),
                events,
            }),
        }
    }

    /// Session persisted in a token file
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self::new(FileTokenStorage::new(path))
    }

    /// Session that is never persisted
    pub fn in_memory(token: Option<String>) -> Self {
        Self::new(MemoryTokenStorage::new(token))
    }

    /// Current token, if signed in
    pub fn read(&self) -> Option<String> {
        self.inner
            .token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    /// Replace the current token and persist it
    pub fn write(&self, token: impl Into<String>) {
        let token = token.into();

        if let Err(e) = self.inner.storage.store(&token) {
            warn!("Failed to persist session token: {}", e);
        }

        *self
            .inner
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(token);

        info!("Session token stored");
        self.publish(SessionEvent::SignedIn);
    }

    /// Drop the current token.
    ///
    /// Returns `true` when a token was actually removed; only then is an
    /// invalidation published.
    pub fn clear(&self, reason: InvalidationReason) -> bool {
        self.clear_matching(None, reason)
    }

    /// Drop the current token only if it is still `expected`.
    ///
    /// A 401 answering a request sent with an older token must not sign out
    /// a session that has since been given a new one.
    pub fn clear_if(&self, expected: &str, reason: InvalidationReason) -> bool {
        self.clear_matching(Some(expected), reason)
    }

    fn clear_matching(&self, expected: Option<&str>, reason: InvalidationReason) -> bool {
        let mut token = self
            .inner
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(expected) = expected {
            if token.as_deref() != Some(expected) {
                debug!("Ignoring invalidation for a token that was already replaced");
                return false;
            }
        }

        let previous = token.take();
        if let Err(e) = self.inner.storage.remove() {
            warn!("Failed to remove persisted session token: {}", e);
        }
        drop(token);

        if previous.is_none() {
            return false;
        }

        info!("Session token cleared ({:?})", reason);
        self.publish(SessionEvent::Invalidated(reason));
        true
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }

    /// Receive every session transition from now on
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileTokenStorage::new(dir.path().join("nested/session.json"));

        assert_eq!(storage.load().unwrap(), None);
        storage.store("tok-1").unwrap();
        assert_eq!(storage.load().unwrap(), Some("tok-1".to_string()));
        storage.remove().unwrap();
        assert_eq!(storage.load().unwrap(), None);
    }

    #[test]
    fn test_file_storage_keeps_unrelated_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, r#"{"theme":"dark"}"#).unwrap();

        let storage = FileTokenStorage::new(&path);
        storage.store("tok-2").unwrap();
        storage.remove().unwrap();

        let document: Map<String, Value> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(document.get("theme"), Some(&Value::String("dark".into())));
        assert!(document.get(TOKEN_KEY).is_none());
    }

    #[test]
    fn test_session_loads_persisted_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        FileTokenStorage::new(&path).store("persisted").unwrap();

        let session = Session::from_file(&path);
        assert_eq!(session.read(), Some("persisted".to_string()));
    }

    #[test]
    fn test_session_survives_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();

        let session = Session::from_file(&path);
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_clear_publishes_invalidation_once() {
        let session = Session::in_memory(Some("tok".to_string()));
        let mut events = session.subscribe();
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));

        assert!(session.clear(InvalidationReason::Unauthorized));
        assert_eq!(
            events.try_recv(),
            Ok(SessionEvent::Invalidated(InvalidationReason::Unauthorized))
        );

        // Nothing left to clear
        assert!(!session.clear(InvalidationReason::Unauthorized));
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn test_write_publishes_sign_in() {
        let session = Session::in_memory(None);
        let mut events = session.subscribe();

        session.write("fresh");
        assert_eq!(session.read(), Some("fresh".to_string()));
        assert_eq!(events.try_recv(), Ok(SessionEvent::SignedIn));
    }

    #[test]
    fn test_quick_transitions_are_all_delivered() {
        let session = Session::in_memory(Some("old".to_string()));
        let mut events = session.subscribe();

        session.clear(InvalidationReason::Unauthorized);
        session.write("new");

        assert_eq!(
            events.try_recv(),
            Ok(SessionEvent::Invalidated(InvalidationReason::Unauthorized))
        );
        assert_eq!(events.try_recv(), Ok(SessionEvent::SignedIn));
    }

    #[test]
    fn test_clear_if_ignores_replaced_token() {
        let session = Session::in_memory(Some("old".to_string()));
        let mut events = session.subscribe();
        session.write("new");
        assert_eq!(events.try_recv(), Ok(SessionEvent::SignedIn));

        assert!(!session.clear_if("old", InvalidationReason::Unauthorized));
        assert_eq!(session.read(), Some("new".to_string()));
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));

        assert!(session.clear_if("new", InvalidationReason::Unauthorized));
        assert!(!session.is_authenticated());
    }

    #[cfg(unix)]
    #[test]
    fn test_token_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        FileTokenStorage::new(&path).store("secret").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        let fresh = dir.path().join("fresh/session.json");
        FileTokenStorage::new(&fresh).store("secret").unwrap();
        let mode = fs::metadata(&fresh).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_clones_share_state() {
        let session = Session::in_memory(None);
        let other = session.clone();

        session.write("shared");
        assert_eq!(other.read(), Some("shared".to_string()));
        other.clear(InvalidationReason::Logout);
        assert!(!session.is_authenticated());
    }
}
