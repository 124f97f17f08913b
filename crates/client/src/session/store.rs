//! Durable session persistence shared across execution contexts.
//!
//! One JSON record on disk holds the whole session, so the credential and
//! the identity are persisted and cleared atomically together. All clones
//! of a store share a change channel; every successful write notifies the
//! other contexts, which is how a logout in one context becomes visible in
//! the rest without a reload.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use soko_core::Identity;
use thiserror::Error;
use tokio::sync::broadcast;

use super::Session;

/// Capacity of the change channel. Slow subscribers catch up by re-reading
/// the store, so lag only coalesces notifications.
const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Errors that can occur while persisting a session.
#[derive(Debug, Error)]
pub enum SessionStoreError {
    /// Filesystem write failed.
    #[error("failed to write session record: {0}")]
    Io(#[from] std::io::Error),

    /// Record serialization failed.
    #[error("failed to encode session record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// The on-disk shape of a session. Kept private so the plain-text token
/// never leaks outside load/save.
#[derive(Serialize, Deserialize)]
struct SessionRecord {
    token: String,
    user: Identity,
}

/// Durable key/value persistence for the current credential and identity.
///
/// All operations are synchronous. A corrupt or unreadable record is
/// treated as absent, never surfaced as an error.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    path: PathBuf,
    // Serializes load/save/clear so a teardown racing a save cannot
    // interleave halfway
    file_lock: Mutex<()>,
    changes: broadcast::Sender<()>,
}

impl SessionStore {
    /// Open a store at the given path. No I/O happens until the first
    /// operation; a missing file simply loads as an absent session.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(StoreInner {
                path: path.into(),
                file_lock: Mutex::new(()),
                changes,
            }),
        }
    }

    /// Path of the persisted record.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Subscribe to change notifications. Fires after every successful
    /// `save` or `clear`, from any clone of this store.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.inner.changes.subscribe()
    }

    /// Load the persisted session, if any.
    #[must_use]
    pub fn load(&self) -> Option<Session> {
        let _guard = self.lock();
        self.read_record()
            .map(|record| Session::new(record.token, record.user))
    }

    /// Persist the session and notify the other contexts.
    ///
    /// The record is written to a sibling temp file and renamed into place,
    /// so readers never observe a half-written record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be encoded or written.
    pub fn save(&self, session: &Session) -> Result<(), SessionStoreError> {
        let record = SessionRecord {
            token: session.credential().to_string(),
            user: session.identity().clone(),
        };
        let encoded = serde_json::to_vec_pretty(&record)?;

        {
            let _guard = self.lock();
            if let Some(parent) = self.inner.path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            let tmp = self.inner.path.with_extension("tmp");
            std::fs::write(&tmp, &encoded)?;
            std::fs::rename(&tmp, &self.inner.path)?;
        }

        self.notify();
        Ok(())
    }

    /// Remove the persisted session and notify the other contexts.
    pub fn clear(&self) {
        self.clear_if_present();
    }

    /// Remove the persisted session only if one is present. Returns whether
    /// anything was cleared, so concurrent forced teardowns resolve to
    /// exactly one winner.
    pub fn clear_if_present(&self) -> bool {
        let removed = {
            let _guard = self.lock();
            match std::fs::remove_file(&self.inner.path) {
                Ok(()) => true,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
                Err(e) => {
                    tracing::warn!(path = %self.inner.path.display(), error = %e,
                        "failed to remove session record");
                    false
                }
            }
        };
        if removed {
            self.notify();
        }
        removed
    }

    fn read_record(&self) -> Option<SessionRecord> {
        let bytes = match std::fs::read(&self.inner.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.inner.path.display(), error = %e,
                    "failed to read session record; treating as absent");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(path = %self.inner.path.display(), error = %e,
                    "corrupt session record; treating as absent");
                None
            }
        }
    }

    fn notify(&self) {
        // Send only fails when no context is subscribed, which is fine
        let _ = self.inner.changes.send(());
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.inner
            .file_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
