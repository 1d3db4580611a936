//! Registry Implementation

use crate::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

/// Unique id of one client connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Registry of per-connection session state.
///
/// Each entry must only be mutated on behalf of its own connection; the lock
/// is held just for the duration of one `update` closure.
pub struct SessionRegistry<S> {
    sessions: Mutex<HashMap<ConnectionId, S>>,
}

impl<S: Default> Default for SessionRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Default> SessionRegistry<S> {
    /// Create an empty registry
    pub fn new() -> Self {
        info!("Creating in-memory session registry");
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<ConnectionId, S>>, StoreError> {
        self.sessions
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    /// Register a connection. Keeps existing state if already present.
    pub fn open(&self, id: ConnectionId) -> Result<(), StoreError> {
        let mut sessions = self.lock()?;
        sessions.entry(id).or_default();
        debug!("Session {} opened ({} active)", id, sessions.len());
        Ok(())
    }

    /// Run `f` on the connection's state, creating it lazily
    pub fn update<R>(
        &self,
        id: ConnectionId,
        f: impl FnOnce(&mut S) -> R,
    ) -> Result<R, StoreError> {
        let mut sessions = self.lock()?;
        Ok(f(sessions.entry(id).or_default()))
    }

    /// Remove the connection's state. Returns it if there was any; calling
    /// this for an unknown or already closed id is a no-op.
    pub fn close(&self, id: ConnectionId) -> Result<Option<S>, StoreError> {
        let mut sessions = self.lock()?;
        let removed = sessions.remove(&id);
        debug!("Session {} closed ({} active)", id, sessions.len());
        Ok(removed)
    }

    pub fn contains(&self, id: ConnectionId) -> Result<bool, StoreError> {
        Ok(self.lock()?.contains_key(&id))
    }

    /// Number of live sessions
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.lock()?.is_empty())
    }
}

impl<S: Clone + Default> SessionRegistry<S> {
    /// Copy of the connection's state, if present
    pub fn snapshot(&self, id: ConnectionId) -> Result<Option<S>, StoreError> {
        Ok(self.lock()?.get(&id).cloned())
    }
}
