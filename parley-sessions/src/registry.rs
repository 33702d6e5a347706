//! Session registry

use chrono::Utc;
use parking_lot::RwLock;
use parley_core::config::SessionsConfig;
use parley_providers::ProviderClient;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::conversation::{ConversationSession, TurnOutcome};
use crate::error::{Result, SessionError};

/// Shared handle to a registered session.
///
/// Lock it for the duration of one operation. Holding it does not keep the
/// session registered: after [`SessionRegistry::delete`] the handle still
/// works but the session can no longer be looked up.
pub type SessionHandle = Arc<Mutex<ConversationSession>>;

/// Owns every live conversation, keyed by session id.
///
/// The map lock is only held for lookups and inserts, never across a
/// provider call. Turns on the same session are serialized by the
/// session's own async lock.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionHandle>>,
    capacity: Option<usize>,
}

impl SessionRegistry {
    /// Create an unbounded registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding at most `capacity` sessions
    pub fn with_capacity_limit(capacity: Option<usize>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    pub fn from_config(config: &SessionsConfig) -> Self {
        Self::with_capacity_limit(config.capacity())
    }

    /// Create and register a new session under a fresh id
    pub fn create(&self, client: &ProviderClient) -> Result<(String, SessionHandle)> {
        let id = Uuid::new_v4().to_string();
        let session = ConversationSession::from_client(client, id.clone());
        let model = session.provider().model().to_string();
        let handle = Arc::new(Mutex::new(session));

        {
            let mut sessions = self.sessions.write();
            if let Some(limit) = self.capacity {
                if sessions.len() >= limit {
                    return Err(SessionError::CapacityExceeded(limit));
                }
            }
            sessions.insert(id.clone(), handle.clone());
        }

        info!(session_id = %id, model = %model, "Session created");
        Ok((id, handle))
    }

    /// Look up a session
    pub fn get(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.read().get(id).cloned()
    }

    /// Remove a session; returns whether it was present
    pub fn delete(&self, id: &str) -> bool {
        let removed = self.sessions.write().remove(id).is_some();
        if removed {
            info!(session_id = %id, "Session deleted");
        } else {
            debug!(session_id = %id, "Delete of unknown session ignored");
        }
        removed
    }

    /// Run one turn on the session registered under `id`.
    ///
    /// Concurrent calls for the same id run one after another.
    pub async fn run_turn(&self, id: &str, content: impl Into<String>) -> Result<TurnOutcome> {
        let handle = self
            .get(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        let mut session = handle.lock().await;
        session.run_turn(content).await
    }

    /// Ids of all registered sessions
    pub fn ids(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Remove sessions idle for longer than `ttl`.
    ///
    /// Sessions in the middle of a turn are skipped. Returns how many were
    /// removed.
    pub fn purge_idle(&self, ttl: Duration) -> usize {
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return 0;
        };
        let Some(cutoff) = Utc::now().checked_sub_signed(ttl) else {
            return 0;
        };

        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|id, handle| match handle.try_lock() {
            Ok(session) => {
                let keep = session.last_active() >= cutoff;
                if !keep {
                    debug!(session_id = %id, "Evicting idle session");
                }
                keep
            }
            Err(_) => true,
        });
        let removed = before - sessions.len();
        if removed > 0 {
            info!(removed, remaining = sessions.len(), "Purged idle sessions");
        }
        removed
    }
}
