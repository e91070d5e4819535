use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{NewSession, Session, SessionKey, SessionStore, StoreError};
use crate::event::{now_seconds, Event};

/// In-process session store.
/// Sessions are bucketed per (app, user) and kept in creation order.
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<(String, String), Vec<Session>>>,
    max_sessions: Option<usize>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions: None,
        }
    }

    /// Cap the total number of sessions across all users (None = unlimited)
    pub fn with_max_sessions(mut self, max_sessions: Option<usize>) -> Self {
        self.max_sessions = max_sessions;
        self
    }

    /// Get the number of stored sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.values().map(Vec::len).sum()
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

fn bucket_key(key: &SessionKey) -> (String, String) {
    (key.app_name.clone(), key.user_id.clone())
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create_session(&self, request: NewSession) -> Result<Session, StoreError> {
        let mut sessions = self.sessions.write().await;

        if let Some(max) = self.max_sessions {
            let total: usize = sessions.values().map(Vec::len).sum();
            if total >= max {
                return Err(StoreError::Backend(format!(
                    "Maximum number of sessions reached: {}",
                    max
                )));
            }
        }

        let bucket = sessions.entry(bucket_key(&request.key)).or_default();
        if bucket.iter().any(|s| s.id == request.key.session_id) {
            return Err(StoreError::AlreadyExists(request.key.session_id));
        }

        let session = Session {
            id: request.key.session_id.clone(),
            app_name: request.key.app_name.clone(),
            user_id: request.key.user_id.clone(),
            state: request.state,
            events: Vec::new(),
            last_update_time: now_seconds(),
            description: request.description,
        };
        bucket.push(session.clone());

        info!("[{}] Session created", request.key);
        Ok(session)
    }

    async fn get_session(&self, key: &SessionKey) -> Result<Option<Session>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(&bucket_key(key))
            .and_then(|bucket| bucket.iter().find(|s| s.id == key.session_id))
            .cloned())
    }

    async fn list_sessions(&self, app_name: &str, user_id: &str) -> Result<Vec<Session>, StoreError> {
        let sessions = self.sessions.read().await;
        let listed = sessions
            .get(&(app_name.to_string(), user_id.to_string()))
            .map(|bucket| {
                bucket
                    .iter()
                    .map(|s| Session {
                        events: Vec::new(),
                        ..s.clone()
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(listed)
    }

    async fn append_events(&self, key: &SessionKey, events: Vec<Event>) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&bucket_key(key))
            .and_then(|bucket| bucket.iter_mut().find(|s| s.id == key.session_id))
            .ok_or_else(|| StoreError::NotFound(key.session_id.clone()))?;

        debug!("[{}] Appending {} events", key, events.len());
        session.last_update_time = events
            .last()
            .and_then(Event::timestamp)
            .unwrap_or_else(now_seconds);
        session.events.extend(events);
        Ok(())
    }
}
