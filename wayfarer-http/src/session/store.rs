use async_trait::async_trait;
use thiserror::Error;

use super::{NewSession, Session, SessionKey};
use crate::event::Event;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Session not found: {0}")]
    NotFound(String),
    #[error("Session already exists: {0}")]
    AlreadyExists(String),
    #[error("Session backend error: {0}")]
    Backend(String),
}

/// Where sessions live. The façade never owns session lifetime,
/// it only creates, reads and records turns through this seam.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a session; fails with `AlreadyExists` when the key is taken
    async fn create_session(&self, request: NewSession) -> Result<Session, StoreError>;

    /// Look a session up; `Ok(None)` when it does not exist
    async fn get_session(&self, key: &SessionKey) -> Result<Option<Session>, StoreError>;

    /// Sessions of one user of one app, in creation order
    async fn list_sessions(&self, app_name: &str, user_id: &str) -> Result<Vec<Session>, StoreError>;

    /// Record a finished turn in the session history
    async fn append_events(&self, key: &SessionKey, events: Vec<Event>) -> Result<(), StoreError>;
}
