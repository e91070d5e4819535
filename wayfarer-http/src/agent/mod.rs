mod echo;

pub use echo::EchoAgent;

use async_trait::async_trait;
use thiserror::Error;

use crate::event::{Content, Event};
use crate::session::Session;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),
    #[error("Agent backend returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("Agent execution error: {0}")]
    ExecutionError(String),
}

/// Executes one conversational turn.
///
/// The agent's reasoning is opaque to the façade: it hands over the session and the
/// new user message and gets back the events the agent produced, in order.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run(
        &self,
        session: &Session,
        message: &Content,
        invocation_id: &str,
    ) -> Result<Vec<Event>, AgentError>;
}
