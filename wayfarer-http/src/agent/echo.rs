use async_trait::async_trait;
use tracing::debug;

use super::{AgentError, AgentRunner};
use crate::event::{Content, Event, ROLE_USER};
use crate::session::Session;

/// Deterministic stand-in agent for running the façade without a backend.
/// Answers every turn with one model event quoting the user's text.
#[derive(Clone, Debug)]
pub struct EchoAgent {
    name: String,
}

impl EchoAgent {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl AgentRunner for EchoAgent {
    async fn run(
        &self,
        session: &Session,
        message: &Content,
        invocation_id: &str,
    ) -> Result<Vec<Event>, AgentError> {
        let text = message.text();
        if text.is_empty() {
            return Err(AgentError::ExecutionError(
                "message has no text parts".to_string(),
            ));
        }

        let turn = session
            .events
            .iter()
            .filter(|e| e.role() == Some(ROLE_USER))
            .count()
            + 1;
        debug!("[{}] - [{}] Echo turn {}", invocation_id, session.id, turn);

        let reply = format!("[{} · turn {}] You said: {}", self.name, turn, text);
        Ok(vec![Event::new(
            self.name.clone(),
            invocation_id,
            Content::model_text(reply),
        )])
    }
}
