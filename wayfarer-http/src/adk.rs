//! Client for an ADK-compatible agent server.
//!
//! When a backend URL is configured the façade keeps no sessions of its own: session
//! calls and turns are forwarded upstream, which also persists the conversation.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::agent::{AgentError, AgentRunner};
use crate::apis::adk::RunRequest;
use crate::event::{Content, Event};
use crate::session::{listing_entries, NewSession, Session, SessionKey, SessionStore, StoreError};

#[derive(Clone, Debug)]
pub struct AdkBackend {
    client: Client,
    base_url: String,
}

impl AdkBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn sessions_url(&self, app_name: &str, user_id: &str) -> String {
        format!("{}/apps/{}/users/{}/sessions", self.base_url, app_name, user_id)
    }

    fn session_url(&self, key: &SessionKey) -> String {
        format!(
            "{}/{}",
            self.sessions_url(&key.app_name, &key.user_id),
            key.session_id
        )
    }
}

fn backend_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(e.to_string())
}

async fn error_body(response: Response) -> (StatusCode, String) {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    (status, body)
}

#[async_trait]
impl SessionStore for AdkBackend {
    async fn create_session(&self, request: NewSession) -> Result<Session, StoreError> {
        let url = self.session_url(&request.key);
        debug!("Creating upstream session {}", url);

        let response = self
            .client
            .post(&url)
            .json(&json!({ "state": request.state }))
            .send()
            .await
            .map_err(backend_err)?;

        if !response.status().is_success() {
            let (status, body) = error_body(response).await;
            let duplicate = status == StatusCode::CONFLICT
                || (status == StatusCode::BAD_REQUEST && body.contains("already exists"));
            return Err(if duplicate {
                StoreError::AlreadyExists(request.key.session_id)
            } else {
                StoreError::Backend(format!("create session returned {}: {}", status, body))
            });
        }

        let mut session: Session = response.json().await.map_err(backend_err)?;
        // Descriptions are a façade-side notion; upstream does not echo them
        if session.description.is_none() {
            session.description = request.description;
        }
        Ok(session)
    }

    async fn get_session(&self, key: &SessionKey) -> Result<Option<Session>, StoreError> {
        let response = self
            .client
            .get(self.session_url(key))
            .send()
            .await
            .map_err(backend_err)?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                Ok(Some(response.json().await.map_err(backend_err)?))
            }
            _ => {
                let (status, body) = error_body(response).await;
                Err(StoreError::Backend(format!("get session returned {}: {}", status, body)))
            }
        }
    }

    async fn list_sessions(&self, app_name: &str, user_id: &str) -> Result<Vec<Session>, StoreError> {
        let response = self
            .client
            .get(self.sessions_url(app_name, user_id))
            .send()
            .await
            .map_err(backend_err)?;

        if !response.status().is_success() {
            let (status, body) = error_body(response).await;
            return Err(StoreError::Backend(format!("list sessions returned {}: {}", status, body)));
        }

        let body: Value = response.json().await.map_err(backend_err)?;
        let sessions = listing_entries(body)
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(Value::Object(entry)) {
                Ok(session) => Some(session),
                Err(e) => {
                    warn!("Skipping unreadable upstream session: {}", e);
                    None
                }
            })
            .collect();
        Ok(sessions)
    }

    async fn append_events(&self, _key: &SessionKey, _events: Vec<Event>) -> Result<(), StoreError> {
        // upstream records the turn while running it
        Ok(())
    }
}

#[async_trait]
impl AgentRunner for AdkBackend {
    async fn run(
        &self,
        session: &Session,
        message: &Content,
        invocation_id: &str,
    ) -> Result<Vec<Event>, AgentError> {
        let request = RunRequest::new(&session.app_name, &session.user_id, &session.id, message.clone());
        debug!("[{}] - [{}] Forwarding turn to {}/run", invocation_id, session.id, self.base_url);

        let response = self
            .client
            .post(format!("{}/run", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::ExecutionError(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(AgentError::SessionNotFound(session.id.clone())),
            status if status.is_success() => response
                .json()
                .await
                .map_err(|e| AgentError::ExecutionError(format!("unreadable run response: {}", e))),
            _ => {
                let (status, body) = error_body(response).await;
                Err(AgentError::Upstream {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}
