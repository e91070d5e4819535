use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};
use wayfarer_http::apis::adk::RunRequest;
use wayfarer_http::Event;

#[derive(Debug, Error)]
pub enum CallError {
    #[error("{status} returned by server")]
    Status { status: StatusCode, body: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unreadable response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl CallError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            CallError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Print what the server said, pretty when the body is JSON
    pub fn report(&self) {
        if let CallError::Status { status, body } = self {
            println!("Response status code: {}", status.as_u16());
            match serde_json::from_str::<Value>(body) {
                Ok(json) => println!("Response body: {}", pretty(&json)),
                Err(_) => println!("Response body: {}", body),
            }
        }
    }
}

pub fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Thin client over the façade's session and run endpoints
pub struct ProbeClient {
    client: Client,
    base_url: String,
    pub app: String,
    pub user: String,
}

impl ProbeClient {
    pub fn new(base_url: &str, app: &str, user: &str) -> Result<Self, CallError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            app: app.to_string(),
            user: user.to_string(),
        })
    }

    fn sessions_url(&self) -> String {
        format!("{}/apps/{}/users/{}/sessions", self.base_url, self.app, self.user)
    }

    pub fn run_url(&self, no_compress: bool) -> String {
        if no_compress {
            format!("{}/run?noCompress=true", self.base_url)
        } else {
            format!("{}/run", self.base_url)
        }
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Value, CallError> {
        let response = self
            .client
            .get(format!("{}/{}", self.sessions_url(), session_id))
            .send()
            .await
            .map_err(transport)?;
        json_body(checked(response).await?).await
    }

    pub async fn list_sessions(&self) -> Result<Value, CallError> {
        let response = self.client.get(self.sessions_url()).send().await.map_err(transport)?;
        json_body(checked(response).await?).await
    }

    pub async fn create_session(&self, session_id: &str, description: &str) -> Result<Value, CallError> {
        let payload = json!({
            "appName": self.app,
            "userId": self.user,
            "sessionId": session_id,
            "description": description,
        });
        let response = self
            .client
            .post(self.sessions_url())
            .json(&payload)
            .send()
            .await
            .map_err(transport)?;
        json_body(checked(response).await?).await
    }

    pub async fn run(&self, request: &RunRequest, no_compress: bool) -> Result<(StatusCode, Vec<Event>), CallError> {
        let response = self
            .client
            .post(self.run_url(no_compress))
            .json(request)
            .send()
            .await
            .map_err(transport)?;
        let response = checked(response).await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let items: Vec<Value> = serde_json::from_slice(&bytes)?;
        Ok((status, events_from(items)))
    }
}

fn transport(err: reqwest::Error) -> CallError {
    warn!("Request to {} failed: {}", err.url().map_or("<unknown>", |u| u.as_str()), err);
    CallError::Transport(err)
}

async fn checked(response: Response) -> Result<Response, CallError> {
    let status = response.status();
    debug!("{} -> {}", response.url(), status);
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(CallError::Status { status, body })
}

async fn json_body(response: Response) -> Result<Value, CallError> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Keep every object in a `/run` answer as an event, whatever fields it carries
pub fn events_from(items: Vec<Value>) -> Vec<Event> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(Event::from(map)),
            other => {
                warn!("Skipping non-object event: {}", other);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfarer_http::Content;

    #[test]
    fn non_object_items_are_dropped_and_objects_kept_whole() {
        let events = events_from(vec![
            json!({"author": "trip_planner", "content": {"role": null, "parts": null}}),
            json!("keepalive"),
            Value::Null,
            json!({"author": "trip_planner", "custom": [1, 2]}),
        ]);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].role(), None);
        assert!(events[0].content().unwrap().parts.is_empty());
        assert_eq!(events[1].as_map()["custom"], json!([1, 2]));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ProbeClient::new(&format!("http://{addr}"), "agents", "test-user").unwrap();
        let err = client.list_sessions().await.unwrap_err();
        assert!(matches!(err, CallError::Transport(_)));
        assert_eq!(err.status(), None);

        let request = RunRequest::new("agents", "test-user", "s-1", Content::user_text("hi"));
        let err = client.run(&request, false).await.unwrap_err();
        assert!(matches!(err, CallError::Transport(_)));
    }
}
