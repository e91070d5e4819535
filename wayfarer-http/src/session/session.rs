use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::event::Event;

/// The triple a session is addressed by
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
}

impl SessionKey {
    pub fn new(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.app_name, self.user_id, self.session_id)
    }
}

/// Parameters for creating a session
#[derive(Clone, Debug)]
pub struct NewSession {
    pub key: SessionKey,
    pub state: Map<String, Value>,
    pub description: Option<String>,
}

impl NewSession {
    pub fn new(key: SessionKey) -> Self {
        Self {
            key,
            state: Map::new(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_state(mut self, state: Map<String, Value>) -> Self {
        self.state = state;
        self
    }
}

/// A conversation session as exposed on the wire.
/// `events` holds the conversation history, oldest first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub app_name: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub state: Map<String, Value>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub last_update_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
