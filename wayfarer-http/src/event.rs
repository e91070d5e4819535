use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub const ROLE_USER: &str = "user";
pub const ROLE_MODEL: &str = "model";

/// Author recorded on events that carry the user's own message
pub const USER_AUTHOR: &str = "user";

/// Servers in the wild send `null` for empty lists and strings
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A tool invocation requested by the agent.
/// `args` is usually a JSON-encoded string but some agents send a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub args: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One payload inside a message.
///
/// Parts are open objects: `text` and `function_call` are understood,
/// every other key is carried through untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(
        default,
        alias = "functionCall",
        skip_serializing_if = "Option::is_none"
    )]
    pub function_call: Option<FunctionCall>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn function_call(name: impl Into<String>, args: Value) -> Self {
        Self {
            function_call: Some(FunctionCall {
                name: name.into(),
                args,
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

/// A message: a role and its ordered parts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub parts: Vec<Part>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Content {
    pub fn new(role: impl Into<String>, parts: Vec<Part>) -> Self {
        Self {
            role: role.into(),
            parts,
            extra: Map::new(),
        }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self::new(ROLE_USER, vec![Part::text(text)])
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self::new(ROLE_MODEL, vec![Part::text(text)])
    }

    /// Text parts joined with newlines; other parts are skipped
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One unit of agent output in a `/run` response.
///
/// Held as the JSON object the agent produced, so events from a remote agent go back
/// to the client exactly as they came in. The accessors read the few fields the façade
/// itself looks at.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event(Map<String, Value>);

impl Event {
    pub fn new(author: impl Into<String>, invocation_id: impl Into<String>, content: Content) -> Self {
        let mut map = Map::new();
        map.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        map.insert("invocationId".to_string(), Value::String(invocation_id.into()));
        map.insert("author".to_string(), Value::String(author.into()));
        map.insert("timestamp".to_string(), Value::from(now_seconds()));
        map.insert(
            "content".to_string(),
            serde_json::to_value(content).unwrap_or(Value::Null),
        );
        Self(map)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn id(&self) -> Option<&str> {
        self.str_field("id")
    }

    pub fn invocation_id(&self) -> Option<&str> {
        self.str_field("invocationId")
    }

    pub fn author(&self) -> Option<&str> {
        self.str_field("author")
    }

    pub fn timestamp(&self) -> Option<f64> {
        self.0.get("timestamp").and_then(Value::as_f64)
    }

    /// Typed view of `content`; None when absent, null or not a message
    pub fn content(&self) -> Option<Content> {
        self.0
            .get("content")
            .filter(|c| !c.is_null())
            .and_then(|c| Content::deserialize(c).ok())
    }

    pub fn role(&self) -> Option<&str> {
        self.0.get("content")?.get("role")?.as_str()
    }
}

impl From<Map<String, Value>> for Event {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Unix time in fractional seconds, the unit sessions and events are stamped with
pub fn now_seconds() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
