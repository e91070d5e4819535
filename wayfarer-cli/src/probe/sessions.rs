//! Session discovery and creation against a running façade.
//!
//! Listings from different servers disagree on field names, so ids and creation times
//! are looked up through ordered candidate lists; the first field present decides.

use reqwest::StatusCode;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;
use wayfarer_http::session::listing_entries;

use super::client::{pretty, CallError, ProbeClient};

pub const SESSION_ID_FIELDS: [&str; 4] = ["sessionId", "id", "session_id", "session"];
pub const CREATED_AT_FIELDS: [&str; 5] = [
    "createdAt",
    "created_at",
    "timestamp",
    "creationTime",
    "lastUpdateTime",
];

const REUSE_DESCRIPTION: &str = "Test session created by wayfarer probe";
const FRESH_DESCRIPTION: &str = "Fresh test session created by wayfarer probe";

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to create session: {0}")]
    Create(#[from] CallError),
    #[error("session {0} was created but verification failed")]
    Unverified(String),
}

fn first_present<'a>(entry: &'a Map<String, Value>, fields: &[&str]) -> Option<&'a Value> {
    fields.iter().find_map(|field| entry.get(*field))
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The session id of a listing entry. A present but empty or null field yields None.
pub fn session_id(entry: &Map<String, Value>) -> Option<String> {
    first_present(entry, &SESSION_ID_FIELDS).and_then(scalar)
}

pub fn created_at(entry: &Map<String, Value>) -> Option<String> {
    first_present(entry, &CREATED_AT_FIELDS).and_then(scalar)
}

pub async fn check_session_exists(client: &ProbeClient, session_id: &str) -> bool {
    println!("Checking if session {} exists...", session_id);
    match client.get_session(session_id).await {
        Ok(_) => {
            println!("Session {} exists and is valid.", session_id);
            true
        }
        Err(CallError::Status { status, .. }) => {
            println!(
                "Session {} does not exist or is not valid. Status code: {}",
                session_id,
                status.as_u16()
            );
            false
        }
        Err(e) => {
            println!("Error checking session: {}", e);
            false
        }
    }
}

pub async fn active_sessions(client: &ProbeClient) -> Vec<Map<String, Value>> {
    println!("Getting active sessions for user {}...", client.user);
    let body = match client.list_sessions().await {
        Ok(body) => body,
        Err(e) => {
            println!("Failed to get active sessions: {}", e);
            e.report();
            return Vec::new();
        }
    };
    println!("Response content: {}", pretty(&body));

    if !(body.is_array() || body.is_object()) {
        println!("Unexpected response format: {}", body);
        return Vec::new();
    }

    let sessions = listing_entries(body);
    if sessions.is_empty() {
        println!("No active sessions found");
        return sessions;
    }
    println!("Found {} active sessions", sessions.len());
    for (i, session) in sessions.iter().enumerate() {
        println!(
            "Session {} ID: {}",
            i + 1,
            session_id(session).as_deref().unwrap_or("None")
        );
    }
    sessions
}

/// Reuse the first listed session, or create one under a new UUID
pub async fn create_session(client: &ProbeClient) -> Result<String, ProbeError> {
    let sessions = active_sessions(client).await;
    if let Some(first) = sessions.first() {
        println!("First session object: {}", pretty(&Value::Object(first.clone())));
        match session_id(first) {
            Some(id) => {
                println!("Using existing session: {}", id);
                return Ok(id);
            }
            None => println!("WARNING: Couldn't extract session ID from existing session. Creating new one."),
        }
    }

    let session_id = Uuid::new_v4().to_string();
    println!("Creating new session with ID: {}", session_id);

    match client.create_session(&session_id, REUSE_DESCRIPTION).await {
        Ok(_) => println!("Session created successfully: {}", session_id),
        Err(e) => {
            println!("HTTP Error when creating session: {}", e);
            e.report();
            if e.status() != Some(StatusCode::CONFLICT) {
                return Err(e.into());
            }
            println!("Session appears to already exist, verifying: {}", session_id);
        }
    }

    if check_session_exists(client, &session_id).await {
        Ok(session_id)
    } else {
        Err(ProbeError::Unverified(session_id))
    }
}

/// Always create a new session, skipping discovery
pub async fn create_fresh_session(client: &ProbeClient) -> Result<String, ProbeError> {
    let session_id = Uuid::new_v4().to_string();
    println!("Creating fresh session with ID: {}", session_id);

    client.create_session(&session_id, FRESH_DESCRIPTION).await?;
    println!("Fresh session created successfully: {}", session_id);

    if check_session_exists(client, &session_id).await {
        println!("Session {} verified.", session_id);
        Ok(session_id)
    } else {
        Err(ProbeError::Unverified(session_id))
    }
}

/// Print every session of the probe user. Returns false when there are none.
pub async fn list_sessions(client: &ProbeClient) -> bool {
    let sessions = active_sessions(client).await;
    if sessions.is_empty() {
        println!("\nNo active sessions found.");
        return false;
    }

    println!("\nFound {} active sessions:", sessions.len());
    for (i, session) in sessions.iter().enumerate() {
        println!(
            "{}. Session ID: {}",
            i + 1,
            session_id(session).as_deref().unwrap_or("Unknown")
        );
        println!("   Created: {}", created_at(session).as_deref().unwrap_or("Unknown"));
        println!("   Full session data: {}", pretty(&Value::Object(session.clone())));
        println!();
    }
    true
}

/// An explicitly chosen session is used even if the check fails; the run call reports it
pub async fn use_manual_session(client: &ProbeClient, session_id: &str) -> String {
    println!("Using manually specified session ID: {}", session_id);
    if !check_session_exists(client, session_id).await {
        println!("WARNING: Manually specified session {} could not be verified.", session_id);
    }
    session_id.to_string()
}
