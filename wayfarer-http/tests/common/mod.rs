#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body, Bytes};
use axum::http::{header, Request};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use wayfarer_http::{router, AgentRunner, AppContext, EchoAgent, MemorySessionStore, ServerConfig};

pub const APP: &str = "agents";
pub const USER: &str = "test-user";
pub const PARIS: &str = "I want to plan a trip to Paris for 5 days in December.";

pub fn app() -> Router {
    app_with_agent(Arc::new(EchoAgent::new("trip_planner")))
}

pub fn app_with_agent(agent: Arc<dyn AgentRunner>) -> Router {
    let ctx = AppContext::new(
        ServerConfig::default(),
        Arc::new(MemorySessionStore::new()),
        agent,
    );
    router(ctx)
}

pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

pub fn sessions_uri() -> String {
    format!("/apps/{APP}/users/{USER}/sessions")
}

pub fn session_uri(session_id: &str) -> String {
    format!("/apps/{APP}/users/{USER}/sessions/{session_id}")
}

pub async fn create_session(app: &Router, session_id: &str) -> Response {
    let body = json!({
        "appName": APP,
        "userId": USER,
        "sessionId": session_id,
        "description": "integration test session"
    });
    send(
        app,
        Request::post(sessions_uri())
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

pub async fn get(app: &Router, uri: &str) -> Response {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub fn run_request(uri: &str, session_id: &str, text: &str, accept_gzip: bool) -> Request<Body> {
    let body = json!({
        "appName": APP,
        "userId": USER,
        "sessionId": session_id,
        "newMessage": {"role": "user", "parts": [{"text": text}]},
        "streaming": false
    });
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
    if accept_gzip {
        builder = builder.header(header::ACCEPT_ENCODING, "gzip");
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_bytes(response: Response) -> Bytes {
    to_bytes(response.into_body(), usize::MAX).await.unwrap()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("json body")
}

pub fn content_encoding(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::CONTENT_ENCODING)
        .map(|v| v.to_str().unwrap().to_string())
}

pub fn gunzip(bytes: &[u8]) -> Vec<u8> {
    use std::io::Read;
    let mut out = Vec::new();
    flate2::read::GzDecoder::new(bytes)
        .read_to_end(&mut out)
        .expect("gzip body");
    out
}
