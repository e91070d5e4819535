//! `AdkBackend` against a mock ADK server, directly and behind the façade.

mod common;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use wayfarer_http::agent::{AgentError, AgentRunner};
use wayfarer_http::session::{NewSession, SessionStore, StoreError};
use wayfarer_http::{AdkBackend, AppContext, Content, ServerConfig, SessionKey};

use common::*;

fn session_json(app: &str, user: &str, id: &str) -> Value {
    json!({
        "id": id,
        "appName": app,
        "userId": user,
        "state": {},
        "events": [],
        "lastUpdateTime": 1730000000.5
    })
}

async fn upstream_create(Path((app, user, id)): Path<(String, String, String)>) -> Response {
    if id == "taken" {
        return (StatusCode::CONFLICT, Json(json!({"detail": "Session already exists"}))).into_response();
    }
    Json(session_json(&app, &user, &id)).into_response()
}

async fn upstream_get(Path((app, user, id)): Path<(String, String, String)>) -> Response {
    if id == "known" {
        Json(session_json(&app, &user, &id)).into_response()
    } else {
        (StatusCode::NOT_FOUND, Json(json!({"detail": "Session not found"}))).into_response()
    }
}

async fn upstream_list(Path((app, user)): Path<(String, String)>) -> Json<Value> {
    // wrapped shape on purpose
    Json(json!({"sessions": [session_json(&app, &user, "known"), session_json(&app, &user, "other")]}))
}

async fn upstream_run(Json(body): Json<Value>) -> Response {
    match body["sessionId"].as_str() {
        Some("known") => Json(json!([
            {
                "id": "ev-1",
                "invocationId": "e-up",
                "author": "trip_planner",
                "timestamp": 1730000001.0,
                "content": {"role": "model", "extraContentKey": 1, "parts": [
                    {"functionCall": {"name": "search_hotels", "args": {"city": "Paris"}, "willContinue": true}}
                ]},
                "actions": {"stateDelta": {}}
            },
            {
                "id": "ev-2",
                "invocationId": "e-up",
                "author": "trip_planner",
                "timestamp": 1730000002.0,
                "content": {"role": "model", "parts": [{"text": "Here is your Paris plan."}]}
            }
        ]))
        .into_response(),
        Some("broken") => (StatusCode::INTERNAL_SERVER_ERROR, "kaput").into_response(),
        _ => (StatusCode::NOT_FOUND, Json(json!({"detail": "Session not found"}))).into_response(),
    }
}

async fn spawn_upstream() -> String {
    let app = Router::new()
        .route("/apps/{app}/users/{user}/sessions", get(upstream_list))
        .route(
            "/apps/{app}/users/{user}/sessions/{id}",
            get(upstream_get).post(upstream_create),
        )
        .route("/run", post(upstream_run));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/")
}

fn key(id: &str) -> SessionKey {
    SessionKey::new(APP, USER, id)
}

#[tokio::test]
async fn session_calls_map_upstream_statuses() {
    let backend = AdkBackend::new(spawn_upstream().await);

    let created = backend
        .create_session(NewSession::new(key("fresh")).with_description(Some("weekend in Paris".to_string())))
        .await
        .unwrap();
    assert_eq!(created.id, "fresh");
    assert_eq!(created.description.as_deref(), Some("weekend in Paris"));

    let err = backend.create_session(NewSession::new(key("taken"))).await.unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists(_)));

    assert!(backend.get_session(&key("known")).await.unwrap().is_some());
    assert!(backend.get_session(&key("ghost")).await.unwrap().is_none());

    let listed = backend.list_sessions(APP, USER).await.unwrap();
    let ids: Vec<_> = listed.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, ["known", "other"]);
}

#[tokio::test]
async fn run_forwards_and_keeps_event_order() {
    let backend = AdkBackend::new(spawn_upstream().await);
    let session = backend.get_session(&key("known")).await.unwrap().unwrap();

    let events = backend
        .run(&session, &Content::user_text(PARIS), "e-local")
        .await
        .unwrap();

    assert_eq!(events.len(), 2);
    let content = events[0].content().unwrap();
    let call = content.parts[0].function_call.as_ref().unwrap();
    assert_eq!(call.name, "search_hotels");
    assert_eq!(call.extra["willContinue"], true);
    assert!(events[0].as_map().contains_key("actions"));
    assert_eq!(events[1].content().unwrap().text(), "Here is your Paris plan.");
}

#[tokio::test]
async fn run_errors_are_classified() {
    let backend = AdkBackend::new(spawn_upstream().await);
    let mut session = backend.get_session(&key("known")).await.unwrap().unwrap();

    session.id = "broken".to_string();
    let err = backend.run(&session, &Content::user_text("hi"), "e-1").await.unwrap_err();
    assert!(matches!(err, AgentError::Upstream { status: 500, ref body } if body == "kaput"));

    session.id = "vanished".to_string();
    let err = backend.run(&session, &Content::user_text("hi"), "e-1").await.unwrap_err();
    assert!(matches!(err, AgentError::SessionNotFound(_)));
}

#[tokio::test]
async fn facade_proxies_run_to_configured_backend() {
    let upstream = spawn_upstream().await;
    let config = ServerConfig::default().with_backend_url(Some(upstream));
    let app = wayfarer_http::router(AppContext::from_config(config));

    let response = send(&app, run_request("/run", "known", PARIS, false)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = body_bytes(response).await;
    let body = std::str::from_utf8(&bytes).unwrap();
    assert!(body.contains(
        r#"{"functionCall":{"name":"search_hotels","args":{"city":"Paris"},"willContinue":true}}"#
    ));
    assert!(!body.contains("function_call"));

    let events: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(events[0]["content"]["extraContentKey"], 1);
    assert_eq!(events[0]["actions"], json!({"stateDelta": {}}));
    assert_eq!(events[1]["content"]["parts"][0]["text"], "Here is your Paris plan.");

    let missing = send(&app, run_request("/run", "ghost", PARIS, false)).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}
