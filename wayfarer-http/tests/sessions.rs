//! Session lifecycle: create, read back, list, duplicates.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::Value;
use wayfarer_http::session::listing_entries;

use common::*;

#[tokio::test]
async fn created_session_is_found_and_listed() {
    let app = app();
    let session_id = uuid::Uuid::new_v4().to_string();

    let created = body_json(create_session(&app, &session_id).await).await;
    assert_eq!(created["id"], session_id.as_str());
    assert_eq!(created["appName"], APP);
    assert_eq!(created["userId"], USER);
    assert_eq!(created["description"], "integration test session");

    let response = get(&app, &session_uri(&session_id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["id"], session_id.as_str());

    let listing = body_json(get(&app, &sessions_uri()).await).await;
    let ids: Vec<Value> = listing_entries(listing)
        .into_iter()
        .filter_map(|entry| entry.get("id").cloned())
        .collect();
    assert!(ids.contains(&Value::String(session_id)));
}

#[tokio::test]
async fn existence_check_is_idempotent() {
    let app = app();
    create_session(&app, "s1").await;

    for _ in 0..2 {
        assert_eq!(get(&app, &session_uri("s1")).await.status(), StatusCode::OK);
        assert_eq!(get(&app, &session_uri("ghost")).await.status(), StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn missing_session_read_is_structured() {
    let app = app();
    let response = get(&app, &session_uri("ghost")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["detail"], "Session not found");
    assert_eq!(body["message"], "Session not found: ghost");
}

#[tokio::test]
async fn duplicate_create_is_409() {
    let app = app();
    assert_eq!(create_session(&app, "dup").await.status(), StatusCode::OK);

    let response = create_session(&app, "dup").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["detail"], "Session already exists");
}

#[tokio::test]
async fn create_without_body_generates_an_id() {
    let app = app();
    let response = send(
        &app,
        Request::post(sessions_uri()).body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let session_id = body_json(response).await["id"].as_str().unwrap().to_string();
    assert!(uuid::Uuid::parse_str(&session_id).is_ok());
    assert_eq!(get(&app, &session_uri(&session_id)).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_with_id_in_path_uses_that_id_and_state() {
    let app = app();
    let response = send(
        &app,
        Request::post(session_uri("from-path"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"state": {"budget": "medium"}}"#))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let session = body_json(get(&app, &session_uri("from-path")).await).await;
    assert_eq!(session["state"]["budget"], "medium");
}

#[tokio::test]
async fn garbage_create_body_is_rejected() {
    let app = app();
    let response = send(
        &app,
        Request::post(sessions_uri())
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn listing_is_per_user_and_in_creation_order() {
    let app = app();
    for id in ["first", "second", "third"] {
        create_session(&app, id).await;
    }
    send(
        &app,
        Request::post("/apps/agents/users/someone-else/sessions")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    let listing = body_json(get(&app, &sessions_uri()).await).await;
    let ids: Vec<&str> = listing
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["first", "second", "third"]);
}

#[tokio::test]
async fn large_listing_is_compressed_when_accepted() {
    let app = app();
    for i in 0..20 {
        create_session(&app, &format!("session-{i:02}")).await;
    }

    let response = send(
        &app,
        Request::get(sessions_uri())
            .header(header::ACCEPT_ENCODING, "gzip")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(content_encoding(&response).as_deref(), Some("gzip"));

    let listing: Value = serde_json::from_slice(&gunzip(&body_bytes(response).await)).unwrap();
    assert_eq!(listing.as_array().unwrap().len(), 20);
}

#[tokio::test]
async fn undecodable_path_segment_is_a_structured_400() {
    let app = app();

    let response = get(&app, &session_uri("%FF")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["detail"], "Invalid request path");
    assert!(body["message"].as_str().unwrap().contains("session_id"));

    let response = send(
        &app,
        Request::post("/apps/%FF/users/test-user/sessions")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["detail"], "Invalid request path");
}
