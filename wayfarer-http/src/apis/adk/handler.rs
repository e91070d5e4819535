use axum::{
    body::Bytes,
    extract::State,
    Json,
};
use tracing::{debug, info};
use uuid::Uuid;

use super::types::{CreateSessionRequest, RunRequest, ServiceInfo};
use crate::event::{Event, ROLE_USER, USER_AUTHOR};
use crate::session::{NewSession, Session, SessionKey};
use crate::{ApiError, ApiJson, ApiPath, AppContext};

/// GET / - service title and description
pub async fn handle_info(State(ctx): State<AppContext>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        title: ctx.config.title.clone(),
        description: ctx.config.description.clone(),
        project: ctx.config.project_id.clone(),
    })
}

/// GET /apps/{app}/users/{user}/sessions
pub async fn handle_list_sessions(
    State(ctx): State<AppContext>,
    ApiPath((app_name, user_id)): ApiPath<(String, String)>,
) -> Result<Json<Vec<Session>>, ApiError> {
    let sessions = ctx.sessions.list_sessions(&app_name, &user_id).await?;
    debug!("{}/{} has {} sessions", app_name, user_id, sessions.len());
    Ok(Json(sessions))
}

/// GET /apps/{app}/users/{user}/sessions/{session_id} - 404 when the session is unknown
pub async fn handle_get_session(
    State(ctx): State<AppContext>,
    ApiPath((app_name, user_id, session_id)): ApiPath<(String, String, String)>,
) -> Result<Json<Session>, ApiError> {
    let key = SessionKey::new(app_name, user_id, session_id);
    let session = ctx
        .sessions
        .get_session(&key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Session not found: {}", key.session_id)))?;
    Ok(Json(session))
}

/// POST /apps/{app}/users/{user}/sessions - id from the body, generated when absent
pub async fn handle_create_session(
    State(ctx): State<AppContext>,
    ApiPath((app_name, user_id)): ApiPath<(String, String)>,
    body: Bytes,
) -> Result<Json<Session>, ApiError> {
    let request = parse_create_body(&body)?;
    let session_id = request
        .session_id
        .clone()
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    create_session(ctx, SessionKey::new(app_name, user_id, session_id), request).await
}

/// POST /apps/{app}/users/{user}/sessions/{session_id} - id from the path
pub async fn handle_create_session_with_id(
    State(ctx): State<AppContext>,
    ApiPath((app_name, user_id, session_id)): ApiPath<(String, String, String)>,
    body: Bytes,
) -> Result<Json<Session>, ApiError> {
    let request = parse_create_body(&body)?;
    create_session(ctx, SessionKey::new(app_name, user_id, session_id), request).await
}

async fn create_session(
    ctx: AppContext,
    key: SessionKey,
    request: CreateSessionRequest,
) -> Result<Json<Session>, ApiError> {
    info!("POST /apps/{}/users/{}/sessions id={}", key.app_name, key.user_id, key.session_id);

    let new_session = NewSession::new(key)
        .with_description(request.description)
        .with_state(request.state.unwrap_or_default());
    let session = ctx.sessions.create_session(new_session).await?;
    Ok(Json(session))
}

/// An empty body is the same as `{}`
fn parse_create_body(body: &Bytes) -> Result<CreateSessionRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CreateSessionRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::InvalidRequest(e.to_string()))
}

/// POST /run - execute one turn against an existing session
pub async fn handle_run(
    State(ctx): State<AppContext>,
    ApiJson(payload): ApiJson<RunRequest>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let invocation_id = format!("e-{}", Uuid::new_v4());
    let key = SessionKey::new(&payload.app_name, &payload.user_id, &payload.session_id);

    info!(
        "[{}] POST /run session={} streaming={}",
        invocation_id, key, payload.streaming
    );
    if payload.new_message.role != ROLE_USER {
        debug!(
            "[{}] new message has role {:?}, expected {:?}",
            invocation_id, payload.new_message.role, ROLE_USER
        );
    }

    // Sessions are never created implicitly here
    let session = ctx
        .sessions
        .get_session(&key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Session not found: {}", key.session_id)))?;

    let user_event = Event::new(USER_AUTHOR, &invocation_id, payload.new_message.clone());
    let events = ctx
        .agent
        .run(&session, &payload.new_message, &invocation_id)
        .await?;

    let mut turn = Vec::with_capacity(events.len() + 1);
    turn.push(user_event);
    turn.extend(events.iter().cloned());
    ctx.sessions.append_events(&key, turn).await?;

    info!("[{}] Agent produced {} events", invocation_id, events.len());
    Ok(Json(events))
}
