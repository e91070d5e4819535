use anyhow::Context;
use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::adk::AdkBackend;
use crate::agent::{AgentRunner, EchoAgent};
use crate::apis;
use crate::error::panic_response;
use crate::middleware::{
    compression_layer, cors_layer, intercept_run_response, log_request, log_response, RUN_PATH,
};
use crate::session::{MemorySessionStore, SessionStore};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_PROJECT_ID: &str = "kisan-project-gcp";
pub const DEFAULT_TITLE: &str = "trip-planner-agent";
pub const DEFAULT_DESCRIPTION: &str =
    "API for interacting with the Trip Planner Agent that helps users plan and manage their travel";
pub const DEFAULT_CORS_ORIGINS: [&str; 5] = [
    "https://genai-exchange-ui.vercel.app/",
    "http://localhost:3000",
    "http://localhost:5173",
    "http://localhost:8083",
    "http://localhost:8080",
];
/// Name the local echo agent answers as
pub const LOCAL_AGENT_NAME: &str = "trip_planner";

/// Configuration for the HTTP server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0:8080")
    pub address: String,
    pub title: String,
    pub description: String,
    /// Cloud project the deployment belongs to
    pub project_id: String,
    /// Origins allowed to make credentialed cross-origin calls
    pub cors_origins: Vec<String>,
    /// ADK-compatible backend; None runs the in-memory store with the echo agent
    pub backend_url: Option<String>,
    /// Cap for the in-memory store (None = unlimited)
    pub max_sessions: Option<usize>,
}

impl ServerConfig {
    /// Create a new server config with the given address and default settings
    pub fn new(address: String) -> Self {
        Self {
            address,
            title: DEFAULT_TITLE.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            project_id: DEFAULT_PROJECT_ID.to_string(),
            cors_origins: normalize_origins(DEFAULT_CORS_ORIGINS),
            backend_url: None,
            max_sessions: None,
        }
    }

    /// Read `PORT`, `GOOGLE_CLOUD_PROJECT`, `WAYFARER_CORS_ORIGINS`,
    /// `WAYFARER_BACKEND_URL` and `WAYFARER_MAX_SESSIONS` from the environment
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("PORT must be a port number, got {:?}", raw))?,
            None => DEFAULT_PORT,
        };

        let mut config = Self::new(format!("0.0.0.0:{}", port));
        if let Some(project_id) = var("GOOGLE_CLOUD_PROJECT") {
            config.project_id = project_id;
        }
        if let Some(origins) = var("WAYFARER_CORS_ORIGINS") {
            config.cors_origins = normalize_origins(origins.split(','));
        }
        config.backend_url = var("WAYFARER_BACKEND_URL");
        if let Some(raw) = var("WAYFARER_MAX_SESSIONS") {
            let max = raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("WAYFARER_MAX_SESSIONS must be a number, got {:?}", raw))?;
            config.max_sessions = Some(max);
        }
        Ok(config)
    }

    /// Listen on all interfaces at the given port
    pub fn with_port(mut self, port: u16) -> Self {
        self.address = format!("0.0.0.0:{}", port);
        self
    }

    pub fn with_cors_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.cors_origins = normalize_origins(origins);
        self
    }

    pub fn with_backend_url(mut self, backend_url: Option<String>) -> Self {
        self.backend_url = backend_url;
        self
    }

    /// Set the maximum number of sessions kept in memory
    pub fn with_max_sessions(mut self, max_sessions: Option<usize>) -> Self {
        self.max_sessions = max_sessions;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(format!("0.0.0.0:{}", DEFAULT_PORT))
    }
}

/// Browsers send `Origin` without a trailing slash, so configured origins are trimmed
fn normalize_origins<I, S>(origins: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    origins
        .into_iter()
        .map(|o| o.as_ref().trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

/// Everything a request handler needs, built once at start-up
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub sessions: Arc<dyn SessionStore>,
    pub agent: Arc<dyn AgentRunner>,
}

impl AppContext {
    pub fn new(
        config: ServerConfig,
        sessions: Arc<dyn SessionStore>,
        agent: Arc<dyn AgentRunner>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            sessions,
            agent,
        }
    }

    /// Wire the collaborators the config asks for
    pub fn from_config(config: ServerConfig) -> Self {
        match config.backend_url.clone() {
            Some(url) => {
                let backend = Arc::new(AdkBackend::new(url));
                Self::new(config, backend.clone(), backend)
            }
            None => {
                let store = MemorySessionStore::new().with_max_sessions(config.max_sessions);
                Self::new(
                    config,
                    Arc::new(store),
                    Arc::new(EchoAgent::new(LOCAL_AGENT_NAME)),
                )
            }
        }
    }
}

/// Build the application router with the full middleware pipeline.
///
/// Layers added later wrap the earlier ones, so from the outside in a request passes:
/// CORS, the `/run` interceptor, request logging, compression, panic translation.
/// The interceptor sits outside compression so it sees the encoded body.
pub fn router(ctx: AppContext) -> Router {
    let cors = cors_layer(&ctx.config.cors_origins);

    Router::new()
        .route("/", get(apis::adk::handle_info))
        .route(
            "/apps/{app_name}/users/{user_id}/sessions",
            get(apis::adk::handle_list_sessions).post(apis::adk::handle_create_session),
        )
        .route(
            "/apps/{app_name}/users/{user_id}/sessions/{session_id}",
            get(apis::adk::handle_get_session).post(apis::adk::handle_create_session_with_id),
        )
        .route(RUN_PATH, post(apis::adk::handle_run))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(compression_layer())
        .layer(
            TraceLayer::new_for_http()
                .on_request(log_request)
                .on_response(log_response),
        )
        .layer(from_fn(intercept_run_response))
        .layer(cors)
        .with_state(ctx)
}

/// Start the HTTP server; runs until Ctrl+C or SIGTERM
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    let address = config.address.clone();
    let ctx = AppContext::from_config(config);

    println!("✓ {} ({})", ctx.config.title, ctx.config.description);
    println!("  Project: \x1b[1m{}\x1b[0m", ctx.config.project_id);
    match &ctx.config.backend_url {
        Some(url) => println!("  Agent backend: \x1b[1m{}\x1b[0m", url),
        None => println!("  Agent backend: \x1b[1min-memory\x1b[0m (echo agent)"),
    }
    println!("  CORS origins: \x1b[2m{}\x1b[0m", ctx.config.cors_origins.join(", "));
    println!();

    let app = router(ctx);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;

    println!("Server starting on \x1b[1mhttp://{}\x1b[0m", address);
    println!("\nAvailable endpoints:");
    println!("  \x1b[1mGET  /\x1b[0m                                           - Service info");
    println!("  \x1b[1mGET  /apps/:app/users/:user/sessions\x1b[0m             - List sessions");
    println!("  \x1b[1mPOST /apps/:app/users/:user/sessions\x1b[0m             - Create a session");
    println!("  \x1b[1mGET  /apps/:app/users/:user/sessions/:id\x1b[0m         - Get a session");
    println!("  \x1b[1mPOST /apps/:app/users/:user/sessions/:id\x1b[0m         - Create a session with this id");
    println!("  \x1b[1mPOST /run\x1b[0m                                        - Run one agent turn (?noCompress=true)");
    println!("\nPress Ctrl+C to stop\n");

    info!("HTTP server listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
