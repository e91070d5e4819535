pub mod http;
pub mod adk;
pub mod agent;
pub mod apis;
pub mod error;
pub mod event;
pub mod middleware;
pub mod session;

pub use error::{ApiError, ApiJson, ApiPath, ErrorResponse};
pub use event::{Content, Event, FunctionCall, Part};
pub use session::{MemorySessionStore, Session, SessionKey, SessionStore};
pub use agent::{AgentRunner, EchoAgent};
pub use adk::AdkBackend;
pub use http::{AppContext, ServerConfig, router, start_server};
