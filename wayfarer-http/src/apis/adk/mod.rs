pub mod types;
pub mod handler;

pub use types::{CreateSessionRequest, RunRequest, ServiceInfo};
pub use handler::{
    handle_create_session, handle_create_session_with_id, handle_get_session, handle_info,
    handle_list_sessions, handle_run,
};
