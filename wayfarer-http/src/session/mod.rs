mod memory;
mod session;
mod store;

pub use memory::MemorySessionStore;
pub use session::{NewSession, Session, SessionKey};
pub use store::{SessionStore, StoreError};

use serde_json::{Map, Value};

/// Normalize a session listing body into its entries.
///
/// Listings come back either as a bare array or wrapped as `{"sessions": [...]}`.
/// Any other shape, and any entry that is not an object, is dropped.
pub fn listing_entries(body: Value) -> Vec<Map<String, Value>> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut wrapper) => match wrapper.remove("sessions") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(entry) => Some(entry),
            _ => None,
        })
        .collect()
}
