use std::fmt::Write;

use console::style;
use serde_json::Value;
use wayfarer_http::event::ROLE_MODEL;
use wayfarer_http::{Event, FunctionCall};

use super::client::pretty;

const BANNER_WIDTH: usize = 80;
const RULE_WIDTH: usize = 40;

/// Human-readable rendering of a `/run` answer: model text, tool calls and any other
/// part payloads. Non-model events are skipped.
pub fn render_events(events: &[Event], complex: bool) -> String {
    let query_type = if complex { "COMPLEX QUERY" } else { "STANDARD QUERY" };
    let banner = "=".repeat(BANNER_WIDTH);
    let rule = "-".repeat(RULE_WIDTH);

    let mut out = String::new();
    let _ = writeln!(out, "\n{}", banner);
    let _ = writeln!(
        out,
        "{}",
        style(format!("TRIP PLANNER AGENT RESPONSE ({})", query_type)).bold().cyan()
    );
    let _ = writeln!(out, "{}", banner);

    let model_parts = events
        .iter()
        .filter(|e| e.role() == Some(ROLE_MODEL))
        .filter_map(Event::content)
        .flat_map(|c| c.parts);

    for part in model_parts {
        if let Some(text) = part.text.as_deref().filter(|t| !t.is_empty()) {
            let _ = writeln!(out, "\n{}", text);
        }

        if let Some(call) = &part.function_call {
            let name = if call.name.is_empty() { "Unknown Tool" } else { call.name.as_str() };
            let _ = writeln!(out, "\n{}", style(format!("🛠️ TOOL USED: {}", name)).yellow());
            let _ = writeln!(out, "{}", rule);
            let _ = writeln!(out, "{}", render_args(call));
            let _ = writeln!(out, "{}", rule);
        }

        for (key, value) in part.extra.iter().filter(|(_, v)| !v.is_null()) {
            let _ = writeln!(out, "\n▶️ {}:", key.to_uppercase());
            let _ = writeln!(out, "{}", rule);
            let _ = writeln!(out, "{}", render_value(value));
            let _ = writeln!(out, "{}", rule);
        }
    }

    let _ = writeln!(out, "\n{}\n", banner);
    out
}

/// Tool arguments usually arrive as a JSON-encoded string; print them decoded when possible
fn render_args(call: &FunctionCall) -> String {
    match &call.args {
        Value::Null => "{}".to_string(),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(decoded) => pretty(&decoded),
            Err(_) => raw.clone(),
        },
        other => pretty(other),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Object(_) | Value::Array(_) => pretty(value),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
