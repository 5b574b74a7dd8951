//! Timestamps, invocation ids and the JSON response envelope.

use crate::core::error::AgentError;
use serde_json::Value as JsonValue;
use ulid::Ulid;

/// Returns unix-epoch seconds with `Z` suffix (e.g. `1771220592Z`).
pub fn now_epoch_z() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("{}Z", secs)
}

pub fn new_invocation_id() -> String {
    Ulid::new().to_string()
}

/// Standard response envelope shape used by every CLI surface in JSON mode.
pub fn command_envelope(cmd: &str, status: &str, extra: JsonValue) -> JsonValue {
    let mut base = serde_json::json!({
        "envelope_version": "1.0.0",
        "ts": now_epoch_z(),
        "event_id": new_invocation_id(),
        "cmd": cmd,
        "status": status
    });
    if let (Some(base_obj), Some(extra_obj)) = (base.as_object_mut(), extra.as_object()) {
        for (k, v) in extra_obj {
            base_obj.insert(k.clone(), v.clone());
        }
    }
    base
}

pub fn error_envelope(cmd: &str, err: &AgentError) -> JsonValue {
    let class = err.class();
    command_envelope(
        cmd,
        "error",
        serde_json::json!({
            "error": {
                "kind": err.kind(),
                "class": class,
                "http_status": class.http_status(),
                "message": err.to_string(),
            }
        }),
    )
}
