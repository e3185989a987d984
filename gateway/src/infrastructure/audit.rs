use serde::Serialize;
use tracing::{info, info_span};

/// Security-relevant gateway event.
/// Serialized as JSON so the audit target can be shipped to a separate sink.
#[derive(Debug, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// A gateway component came up.
    SystemStartup {
        /// Component name.
        component: String,
    },
    /// The gateway is shutting down.
    SystemShutdown {
        /// Trigger of the shutdown.
        reason: String,
    },
    /// A resource refused the caller.
    AccessDenied {
        /// Calling client.
        client: String,
        /// Requested uri.
        uri: String,
    },
    /// The caller presented a token that was rejected.
    InvalidToken {
        /// Calling client.
        client: String,
        /// Requested uri.
        uri: String,
    },
    /// A stream handle was evicted by its watchdog.
    StreamEvicted {
        /// Registry id of the stream.
        stream_id: String,
        /// Milliseconds since the last fetch.
        idle_ms: u64,
    },
}

/// Logs an audit event on the `audit` target as structured JSON.
pub fn log_audit(event: &AuditEvent) {
    let span = info_span!(target: "audit", "audit_event");
    let _enter = span.enter();

    let json = serde_json::to_string(event).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"));
    info!(target: "audit", audit_json = %json, "Security Audit Event");
}
