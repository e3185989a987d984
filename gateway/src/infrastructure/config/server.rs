//! HTTP channel configuration.
//!
//! This module defines HTTP server binding and request path settings.

use serde::Deserialize;

/// HTTP server settings.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Application context path stripped from inbound uris, e.g. `/app`.
    #[serde(default)]
    pub context_path: String,
    /// Directory holding view templates.
    #[serde(default = "default_template_dir")]
    pub template_dir: String,
}

fn default_template_dir() -> String {
    "templates".to_string()
}
