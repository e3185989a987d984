//! Configuration management for the gateway.
//!
//! Settings are layered: built-in defaults, then an optional `conduit.toml`
//! (or the file named by `CONDUIT_CONFIG`), then `CONDUIT__*` environment
//! variables using `__` as the section separator.
//!
//! # Example
//!
//! ```no_run
//! use conduit_gateway::infrastructure::config::Settings;
//!
//! let settings = Settings::new().expect("Failed to load configuration");
//! ```

pub mod forward;
pub mod remote;
pub mod server;
pub mod streaming;
pub mod telemetry;

pub use forward::{ForwardKind, ForwardSettings};
pub use remote::RemoteSettings;
pub use server::ServerSettings;
pub use streaming::StreamingSettings;
pub use telemetry::TelemetrySettings;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Top-level configuration for the gateway.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// HTTP channel settings.
    pub server: ServerSettings,
    /// Remote channel settings.
    pub remote: RemoteSettings,
    /// Streaming protocol settings.
    #[serde(default)]
    pub streaming: StreamingSettings,
    /// Telemetry settings.
    pub telemetry: TelemetrySettings,
    /// Statically configured forwarding routes.
    #[serde(default)]
    pub forward: Vec<ForwardSettings>,
}

impl Settings {
    /// Creates a new settings instance from defaults, an optional file and
    /// environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be built or deserialized.
    pub fn new() -> Result<Self, ConfigError> {
        let file = std::env::var("CONDUIT_CONFIG").unwrap_or_else(|_| "conduit".into());

        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.context_path", "")?
            .set_default("remote.host", "0.0.0.0")?
            .set_default("remote.port", 50051)?
            .set_default("remote.upload_dir", "data/uploads")?
            .set_default("remote.download_dir", "data/downloads")?
            .set_default("telemetry.service_name", "conduit-gateway")?
            .set_default("telemetry.log_level", "info")?
            .set_default("telemetry.sampling_ratio", 1.0)?
            .add_source(File::with_name(&file).required(false))
            .add_source(Environment::with_prefix("CONDUIT").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

/// Helper for strong typing addresses
pub struct BindAddress(pub String, pub u16);

impl BindAddress {
    /// Converts the bind address to a `SocketAddr`.
    ///
    /// # Errors
    ///
    /// Returns an error if the IP address string cannot be parsed.
    pub fn to_socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        let ip = self
            .0
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid IP address '{}': {e}", self.0))?;
        Ok(std::net::SocketAddr::new(ip, self.1))
    }
}
