/// Audit logging for security events.
pub mod audit;
/// Configuration management for the gateway.
pub mod config;
/// HTTP listener with health and metrics routes.
pub mod server;
/// Telemetry setup for logging and tracing.
pub mod telemetry;
