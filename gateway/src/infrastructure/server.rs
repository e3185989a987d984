use axum::{routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::http::HttpChannel;
use crate::infrastructure::config::{BindAddress, Settings};

async fn health_check() -> &'static str {
    "OK"
}

/// Installs the global Prometheus recorder.
///
/// # Errors
///
/// Returns an error if a recorder is already installed.
pub fn install_metrics() -> anyhow::Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {e}"))
}

/// Health and metrics routes merged with the channel's catch-all router.
pub fn app(channel: &Arc<HttpChannel>, metrics: Option<PrometheusHandle>) -> Router {
    let mut control_plane = Router::new()
        .route("/health/live", get(health_check))
        .route("/health/ready", get(health_check));
    if let Some(handle) = metrics {
        control_plane =
            control_plane.route("/metrics", get(move || std::future::ready(handle.render())));
    }
    control_plane.merge(channel.router())
}

/// Serves the HTTP channel until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the address is invalid or the listener fails.
pub async fn run_server(
    config: &Settings,
    channel: &Arc<HttpChannel>,
    metrics: Option<PrometheusHandle>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr = BindAddress(config.server.host.clone(), config.server.port).to_socket_addr()?;
    let app = app(channel, metrics);

    tracing::info!("HTTP channel listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
