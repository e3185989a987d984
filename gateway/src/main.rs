//! `conduit` binary: HTTP and gRPC channels over one gateway.

use conduit_gateway::content::Content;
use conduit_gateway::envelope::Fault;
use conduit_gateway::gateway::Gateway;
use conduit_gateway::http::{HttpChannel, PlaceholderRender};
use conduit_gateway::infrastructure::config::{BindAddress, ForwardKind, Settings};
use conduit_gateway::infrastructure::{audit, server, telemetry::TelemetryBuilder};
use conduit_gateway::invoker::{HttpBridgeInvoker, Invoker, RemoteInvoker};
use conduit_gateway::remote::{GatewayService, RemoteChannel, UploadStore};
use conduit_gateway::requester::Requester;
use conduit_gateway::resource::{handler_fn, Resource};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Settings::new()?;

    TelemetryBuilder::from_settings(&config.telemetry, env!("CARGO_PKG_VERSION")).init()?;
    let metrics = server::install_metrics()?;

    info!("Conduit Gateway starting...");
    audit::log_audit(&audit::AuditEvent::SystemStartup {
        component: "gateway".into(),
    });

    let gateway = Arc::new(Gateway::new());
    gateway.register_local(
        "echo",
        handler_fn(|r: Requester| async move {
            Ok::<_, Fault>(Content::text(r.params().require_str("msg")?))
        }),
        false,
    )?;

    let http_bridge: Arc<dyn Invoker> = Arc::new(HttpBridgeInvoker::new()?);
    let remote: Arc<dyn Invoker> = Arc::new(RemoteInvoker::new(
        config.streaming,
        config.remote.download_dir.clone(),
    ));
    for route in &config.forward {
        let invoker = match route.kind {
            ForwardKind::Http => Arc::clone(&http_bridge),
            ForwardKind::Remote => Arc::clone(&remote),
        };
        gateway.register(
            &route.pattern,
            invoker,
            Resource::Endpoint(route.endpoint.clone()),
            route.cover,
        )?;
        info!(pattern = %route.pattern, kind = ?route.kind, "Forward route registered");
    }

    let (stop_tx, stop_rx) = watch::channel(false);

    let remote_channel = RemoteChannel::new(
        Arc::clone(&gateway),
        UploadStore::new(config.remote.upload_dir.clone()),
        config.streaming,
    );
    let node_id = config
        .remote
        .node_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let grpc_addr = BindAddress(config.remote.host.clone(), config.remote.port).to_socket_addr()?;
    let service = GatewayService::new(remote_channel, node_id.clone());
    let mut grpc_stop = stop_rx.clone();
    let grpc = tokio::spawn(async move {
        info!("Remote channel (node {}) listening on {}", node_id, grpc_addr);
        if let Err(e) = tonic::transport::Server::builder()
            .add_service(service.into_server())
            .serve_with_shutdown(grpc_addr, async move {
                let _ = grpc_stop.changed().await;
            })
            .await
        {
            error!("Remote channel failed: {:?}", e);
        }
    });

    let channel = HttpChannel::builder(Arc::clone(&gateway))
        .context_path(&config.server.context_path)
        .render(PlaceholderRender::new(&config.server.template_dir))
        .build();
    let mut http_stop = stop_rx.clone();
    let http_config = config.clone();
    let http = tokio::spawn(async move {
        let shutdown = async move {
            let _ = http_stop.changed().await;
        };
        if let Err(e) = server::run_server(&http_config, &channel, Some(metrics), shutdown).await {
            error!("HTTP channel failed: {:?}", e);
        }
    });

    info!("Conduit Gateway initialized. Waiting for shutdown signal...");

    shutdown_signal().await;

    info!("Shutdown signal received, draining channels...");
    audit::log_audit(&audit::AuditEvent::SystemShutdown {
        reason: "Signal received".into(),
    });
    let _ = stop_tx.send(true);
    let _ = tokio::join!(grpc, http);

    info!("Conduit Gateway shutdown complete.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
