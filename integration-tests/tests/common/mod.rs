//! Shared fixtures: in-process gateway nodes reachable over real sockets.

#![allow(dead_code, clippy::cast_possible_truncation)]

use anyhow::Result;
use conduit_gateway::content::Content;
use conduit_gateway::endpoint::Node;
use conduit_gateway::envelope::Fault;
use conduit_gateway::gateway::Gateway;
use conduit_gateway::http::HttpChannel;
use conduit_gateway::infrastructure::config::StreamingSettings;
use conduit_gateway::infrastructure::server;
use conduit_gateway::remote::{GatewayService, RemoteChannel, UploadStore};
use conduit_gateway::requester::Requester;
use conduit_gateway::resource::handler_fn;
use std::net::{SocketAddr, TcpListener};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::oneshot;

/// Returns a port that was free a moment ago.
pub fn free_port() -> Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

/// Node address nobody listens on.
pub fn dead_node() -> Result<Node> {
    Ok(Node::http("127.0.0.1", free_port()?)?)
}

/// Deterministic test payload.
pub fn pattern(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

/// Gateway with the resources the tests call.
///
/// - `echo` returns `msg`
/// - `files/size` reports the length of the `doc` file
/// - `files/make` produces a file of `size` patterned bytes
/// - `files/blob` returns `size` patterned bytes in memory
/// - `whoami` returns `user@client:locale`
/// - `vault/*` always denies access
pub fn backend(scratch: PathBuf) -> Result<Arc<Gateway>> {
    let gateway = Arc::new(Gateway::new());
    gateway.register_local(
        "echo",
        handler_fn(|r: Requester| async move {
            Ok::<_, Fault>(Content::text(r.params().require_str("msg")?))
        }),
        false,
    )?;
    gateway.register_local(
        "files/size",
        handler_fn(|r: Requester| async move {
            let path = r
                .params()
                .get_file("doc")
                .ok_or_else(|| Fault::invalid_parameter("doc", "file required"))?;
            let size = tokio::fs::metadata(path).await?.len();
            Ok(Content::Json(serde_json::json!({ "size": size })))
        }),
        false,
    )?;
    gateway.register_local(
        "files/make",
        handler_fn(move |r: Requester| {
            let scratch = scratch.clone();
            async move {
                let size: usize = r
                    .params()
                    .require_str("size")?
                    .parse()
                    .map_err(|_| Fault::invalid_parameter("size", "not a number"))?;
                let path = scratch.join(format!("made-{size}.bin"));
                tokio::fs::write(&path, pattern(size)).await?;
                Ok(Content::File(path))
            }
        }),
        false,
    )?;
    gateway.register_local(
        "files/blob",
        handler_fn(|r: Requester| async move {
            let size: usize = r
                .params()
                .require_str("size")?
                .parse()
                .map_err(|_| Fault::invalid_parameter("size", "not a number"))?;
            Ok::<_, Fault>(Content::Bytes {
                name: "blob.bin".into(),
                data: pattern(size).into(),
            })
        }),
        false,
    )?;
    gateway.register_local(
        "whoami",
        handler_fn(|r: Requester| async move {
            let user = r
                .token()
                .and_then(|t| t.attribute("user"))
                .unwrap_or("anonymous")
                .to_string();
            Ok::<_, Fault>(Content::text(format!(
                "{user}@{}:{}",
                r.client(),
                r.locale()
            )))
        }),
        false,
    )?;
    gateway.register_local(
        "vault/*",
        handler_fn(|_| async {
            Err::<Content, _>(Fault::AccessDenied("vault is sealed".into()))
        }),
        false,
    )?;
    Ok(gateway)
}

/// A gateway node serving the remote channel over gRPC.
pub struct GrpcNode {
    /// Address clients connect to.
    pub node: Node,
    /// The served channel, for inspecting its stream registry.
    pub channel: Arc<RemoteChannel>,
    shutdown: Option<oneshot::Sender<()>>,
    _scratch: TempDir,
}

impl GrpcNode {
    /// Starts a node with default streaming settings.
    pub async fn start(id: &str) -> Result<Self> {
        Self::with_settings(id, StreamingSettings::default()).await
    }

    /// Starts a node with custom streaming settings.
    pub async fn with_settings(id: &str, settings: StreamingSettings) -> Result<Self> {
        let scratch = TempDir::new()?;
        let gateway = backend(scratch.path().to_path_buf())?;
        let uploads = UploadStore::new(scratch.path().join("uploads"));
        let channel = RemoteChannel::new(gateway, uploads, settings);

        let port = free_port()?;
        let addr: SocketAddr = format!("127.0.0.1:{port}").parse()?;
        let service = GatewayService::new(Arc::clone(&channel), id);
        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let _ = tonic::transport::Server::builder()
                .add_service(service.into_server())
                .serve_with_shutdown(addr, async {
                    let _ = rx.await;
                })
                .await;
        });
        tokio::time::sleep(Duration::from_millis(100)).await;

        Ok(Self {
            node: Node::http("127.0.0.1", port)?,
            channel,
            shutdown: Some(tx),
            _scratch: scratch,
        })
    }
}

impl Drop for GrpcNode {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Serves `gateway` through an HTTP channel; returns its node and base URL.
pub async fn serve_http(gateway: Arc<Gateway>) -> Result<(Node, String)> {
    let channel = HttpChannel::builder(gateway).build();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = server::app(&channel, None);
    tokio::spawn(async move {
        let _ = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await;
    });
    Ok((Node::http("127.0.0.1", addr.port())?, format!("http://{addr}")))
}
