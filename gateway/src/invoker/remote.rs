//! Forwarding over the gRPC remote channel.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use super::failover::first_success;
use super::{expect_endpoint, Invoker};
use crate::content::Content;
use crate::endpoint::Node;
use crate::envelope::Fault;
use crate::infrastructure::config::StreamingSettings;
use crate::remote::{GrpcTransport, RemoteClient};
use crate::requester::Requester;
use crate::resource::Resource;

/// Invokes endpoint resources on remote gateway nodes.
///
/// Connections are opened on first use and cached per node.
pub struct RemoteInvoker {
    connections: RwLock<HashMap<Node, Arc<GrpcTransport>>>,
    settings: StreamingSettings,
    download_dir: PathBuf,
}

impl RemoteInvoker {
    /// Creates an invoker storing downloaded results under `download_dir`.
    pub fn new(settings: StreamingSettings, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            settings,
            download_dir: download_dir.into(),
        }
    }

    /// Number of cached node connections.
    #[must_use]
    pub fn connected(&self) -> usize {
        self.connections.read().len()
    }

    async fn get_or_connect(&self, node: &Node) -> Result<Arc<GrpcTransport>, Fault> {
        let cached = self.connections.read().get(node).cloned();
        if let Some(transport) = cached {
            return Ok(transport);
        }

        let transport = Arc::new(GrpcTransport::connect(node).await?);
        debug!(node = %node, "Connected to remote node");
        self.connections
            .write()
            .insert(node.clone(), Arc::clone(&transport));
        Ok(transport)
    }

    async fn call(&self, node: &Node, uri: &str, requester: &Requester) -> Result<Content, Fault> {
        let transport = self.get_or_connect(node).await?;
        RemoteClient::new(transport, self.settings, self.download_dir.clone())
            .invoke(requester, uri)
            .await
    }
}

#[async_trait]
impl Invoker for RemoteInvoker {
    fn kind(&self) -> &'static str {
        "remote"
    }

    async fn invoke(&self, resource: &Resource, requester: &Requester) -> Result<Content, Fault> {
        let endpoint = expect_endpoint(self.kind(), resource)?;
        let uri = endpoint.target_uri(requester.uri());
        first_success(endpoint.nodes(), |node| self.call(node, uri, requester)).await
    }
}

impl std::fmt::Debug for RemoteInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteInvoker")
            .field("connected", &self.connected())
            .field("settings", &self.settings)
            .field("download_dir", &self.download_dir)
            .finish()
    }
}
