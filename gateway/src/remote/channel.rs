//! Transport-independent endpoint of the remote channel.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use tracing::{debug, info_span, Instrument};

use super::stream::StreamRegistry;
use super::transport::{InvokeCall, InvokeReply, RemoteTransport};
use super::upload::UploadStore;
use crate::channel::Channel;
use crate::content::Content;
use crate::envelope::Fault;
use crate::gateway::Gateway;
use crate::infrastructure::config::StreamingSettings;
use crate::params::Params;
use crate::requester::Requester;

/// Server side of the remote channel.
///
/// `invoke` rehydrates uploaded artifacts, dispatches through the
/// [`Gateway`] and either inlines the result in an envelope or parks it in the
/// [`StreamRegistry`]. Artifacts are deleted once the reply is ready. Resource faults travel inside the envelope; only
/// transport problems surface as `Err`.
pub struct RemoteChannel {
    gateway: Arc<Gateway>,
    uploads: UploadStore,
    streams: StreamRegistry,
    this: Weak<RemoteChannel>,
}

impl RemoteChannel {
    /// Creates a channel in front of `gateway`.
    pub fn new(gateway: Arc<Gateway>, uploads: UploadStore, settings: StreamingSettings) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            gateway,
            uploads,
            streams: StreamRegistry::new(settings),
            this: this.clone(),
        })
    }

    /// Shared dispatch core.
    #[must_use]
    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    /// Live download streams.
    #[must_use]
    pub fn streams(&self) -> &StreamRegistry {
        &self.streams
    }

    /// Upload artifact storage.
    #[must_use]
    pub fn uploads(&self) -> &UploadStore {
        &self.uploads
    }

    /// Builds the requester for `call` along with the artifacts it consumes.
    async fn prepare(&self, call: InvokeCall) -> Result<(Requester, Vec<PathBuf>), Fault> {
        let channel: Arc<dyn Channel> = self
            .this
            .upgrade()
            .ok_or_else(|| Fault::invocation("remote channel is shutting down"))?;
        let params = Params::from_json(call.params)?;
        let params = self.uploads.rehydrate(params).await?;
        let artifacts = self.uploads.artifacts(&params);
        let requester = Requester::builder(channel, call.uri)
            .params(params)
            .token(call.token)
            .client(call.client)
            .locale(call.locale)
            .build();
        Ok((requester, artifacts))
    }

    async fn reply(&self, result: Result<Content, Fault>) -> InvokeReply {
        match result {
            Ok(content) if content.is_streamable() => match self.streams.open(content).await {
                Ok(descriptor) => {
                    debug!(stream_id = %descriptor.id, size = descriptor.size, "Result parked for download");
                    InvokeReply::Stream(descriptor)
                }
                Err(fault) => InvokeReply::Inline(self.gateway.envelope(Err(fault))),
            },
            other => InvokeReply::Inline(self.gateway.envelope(other)),
        }
    }
}

#[async_trait]
impl Channel for RemoteChannel {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn dispatch(&self, requester: &Requester) -> Result<Content, Fault> {
        self.gateway.dispatch(requester).await
    }
}

#[async_trait]
impl RemoteTransport for RemoteChannel {
    async fn invoke(&self, call: InvokeCall) -> Result<InvokeReply, Fault> {
        let span = info_span!("remote_invoke", uri = %call.uri, client = %call.client);
        async {
            let (result, artifacts) = match self.prepare(call).await {
                Ok((requester, artifacts)) => (requester.execute().await, artifacts),
                Err(fault) => (Err(fault), Vec::new()),
            };
            // File results are opened by the registry before their artifacts go.
            let reply = self.reply(result).await;
            self.uploads.discard(artifacts).await;
            Ok(reply)
        }
        .instrument(span)
        .await
    }

    async fn upload(&self, name: &str, offset: u64, data: Bytes) -> Result<(), Fault> {
        self.uploads.write(name, offset, data).await
    }

    async fn download(&self, id: &str, offset: u64, length: u64) -> Result<Bytes, Fault> {
        self.streams.fetch(id, offset, length).await
    }
}

impl std::fmt::Debug for RemoteChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteChannel")
            .field("uploads", &self.uploads)
            .field("streams", &self.streams)
            .finish_non_exhaustive()
    }
}
