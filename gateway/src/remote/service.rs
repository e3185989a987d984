//! gRPC service exposing a [`RemoteChannel`](super::RemoteChannel).

use bytes::Bytes;
use std::sync::Arc;
use tonic::{Request, Response, Status};

use super::channel::RemoteChannel;
use super::grpc::{fault_to_status, token_from_proto, MAX_MESSAGE_SIZE};
use super::proto::resource_gateway_server::{ResourceGateway, ResourceGatewayServer};
use super::proto::{
    invoke_reply, Chunk, DownloadRequest, InvokeReply, InvokeRequest, PingRequest, Pong,
    StreamDescriptor, UploadAck, UploadRequest,
};
use super::transport::{self, InvokeCall, RemoteTransport};
use crate::envelope::Fault;

/// gRPC face of a [`RemoteChannel`].
pub struct GatewayService {
    channel: Arc<RemoteChannel>,
    node_id: String,
}

impl GatewayService {
    /// Serves `channel`, answering pings as `node_id`.
    #[must_use]
    pub fn new(channel: Arc<RemoteChannel>, node_id: impl Into<String>) -> Self {
        Self {
            channel,
            node_id: node_id.into(),
        }
    }

    /// Wraps the service in a tonic server sized for whole-stream replies.
    #[must_use]
    pub fn into_server(self) -> ResourceGatewayServer<Self> {
        ResourceGatewayServer::new(self)
            .max_decoding_message_size(MAX_MESSAGE_SIZE)
            .max_encoding_message_size(MAX_MESSAGE_SIZE)
    }

    fn status(&self, fault: &Fault) -> Status {
        let envelope = self.channel.gateway().resolvers().envelope(fault);
        fault_to_status(&envelope, fault)
    }
}

#[tonic::async_trait]
impl ResourceGateway for GatewayService {
    async fn invoke(&self, request: Request<InvokeRequest>) -> Result<Response<InvokeReply>, Status> {
        let req = request.into_inner();
        let params = if req.params.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&req.params).map_err(|e| {
                self.status(&Fault::invalid_parameter("params", format!("malformed JSON: {e}")))
            })?
        };
        let call = InvokeCall {
            client: req.client,
            token: token_from_proto(req.token),
            uri: req.uri,
            params,
            locale: req.locale,
        };

        let result = match self.channel.invoke(call).await.map_err(|f| self.status(&f))? {
            transport::InvokeReply::Inline(envelope) => {
                let json = envelope.to_json().map_err(|f| self.status(&f))?;
                invoke_reply::Result::Envelope(json)
            }
            transport::InvokeReply::Stream(stream) => invoke_reply::Result::Stream(StreamDescriptor {
                id: stream.id,
                name: stream.name,
                size: stream.size,
                is_file: stream.is_file,
            }),
        };
        Ok(Response::new(InvokeReply {
            result: Some(result),
        }))
    }

    async fn upload(&self, request: Request<UploadRequest>) -> Result<Response<UploadAck>, Status> {
        let req = request.into_inner();
        let received = req.data.len() as u64;
        self.channel
            .upload(&req.name, req.offset, Bytes::from(req.data))
            .await
            .map_err(|f| self.status(&f))?;
        Ok(Response::new(UploadAck { received }))
    }

    async fn download(&self, request: Request<DownloadRequest>) -> Result<Response<Chunk>, Status> {
        let req = request.into_inner();
        let data = self
            .channel
            .download(&req.id, req.offset, req.length)
            .await
            .map_err(|f| self.status(&f))?;
        Ok(Response::new(Chunk { data: data.to_vec() }))
    }

    async fn ping(&self, _request: Request<PingRequest>) -> Result<Response<Pong>, Status> {
        Ok(Response::new(Pong {
            node_id: self.node_id.clone(),
            ready: true,
            timestamp: chrono::Utc::now().timestamp(),
        }))
    }
}
