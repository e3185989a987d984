//! gRPC carrier for [`RemoteTransport`] and the wire conversions it needs.

use async_trait::async_trait;
use bytes::Bytes;
use tonic::transport::Channel;
use tonic::{Request, Status};

use super::proto::{self, invoke_reply, resource_gateway_client::ResourceGatewayClient};
use super::transport::{InvokeCall, InvokeReply, RemoteTransport, StreamDescriptor};
use crate::endpoint::Node;
use crate::envelope::{Code, Envelope, Fault};
use crate::token::Token;

/// Largest gRPC message either side accepts or sends.
///
/// Ranged file streams never come near it; bytes, reader and channel results
/// travel whole in a single `Download` reply.
pub const MAX_MESSAGE_SIZE: usize = 1 << 30;

/// gRPC client of a remote gateway node.
#[derive(Clone, Debug)]
pub struct GrpcTransport {
    client: ResourceGatewayClient<Channel>,
}

impl GrpcTransport {
    /// Opens a connection to `node`.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::Invocation`] if the node cannot be reached.
    pub async fn connect(node: &Node) -> Result<Self, Fault> {
        let endpoint = Channel::from_shared(node.base_url())
            .map_err(|e| Fault::Invocation(format!("invalid node address {node}: {e}")))?;
        let channel = endpoint
            .connect()
            .await
            .map_err(|e| Fault::Invocation(format!("cannot reach {node}: {e}")))?;
        Ok(Self::from_channel(channel))
    }

    /// Wraps an already established channel.
    #[must_use]
    pub fn from_channel(channel: Channel) -> Self {
        Self {
            client: ResourceGatewayClient::new(channel)
                .max_decoding_message_size(MAX_MESSAGE_SIZE)
                .max_encoding_message_size(MAX_MESSAGE_SIZE),
        }
    }

    /// Health check of the remote node.
    ///
    /// # Errors
    ///
    /// Returns the fault carried by the failed call.
    pub async fn ping(&self) -> Result<proto::Pong, Fault> {
        let mut client = self.client.clone();
        let pong = client
            .ping(Request::new(proto::PingRequest {}))
            .await
            .map_err(status_to_fault)?;
        Ok(pong.into_inner())
    }
}

#[async_trait]
impl RemoteTransport for GrpcTransport {
    async fn invoke(&self, call: InvokeCall) -> Result<InvokeReply, Fault> {
        let request = proto::InvokeRequest {
            client: call.client,
            token: call.token.as_ref().map(token_to_proto),
            uri: call.uri,
            params: serde_json::to_string(&call.params)
                .map_err(|e| Fault::invalid_parameter("params", e.to_string()))?,
            locale: call.locale,
        };
        let mut client = self.client.clone();
        let reply = client
            .invoke(Request::new(request))
            .await
            .map_err(status_to_fault)?
            .into_inner();

        match reply.result {
            Some(invoke_reply::Result::Envelope(json)) => Ok(InvokeReply::Inline(Envelope::from_json(&json)?)),
            Some(invoke_reply::Result::Stream(stream)) => Ok(InvokeReply::Stream(StreamDescriptor {
                id: stream.id,
                name: stream.name,
                size: stream.size,
                is_file: stream.is_file,
            })),
            None => Err(Fault::invocation("empty invoke reply")),
        }
    }

    async fn upload(&self, name: &str, offset: u64, data: Bytes) -> Result<(), Fault> {
        let mut client = self.client.clone();
        client
            .upload(Request::new(proto::UploadRequest {
                name: name.to_string(),
                offset,
                data: data.to_vec(),
            }))
            .await
            .map_err(status_to_fault)?;
        Ok(())
    }

    async fn download(&self, id: &str, offset: u64, length: u64) -> Result<Bytes, Fault> {
        let mut client = self.client.clone();
        let chunk = client
            .download(Request::new(proto::DownloadRequest {
                id: id.to_string(),
                offset,
                length,
            }))
            .await
            .map_err(status_to_fault)?
            .into_inner();
        Ok(Bytes::from(chunk.data))
    }
}

pub(crate) fn token_to_proto(token: &Token) -> proto::Token {
    proto::Token {
        code: token.code().to_string(),
        timeout: token.timeout(),
        attributes: token
            .attributes()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    }
}

pub(crate) fn token_from_proto(token: Option<proto::Token>) -> Option<Token> {
    let token = token?;
    Token::new(token.code, token.timeout).map(|t| t.with_attributes(token.attributes))
}

/// Status for a transport-level fault; the envelope rides in the details.
pub(crate) fn fault_to_status(envelope: &Envelope, fault: &Fault) -> Status {
    let code = match fault {
        Fault::StreamNotFound(_) | Fault::ResourceNotFound(_) => tonic::Code::NotFound,
        _ => match envelope.code {
            Code::Success => tonic::Code::Ok,
            Code::GenericFailure => tonic::Code::Internal,
            Code::InvocationFault => tonic::Code::Aborted,
            Code::AccessDenied => tonic::Code::PermissionDenied,
            Code::InvalidToken => tonic::Code::Unauthenticated,
            Code::RequestHandlingFault => tonic::Code::FailedPrecondition,
            Code::InvalidParameter => tonic::Code::InvalidArgument,
        },
    };
    let message = envelope.error.clone().unwrap_or_else(|| fault.to_string());
    match serde_json::to_vec(envelope) {
        Ok(details) => Status::with_details(code, message, Bytes::from(details)),
        Err(_) => Status::new(code, message),
    }
}

/// Rebuilds the fault behind a failed call.
///
/// Statuses without an envelope (connection refused, deadline exceeded) become
/// [`Fault::Invocation`].
pub(crate) fn status_to_fault(status: Status) -> Fault {
    if let Some(id) = missing_stream(&status) {
        return Fault::StreamNotFound(id);
    }
    if let Ok(envelope) = serde_json::from_slice::<Envelope>(status.details()) {
        if let Err(fault) = envelope.unwrap() {
            return fault;
        }
    }
    Fault::Invocation(format!("remote call failed: {}", status.message()))
}

/// Id of the stream a `NotFound` status refers to, if it is a stream fault.
fn missing_stream(status: &Status) -> Option<String> {
    if status.code() != tonic::Code::NotFound {
        return None;
    }
    let envelope = serde_json::from_slice::<Envelope>(status.details()).ok()?;
    if envelope.code != Code::InvocationFault {
        return None;
    }
    let message = envelope.error.unwrap_or_default();
    let prefix = Fault::StreamNotFound(String::new()).to_string();
    message.strip_prefix(&prefix).map(str::to_string)
}
