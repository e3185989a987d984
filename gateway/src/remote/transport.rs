//! Minimal transport contract of the remote channel.
//!
//! Anything that can carry `invoke`, `upload` and `download` satisfies the
//! streaming protocol: the gRPC client in [`super::grpc`] and, in-process,
//! [`super::RemoteChannel`] itself.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::envelope::{Envelope, Fault};
use crate::token::Token;

/// Handle to a server-side stream awaiting chunked retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Registry id to pass to `download`.
    pub id: String,
    /// Display name of the payload.
    pub name: String,
    /// Total size in bytes; zero when unknown.
    pub size: u64,
    /// `true` when the stream supports ranged reads.
    pub is_file: bool,
}

/// Arguments of a remote `invoke`.
#[derive(Debug, Clone)]
pub struct InvokeCall {
    /// Calling client identity.
    pub client: String,
    /// Propagated token.
    pub token: Option<Token>,
    /// Target uri on the remote side.
    pub uri: String,
    /// JSON object of parameters; file values are upload artifact names.
    pub params: serde_json::Value,
    /// Caller locale.
    pub locale: String,
}

/// Successful reply of a remote `invoke`.
#[derive(Debug, Clone, PartialEq)]
pub enum InvokeReply {
    /// Result small enough to travel inside the envelope.
    Inline(Envelope),
    /// Result parked in the stream registry.
    Stream(StreamDescriptor),
}

/// Carrier of the three remote operations.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Dispatches a call on the remote side.
    ///
    /// # Errors
    ///
    /// Returns the remote fault, rebuilt from its envelope, or a transport fault.
    async fn invoke(&self, call: InvokeCall) -> Result<InvokeReply, Fault>;

    /// Writes one chunk of an upload artifact at `offset`.
    ///
    /// # Errors
    ///
    /// Returns a fault if the chunk could not be stored.
    async fn upload(&self, name: &str, offset: u64, data: Bytes) -> Result<(), Fault>;

    /// Reads up to `length` bytes of a stream starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::StreamNotFound`] for unknown or evicted streams.
    async fn download(&self, id: &str, offset: u64, length: u64) -> Result<Bytes, Fault>;
}
