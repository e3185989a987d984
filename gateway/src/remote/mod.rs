//! Remote channel: gRPC invocation with windowed chunked transfers.
//!
//! Binary parameters are uploaded ahead of the call in chunks of
//! `streaming.chunk_size` bytes with at most `streaming.window` calls in
//! flight. Binary results are parked in a [`StreamRegistry`] and pulled back
//! the same way. A handle nobody fetches for `streaming.idle_timeout_ms` is
//! destroyed by its watchdog; later fetches fail with "stream does not exist".

pub mod channel;
pub mod client;
pub mod grpc;
pub mod proto;
pub mod service;
pub mod stream;
pub mod transport;
pub mod upload;
pub mod window;

pub use channel::RemoteChannel;
pub use client::RemoteClient;
pub use grpc::GrpcTransport;
pub use service::GatewayService;
pub use stream::{StreamHandle, StreamRegistry};
pub use transport::{InvokeCall, InvokeReply, RemoteTransport, StreamDescriptor};
pub use upload::UploadStore;
pub use window::Window;
