//! Conduit Gateway - uniform resource invocation over local, HTTP and gRPC hops.
//!
//! Resources are registered under uri patterns in a [`gateway::Gateway`].
//! Callers reach them through a channel (HTTP, remote gRPC, or in-process),
//! each call carried by an immutable [`requester::Requester`]. Results and
//! faults leave every channel as an [`envelope::Envelope`]; large binary
//! results and file parameters cross the gRPC link in windowed chunks.

#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Transport-facing dispatch seam.
pub mod channel;
/// Results produced by resources.
pub mod content;
/// Target node lists for forwarded resources.
pub mod endpoint;
/// Result and fault wrapper with the closed code taxonomy.
pub mod envelope;
/// Route table plus fault resolvers.
pub mod gateway;
/// HTTP channel.
pub mod http;
/// Infrastructure components (config, server, telemetry, audit).
pub mod infrastructure;
/// Local, HTTP-bridge and remote invokers.
pub mod invoker;
/// Parameter maps.
pub mod params;
/// Remote gRPC channel and chunked streaming protocol.
pub mod remote;
/// Per-call request context.
pub mod requester;
/// Resource handlers.
pub mod resource;
/// Uri patterns and the router.
pub mod routing;
/// Session tokens.
pub mod token;
