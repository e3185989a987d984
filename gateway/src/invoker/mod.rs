//! Strategies that execute a resolved resource.
//!
//! - [`LocalInvoker`] calls an in-process [`Handler`](crate::resource::Handler).
//! - [`HttpBridgeInvoker`] forwards the call to another gateway over HTTP.
//! - [`RemoteInvoker`] forwards the call over the gRPC remote channel,
//!   including file parameters and streamed results.
//!
//! The two forwarding invokers walk an [`Endpoint`](crate::endpoint::Endpoint)'s
//! nodes with [`failover::first_success`].

pub mod failover;
pub mod http_bridge;
pub mod local;
pub mod remote;

pub use http_bridge::HttpBridgeInvoker;
pub use local::LocalInvoker;
pub use remote::RemoteInvoker;

use async_trait::async_trait;

use crate::content::Content;
use crate::endpoint::Endpoint;
use crate::envelope::Fault;
use crate::requester::Requester;
use crate::resource::Resource;

/// Executes a resource on behalf of a requester.
#[async_trait]
pub trait Invoker: Send + Sync {
    /// Short label for logs and metrics.
    fn kind(&self) -> &'static str;

    /// Runs `resource` for `requester`.
    ///
    /// # Errors
    ///
    /// Returns the resource's fault, or [`Fault::Invocation`] when the call
    /// cannot be carried out.
    async fn invoke(&self, resource: &Resource, requester: &Requester) -> Result<Content, Fault>;
}

pub(crate) fn expect_endpoint<'a>(kind: &str, resource: &'a Resource) -> Result<&'a Endpoint, Fault> {
    match resource {
        Resource::Endpoint(endpoint) => Ok(endpoint),
        Resource::Handler(_) => Err(Fault::Invocation(format!(
            "{kind} invoker needs an endpoint resource"
        ))),
    }
}
