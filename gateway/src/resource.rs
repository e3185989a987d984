//! Invocation targets registered with the router.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

use crate::content::Content;
use crate::endpoint::Endpoint;
use crate::envelope::Fault;
use crate::requester::Requester;

/// In-process resource body.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handles one call.
    ///
    /// # Errors
    ///
    /// Returns a [`Fault`] describing why the call failed.
    async fn handle(&self, requester: &Requester) -> Result<Content, Fault>;
}

/// Adapter turning an async closure into a [`Handler`].
pub struct HandlerFn<F>(F);

/// Wraps `f` as a [`Handler`]. The closure receives its own clone of the requester.
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Requester) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Content, Fault>> + Send,
{
    HandlerFn(f)
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Requester) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Content, Fault>> + Send,
{
    async fn handle(&self, requester: &Requester) -> Result<Content, Fault> {
        (self.0)(requester.clone()).await
    }
}

/// What a route points at: a local handler or a remote endpoint.
#[derive(Clone)]
pub enum Resource {
    /// Executed in-process by the local invoker.
    Handler(Arc<dyn Handler>),
    /// Forwarded by the HTTP bridge or remote RPC invoker.
    Endpoint(Endpoint),
}

impl Resource {
    /// Wraps a handler.
    pub fn handler<H: Handler + 'static>(handler: H) -> Self {
        Resource::Handler(Arc::new(handler))
    }

    /// Short label for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Resource::Handler(_) => "handler",
            Resource::Endpoint(_) => "endpoint",
        }
    }
}

impl From<Endpoint> for Resource {
    fn from(endpoint: Endpoint) -> Self {
        Resource::Endpoint(endpoint)
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resource::Handler(_) => f.write_str("Handler"),
            Resource::Endpoint(ep) => f.debug_tuple("Endpoint").field(ep).finish(),
        }
    }
}
