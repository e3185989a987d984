//! The in-process core: route table plus fault resolvers.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info_span, warn, Instrument};

use crate::channel::Channel;
use crate::content::Content;
use crate::envelope::{Code, Envelope, Fault, ResolverChain};
use crate::infrastructure::audit::{log_audit, AuditEvent};
use crate::invoker::{Invoker, LocalInvoker};
use crate::requester::Requester;
use crate::resource::{Handler, Resource};
use crate::routing::{RouteError, Router};

/// Shared dispatch core used by every channel.
///
/// A [`Gateway`] is itself a [`Channel`] named `"local"`, so server-side code
/// can invoke resources without any transport.
#[derive(Default)]
pub struct Gateway {
    router: Router,
    resolvers: ResolverChain,
}

impl Gateway {
    /// Creates a gateway with no routes and no custom resolvers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a gateway that classifies faults with `resolvers`.
    #[must_use]
    pub fn with_resolvers(resolvers: ResolverChain) -> Self {
        Self {
            router: Router::new(),
            resolvers,
        }
    }

    /// Route table.
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Fault resolvers applied when building envelopes.
    #[must_use]
    pub fn resolvers(&self) -> &ResolverChain {
        &self.resolvers
    }

    /// Registers `resource` under `pattern`; see [`Router::register`].
    ///
    /// # Errors
    ///
    /// Returns the router's [`RouteError`].
    pub fn register(
        &self,
        pattern: &str,
        invoker: Arc<dyn Invoker>,
        resource: Resource,
        cover: bool,
    ) -> Result<(), RouteError> {
        self.router.register(pattern, invoker, resource, cover)
    }

    /// Registers an in-process handler under `pattern`.
    ///
    /// # Errors
    ///
    /// Returns the router's [`RouteError`].
    pub fn register_local<H: Handler + 'static>(
        &self,
        pattern: &str,
        handler: H,
        cover: bool,
    ) -> Result<(), RouteError> {
        self.router
            .register(pattern, Arc::new(LocalInvoker), Resource::handler(handler), cover)
    }

    /// Resolves the requester's uri and runs the matching resource.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::ResourceNotFound`] for unrouted uris, or the invoker's fault.
    pub async fn dispatch(&self, requester: &Requester) -> Result<Content, Fault> {
        let span = info_span!(
            "dispatch",
            uri = %requester.uri(),
            channel = requester.channel().name(),
            depth = requester.depth()
        );
        let result = async {
            let resolved = self.router.resolve(requester.uri())?;
            resolved.invoker.invoke(&resolved.resource, requester).await
        }
        .instrument(span)
        .await;

        let code = match &result {
            Ok(_) => Code::Success,
            Err(fault) => {
                let code = self.resolvers.envelope(fault).code;
                self.audit(code, requester);
                warn!(uri = %requester.uri(), code = %code, error = %fault, "Invocation failed");
                code
            }
        };
        metrics::counter!("conduit_invocations_total", "code" => code.as_str()).increment(1);
        result
    }

    /// Envelope for an inline result or a fault.
    #[must_use]
    pub fn envelope(&self, result: Result<Content, Fault>) -> Envelope {
        match result {
            Ok(content) => Envelope::success(content.into_json()),
            Err(fault) => self.resolvers.envelope(&fault),
        }
    }

    fn audit(&self, code: Code, requester: &Requester) {
        let client = requester.client().to_string();
        let uri = requester.uri().to_string();
        match code {
            Code::AccessDenied => log_audit(&AuditEvent::AccessDenied { client, uri }),
            Code::InvalidToken => log_audit(&AuditEvent::InvalidToken { client, uri }),
            _ => {}
        }
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("routes", &self.router.patterns())
            .field("resolvers", &self.resolvers)
            .finish()
    }
}

#[async_trait]
impl Channel for Gateway {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn dispatch(&self, requester: &Requester) -> Result<Content, Fault> {
        Gateway::dispatch(self, requester).await
    }
}
