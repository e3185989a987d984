//! Transport-facing dispatch seam.

use async_trait::async_trait;

use crate::content::Content;
use crate::envelope::Fault;
use crate::requester::Requester;

/// A transport endpoint that can dispatch a [`Requester`].
///
/// Every requester remembers the channel it arrived on, so nested
/// sub-invocations built with [`Requester::build`] are dispatched the same way
/// as the call that spawned them.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Short label for logs (`"http"`, `"remote"`, `"local"`).
    fn name(&self) -> &'static str;

    /// Resolves and executes the requester's resource.
    ///
    /// # Errors
    ///
    /// Returns the fault raised by routing, the invoker or the resource.
    async fn dispatch(&self, requester: &Requester) -> Result<Content, Fault>;
}
