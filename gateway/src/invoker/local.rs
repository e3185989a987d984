//! In-process invocation.

use async_trait::async_trait;

use super::Invoker;
use crate::content::Content;
use crate::envelope::Fault;
use crate::requester::Requester;
use crate::resource::Resource;

/// Calls the resource's handler directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalInvoker;

#[async_trait]
impl Invoker for LocalInvoker {
    fn kind(&self) -> &'static str {
        "local"
    }

    async fn invoke(&self, resource: &Resource, requester: &Requester) -> Result<Content, Fault> {
        match resource {
            Resource::Handler(handler) => handler.handle(requester).await,
            Resource::Endpoint(_) => Err(Fault::Invocation(
                "local invoker cannot execute an endpoint resource".to_string(),
            )),
        }
    }
}
