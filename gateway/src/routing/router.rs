//! Registry mapping uri patterns to (invoker, resource) pairs.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info};

use super::pattern::Pattern;
use super::RouteError;
use crate::envelope::Fault;
use crate::invoker::Invoker;
use crate::resource::Resource;

struct Route {
    pattern: Pattern,
    invoker: Arc<dyn Invoker>,
    resource: Arc<Resource>,
}

/// Result of a successful [`Router::resolve`].
#[derive(Clone)]
pub struct Resolved {
    /// Text of the matching pattern.
    pub pattern: String,
    /// Invoker that executes the resource.
    pub invoker: Arc<dyn Invoker>,
    /// Target resource.
    pub resource: Arc<Resource>,
}

impl std::fmt::Debug for Resolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolved")
            .field("pattern", &self.pattern)
            .field("invoker", &self.invoker.kind())
            .field("resource", &self.resource)
            .finish()
    }
}

/// Ordered route table. Lookups scan in order and the first match wins.
///
/// Covering registrations are placed at the front so they shadow whatever
/// they overlap; plain registrations are appended.
#[derive(Default)]
pub struct Router {
    routes: RwLock<Vec<Route>>,
}

impl Router {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `resource` under `pattern`, executed by `invoker`.
    ///
    /// With `cover == false` the call fails if a registered route already
    /// satisfies the pattern: either the same pattern, or one accepting any of
    /// its literal entries. With `cover == true` an identical pattern is
    /// replaced and the new route takes precedence over overlapping ones.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidPattern`] or [`RouteError::Conflict`].
    pub fn register(
        &self,
        pattern: &str,
        invoker: Arc<dyn Invoker>,
        resource: Resource,
        cover: bool,
    ) -> Result<(), RouteError> {
        let pattern = Pattern::parse(pattern)?;
        let mut routes = self.routes.write();

        if cover {
            routes.retain(|r| !r.pattern.same_as(&pattern));
        } else if let Some(existing) = routes.iter().find(|r| {
            r.pattern.same_as(&pattern) || pattern.literals().any(|uri| r.pattern.matches(uri))
        }) {
            return Err(RouteError::Conflict {
                pattern: pattern.to_string(),
                existing: existing.pattern.to_string(),
            });
        }

        info!(
            pattern = %pattern,
            invoker = invoker.kind(),
            resource = resource.kind(),
            cover,
            "Registered route"
        );
        let route = Route {
            pattern,
            invoker,
            resource: Arc::new(resource),
        };
        if cover {
            routes.insert(0, route);
        } else {
            routes.push(route);
        }
        Ok(())
    }

    /// Finds the first route accepting `uri`.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::ResourceNotFound`] when nothing matches.
    pub fn resolve(&self, uri: &str) -> Result<Resolved, Fault> {
        let routes = self.routes.read();
        let route = routes
            .iter()
            .find(|r| r.pattern.matches(uri))
            .ok_or_else(|| Fault::ResourceNotFound(uri.to_string()))?;
        debug!(uri, pattern = %route.pattern, "Resolved route");
        Ok(Resolved {
            pattern: route.pattern.to_string(),
            invoker: Arc::clone(&route.invoker),
            resource: Arc::clone(&route.resource),
        })
    }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.read().len()
    }

    /// Returns `true` when no route is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.read().is_empty()
    }

    /// Registered patterns in lookup order.
    #[must_use]
    pub fn patterns(&self) -> Vec<String> {
        self.routes.read().iter().map(|r| r.pattern.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Channel;
    use crate::content::Content;
    use crate::gateway::Gateway;
    use crate::invoker::LocalInvoker;
    use crate::requester::Requester;
    use crate::resource::handler_fn;
    use serde_json::json;

    fn text_resource(text: &'static str) -> Resource {
        Resource::handler(handler_fn(move |_| async move { Ok::<_, Fault>(Content::text(text)) }))
    }

    fn local() -> Arc<dyn Invoker> {
        Arc::new(LocalInvoker)
    }

    #[test]
    fn second_registration_without_cover_fails() {
        let router = Router::new();
        router.register("/a", local(), text_resource("1"), false).unwrap();
        let err = router
            .register("/a", local(), text_resource("2"), false)
            .unwrap_err();
        assert!(matches!(err, RouteError::Conflict { .. }));
        assert_eq!(router.len(), 1);
    }

    #[test]
    fn wildcard_route_covers_literal_registration() {
        let router = Router::new();
        router.register("/a/*", local(), text_resource("1"), false).unwrap();
        let err = router
            .register("/a/b", local(), text_resource("2"), false)
            .unwrap_err();
        assert_eq!(
            err,
            RouteError::Conflict {
                pattern: "/a/b".into(),
                existing: "/a/*".into()
            }
        );
    }

    #[tokio::test]
    async fn cover_replaces_identical_pattern() {
        let router = Router::new();
        router.register("/a", local(), text_resource("1"), false).unwrap();
        router.register("/a", local(), text_resource("2"), true).unwrap();
        assert_eq!(router.len(), 1);

        let resolved = router.resolve("/a").unwrap();
        let channel = Arc::new(Gateway::new()) as Arc<dyn Channel>;
        let requester = Requester::builder(channel, "/a").build();
        let output = resolved
            .invoker
            .invoke(&resolved.resource, &requester)
            .await
            .unwrap();
        assert_eq!(output.into_json(), json!("2"));
    }

    #[test]
    fn cover_shadows_overlapping_pattern() {
        let router = Router::new();
        router.register("/a/*", local(), text_resource("1"), false).unwrap();
        router.register("/a/b", local(), text_resource("2"), true).unwrap();
        assert_eq!(router.resolve("/a/b").unwrap().pattern, "/a/b");
        assert_eq!(router.resolve("/a/c").unwrap().pattern, "/a/*");
    }

    #[test]
    fn unknown_uri_is_resource_not_found() {
        let router = Router::new();
        let err = router.resolve("/missing").unwrap_err();
        assert!(matches!(err, Fault::ResourceNotFound(uri) if uri == "/missing"));
    }
}
