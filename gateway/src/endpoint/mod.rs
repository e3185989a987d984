//! Remote invocation targets with ordered failover nodes.

pub mod node;

pub use node::{Node, Protocol, ValidationError};

use serde::{Deserialize, Serialize};

/// A remote resource: an ordered list of nodes and an optional uri override.
///
/// Invokers try the nodes in order and stop at the first success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EndpointSpec")]
pub struct Endpoint {
    uri: Option<String>,
    nodes: Vec<Node>,
}

#[derive(Deserialize)]
struct EndpointSpec {
    #[serde(default)]
    uri: Option<String>,
    nodes: Vec<Node>,
}

impl TryFrom<EndpointSpec> for Endpoint {
    type Error = ValidationError;

    fn try_from(spec: EndpointSpec) -> Result<Self, Self::Error> {
        Endpoint::new(spec.uri, spec.nodes)
    }
}

impl Endpoint {
    /// Creates an endpoint.
    ///
    /// # Errors
    /// Returns `ValidationError::NoNodes` when `nodes` is empty.
    pub fn new(uri: Option<String>, nodes: Vec<Node>) -> Result<Self, ValidationError> {
        if nodes.is_empty() {
            return Err(ValidationError::NoNodes);
        }
        let uri = uri.filter(|u| !u.trim().is_empty());
        Ok(Self { uri, nodes })
    }

    /// Endpoint forwarding to a single node under the caller's uri.
    #[must_use]
    pub fn single(node: Node) -> Self {
        Self {
            uri: None,
            nodes: vec![node],
        }
    }

    /// Uri to call on the remote side: the override, else `requested`.
    #[must_use]
    pub fn target_uri<'a>(&'a self, requested: &'a str) -> &'a str {
        self.uri.as_deref().unwrap_or(requested)
    }

    /// Failover candidates in order. Never empty.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}
