//! Statically configured forwarding routes.

use serde::Deserialize;

use crate::endpoint::Endpoint;

/// Which forwarding invoker a configured route uses.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ForwardKind {
    /// Forward over HTTP to another gateway's HTTP channel.
    Http,
    /// Forward over the gRPC remote channel.
    Remote,
}

/// One forwarding route: pattern, invoker kind and target endpoint.
#[derive(Debug, Deserialize, Clone)]
pub struct ForwardSettings {
    /// Uri pattern to register.
    pub pattern: String,
    /// Invoker used for the route.
    pub kind: ForwardKind,
    /// Target nodes and optional uri override.
    pub endpoint: Endpoint,
    /// Replace overlapping routes instead of failing.
    #[serde(default)]
    pub cover: bool,
}
