//! Addressable failover candidate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error type for endpoint and node validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The node host is empty or contains only whitespace.
    #[error("Node host cannot be empty")]
    EmptyHost,
    /// Port zero is not addressable.
    #[error("Node port must be at least 1")]
    InvalidPort,
    /// The protocol is not one the invokers speak.
    #[error("Unsupported node protocol: {0}")]
    UnsupportedProtocol(String),
    /// An endpoint needs at least one node.
    #[error("Endpoint must list at least one node")]
    NoNodes,
}

/// Wire protocol spoken by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Plain HTTP (also used for gRPC over cleartext HTTP/2).
    Http,
    /// HTTP over TLS.
    Https,
}

impl Protocol {
    /// URL scheme.
    #[must_use]
    pub const fn scheme(self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

impl std::str::FromStr for Protocol {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" | "grpc" | "tcp" => Ok(Protocol::Http),
            "https" | "grpcs" | "ssl" => Ok(Protocol::Https),
            other => Err(ValidationError::UnsupportedProtocol(other.to_string())),
        }
    }
}

/// A single host/port a call can be sent to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "NodeSpec")]
pub struct Node {
    protocol: Protocol,
    host: String,
    port: u16,
}

#[derive(Deserialize)]
struct NodeSpec {
    #[serde(default = "default_protocol")]
    protocol: String,
    host: String,
    port: u16,
}

fn default_protocol() -> String {
    "http".to_string()
}

impl TryFrom<NodeSpec> for Node {
    type Error = ValidationError;

    fn try_from(spec: NodeSpec) -> Result<Self, Self::Error> {
        Node::new(spec.protocol.parse()?, &spec.host, spec.port)
    }
}

impl Node {
    /// Creates a validated node.
    ///
    /// # Errors
    /// Returns `ValidationError::EmptyHost` for a blank host and
    /// `ValidationError::InvalidPort` for port zero.
    pub fn new(protocol: Protocol, host: &str, port: u16) -> Result<Self, ValidationError> {
        let host = host.trim();
        if host.is_empty() {
            return Err(ValidationError::EmptyHost);
        }
        if port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(Self {
            protocol,
            host: host.to_string(),
            port,
        })
    }

    /// Shorthand for an HTTP node.
    ///
    /// # Errors
    /// Same as [`Node::new`].
    pub fn http(host: &str, port: u16) -> Result<Self, ValidationError> {
        Self::new(Protocol::Http, host, port)
    }

    /// Protocol spoken by the node.
    #[must_use]
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Host name or address.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base URL without trailing slash, e.g. `http://10.0.0.1:8080`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol.scheme(), self.host, self.port)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
