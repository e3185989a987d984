//! Fault type raised while dispatching a resource.

use super::code::Code;

/// Faults raised by routing, invokers, resources and the streaming protocol.
///
/// Every variant maps onto exactly one [`Code`]; [`Fault::from_code`] is the
/// inverse used when a fault crosses a process boundary inside an envelope.
#[derive(Debug, thiserror::Error)]
pub enum Fault {
    /// Unclassified failure with a message.
    #[error("{0}")]
    Generic(String),
    /// The invocation could not be carried out.
    #[error("{0}")]
    Invocation(String),
    /// The caller may not reach the resource.
    #[error("{0}")]
    AccessDenied(String),
    /// The propagated token was rejected.
    #[error("{0}")]
    InvalidToken(String),
    /// The request could not be handled (decoding, routing).
    #[error("{0}")]
    RequestHandling(String),
    /// A parameter was missing or malformed.
    #[error("{message}")]
    InvalidParameter {
        /// Name of the offending parameter.
        name: String,
        /// Human readable reason.
        message: String,
    },
    /// No registered pattern accepts the uri.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),
    /// The stream id is unknown, fully consumed, or was evicted.
    #[error("stream does not exist: {0}")]
    StreamNotFound(String),
    /// Opaque error bubbling out of a resource handler.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl Fault {
    /// Builds an [`Fault::InvalidParameter`].
    pub fn invalid_parameter(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Builds a [`Fault::Invocation`] from anything displayable.
    pub fn invocation(message: impl std::fmt::Display) -> Self {
        Self::Invocation(message.to_string())
    }

    /// Category of this fault in the closed taxonomy.
    #[must_use]
    pub fn code(&self) -> Code {
        match self {
            Self::Generic(_) | Self::Internal(_) => Code::GenericFailure,
            Self::Invocation(_) | Self::StreamNotFound(_) => Code::InvocationFault,
            Self::AccessDenied(_) => Code::AccessDenied,
            Self::InvalidToken(_) => Code::InvalidToken,
            Self::RequestHandling(_) | Self::ResourceNotFound(_) => Code::RequestHandlingFault,
            Self::InvalidParameter { .. } => Code::InvalidParameter,
        }
    }

    /// Parameter name for [`Fault::InvalidParameter`], `None` otherwise.
    #[must_use]
    pub fn parameter(&self) -> Option<&str> {
        match self {
            Self::InvalidParameter { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Rebuilds a fault of the category named by `code`.
    ///
    /// `parameter` is only consulted for [`Code::InvalidParameter`].
    /// [`Code::Success`] has no fault counterpart and degrades to
    /// [`Fault::Generic`].
    #[must_use]
    pub fn from_code(code: Code, message: String, parameter: Option<String>) -> Self {
        match code {
            Code::Success | Code::GenericFailure => Self::Generic(message),
            Code::InvocationFault => Self::Invocation(message),
            Code::AccessDenied => Self::AccessDenied(message),
            Code::InvalidToken => Self::InvalidToken(message),
            Code::RequestHandlingFault => Self::RequestHandling(message),
            Code::InvalidParameter => Self::InvalidParameter {
                name: parameter.unwrap_or_default(),
                message,
            },
        }
    }
}

impl From<std::io::Error> for Fault {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.into())
    }
}
