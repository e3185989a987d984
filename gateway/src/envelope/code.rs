//! Closed taxonomy of envelope codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome category carried by every [`Envelope`](super::Envelope).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Code {
    /// The call completed and `content` holds its result.
    Success,
    /// Unclassified failure inside the resource or the gateway.
    GenericFailure,
    /// The invocation itself could not be carried out (transport, stream lookup).
    InvocationFault,
    /// The caller is not allowed to reach the resource.
    AccessDenied,
    /// The propagated token was rejected.
    InvalidToken,
    /// The request could not be routed or decoded.
    RequestHandlingFault,
    /// A parameter was missing or malformed; `content` names it.
    InvalidParameter,
}

impl Code {
    /// Every code, in declaration order.
    pub const ALL: [Code; 7] = [
        Code::Success,
        Code::GenericFailure,
        Code::InvocationFault,
        Code::AccessDenied,
        Code::InvalidToken,
        Code::RequestHandlingFault,
        Code::InvalidParameter,
    ];

    /// Stable label used for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Code::Success => "success",
            Code::GenericFailure => "generic_failure",
            Code::InvocationFault => "invocation_fault",
            Code::AccessDenied => "access_denied",
            Code::InvalidToken => "invalid_token",
            Code::RequestHandlingFault => "request_handling_fault",
            Code::InvalidParameter => "invalid_parameter",
        }
    }

    /// Returns `true` for [`Code::Success`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Code::Success)
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
