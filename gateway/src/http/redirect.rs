//! Post-invocation redirect strategies.

use crate::content::Content;
use crate::envelope::{Code, Fault};
use crate::requester::Requester;
use crate::routing::{Pattern, RouteError};

/// Decides whether a finished call answers with a redirect instead of a body.
///
/// A target containing `.` names a template rendered as the body; anything
/// else is sent as an HTTP redirect below the context path.
pub trait Redirector: Send + Sync {
    /// Returns the redirect target, or `None` to pass.
    fn redirect(&self, requester: &Requester, result: &Result<Content, Fault>) -> Option<String>;
}

impl<F> Redirector for F
where
    F: Fn(&Requester, &Result<Content, Fault>) -> Option<String> + Send + Sync,
{
    fn redirect(&self, requester: &Requester, result: &Result<Content, Fault>) -> Option<String> {
        self(requester, result)
    }
}

/// Redirects failed calls, optionally only those of one code.
#[derive(Debug, Clone)]
pub struct FaultRedirector {
    code: Option<Code>,
    target: String,
}

impl FaultRedirector {
    /// Redirects every fault to `target`.
    pub fn any(target: impl Into<String>) -> Self {
        Self {
            code: None,
            target: target.into(),
        }
    }

    /// Redirects faults of `code` to `target`.
    pub fn on(code: Code, target: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            target: target.into(),
        }
    }
}

impl Redirector for FaultRedirector {
    fn redirect(&self, _requester: &Requester, result: &Result<Content, Fault>) -> Option<String> {
        let fault = result.as_ref().err()?;
        match self.code {
            Some(code) if code != fault.code() => None,
            _ => Some(self.target.clone()),
        }
    }
}

/// Redirects successful calls whose uri matches a pattern.
#[derive(Debug, Clone)]
pub struct SuccessRedirector {
    pattern: Pattern,
    target: String,
}

impl SuccessRedirector {
    /// Redirects successful calls to uris accepted by `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidPattern`] for a malformed pattern.
    pub fn new(pattern: &str, target: impl Into<String>) -> Result<Self, RouteError> {
        Ok(Self {
            pattern: Pattern::parse(pattern)?,
            target: target.into(),
        })
    }
}

impl Redirector for SuccessRedirector {
    fn redirect(&self, requester: &Requester, result: &Result<Content, Fault>) -> Option<String> {
        (result.is_ok() && self.pattern.matches(requester.uri())).then(|| self.target.clone())
    }
}
