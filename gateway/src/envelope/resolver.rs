//! Ordered chain of fault resolvers.
//!
//! A resolver may claim a fault before generic classification and substitute
//! its own code and message. The first resolver that answers wins.

use std::marker::PhantomData;
use std::sync::Arc;

use super::{Code, Envelope, Fault};

/// Replacement code and message chosen by a [`FaultResolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Code to report instead of the fault's own category.
    pub code: Code,
    /// Message to report instead of the fault's display text.
    pub message: String,
}

/// Strategy that can remap a fault to a custom code and message.
pub trait FaultResolver: Send + Sync {
    /// Returns `Some` to claim the fault.
    fn resolve(&self, fault: &Fault) -> Option<Resolution>;
}

impl<F> FaultResolver for F
where
    F: Fn(&Fault) -> Option<Resolution> + Send + Sync,
{
    fn resolve(&self, fault: &Fault) -> Option<Resolution> {
        self(fault)
    }
}

/// Claims [`Fault::Internal`] errors whose source downcasts to `E`.
pub struct DowncastResolver<E> {
    code: Code,
    message: Option<String>,
    _error: PhantomData<fn() -> E>,
}

impl<E> DowncastResolver<E> {
    /// Maps errors of type `E` to `code`, keeping their display text.
    #[must_use]
    pub fn new(code: Code) -> Self {
        Self {
            code,
            message: None,
            _error: PhantomData,
        }
    }

    /// Replaces the display text with a fixed message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<E> FaultResolver for DowncastResolver<E>
where
    E: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
{
    fn resolve(&self, fault: &Fault) -> Option<Resolution> {
        let Fault::Internal(err) = fault else {
            return None;
        };
        let source = err.downcast_ref::<E>()?;
        Some(Resolution {
            code: self.code,
            message: self
                .message
                .clone()
                .unwrap_or_else(|| source.to_string()),
        })
    }
}

/// Ordered list of resolvers consulted when a fault becomes an envelope.
#[derive(Clone, Default)]
pub struct ResolverChain {
    resolvers: Vec<Arc<dyn FaultResolver>>,
}

impl ResolverChain {
    /// Creates an empty chain; every fault keeps its own category.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a resolver. Earlier resolvers take precedence.
    pub fn push<R: FaultResolver + 'static>(&mut self, resolver: R) {
        self.resolvers.push(Arc::new(resolver));
    }

    /// Number of registered resolvers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    /// Returns `true` when no resolver is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Wraps a fault, letting the first matching resolver override it.
    #[must_use]
    pub fn envelope(&self, fault: &Fault) -> Envelope {
        let resolved = self.resolvers.iter().find_map(|r| r.resolve(fault));
        match resolved {
            Some(Resolution { code, message }) => {
                let content = match (code, fault.parameter()) {
                    (Code::InvalidParameter, Some(name)) => serde_json::Value::from(name),
                    _ => serde_json::Value::Null,
                };
                Envelope {
                    code,
                    error: Some(message),
                    content,
                }
            }
            None => Envelope::from_fault(fault),
        }
    }
}

impl std::fmt::Debug for ResolverChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverChain")
            .field("resolvers", &self.resolvers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("quota exhausted for {0}")]
    struct QuotaError(String);

    #[test]
    fn unresolved_fault_keeps_its_category() {
        let chain = ResolverChain::new();
        let env = chain.envelope(&Fault::AccessDenied("nope".into()));
        assert_eq!(env.code, Code::AccessDenied);
        assert_eq!(env.error.as_deref(), Some("nope"));
    }

    #[test]
    fn downcast_resolver_claims_typed_internal_errors() {
        let mut chain = ResolverChain::new();
        chain.push(DowncastResolver::<QuotaError>::new(Code::AccessDenied));

        let fault = Fault::Internal(QuotaError("alice".into()).into());
        let env = chain.envelope(&fault);
        assert_eq!(env.code, Code::AccessDenied);
        assert_eq!(env.error.as_deref(), Some("quota exhausted for alice"));

        let other = chain.envelope(&Fault::Internal(anyhow::anyhow!("boom")));
        assert_eq!(other.code, Code::GenericFailure);
    }

    #[test]
    fn first_matching_resolver_wins() {
        let mut chain = ResolverChain::new();
        chain.push(|fault: &Fault| {
            matches!(fault, Fault::Invocation(_)).then(|| Resolution {
                code: Code::GenericFailure,
                message: "first".into(),
            })
        });
        chain.push(|_: &Fault| {
            Some(Resolution {
                code: Code::AccessDenied,
                message: "second".into(),
            })
        });

        let env = chain.envelope(&Fault::Invocation("x".into()));
        assert_eq!(env.error.as_deref(), Some("first"));

        let env = chain.envelope(&Fault::Generic("y".into()));
        assert_eq!(env.code, Code::AccessDenied);
        assert_eq!(env.error.as_deref(), Some("second"));
    }
}
