//! Uri routing to (invoker, resource) pairs.

pub mod pattern;
pub mod router;

pub use pattern::{Pattern, PatternTable};
pub use router::{Resolved, Router};

/// Configuration faults raised while building routes and tables.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    /// The pattern text cannot be compiled.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    /// Another route already covers the pattern and `cover` was not set.
    #[error("Pattern '{pattern}' is already covered by '{existing}'")]
    Conflict {
        /// Pattern being registered.
        pattern: String,
        /// Registered pattern that already satisfies it.
        existing: String,
    },
}
