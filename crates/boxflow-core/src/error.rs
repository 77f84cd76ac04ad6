//! Error type for box construction, composition and flattening.

use thiserror::Error;

use crate::arity::Arity;
use crate::node::BoxId;

/// Errors reported by [`Session`](crate::Session) operations.
///
/// Every variant is a value returned to the caller; nothing in the engine
/// panics on malformed input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoxError {
    /// A composition legality rule was violated.
    #[error("{op}: cannot compose {left} with {right}: {rule}")]
    ArityMismatch {
        /// Operator or constructor name.
        op: &'static str,
        /// The rule that failed, e.g. `outputs(A) == inputs(B)`.
        rule: &'static str,
        /// Arity of the left operand.
        left: Arity,
        /// Arity of the right operand (or the expected arity for parameters).
        right: Arity,
    },

    /// A feedback loop does not accumulate at least one sample of delay.
    #[error("unresolvable recursion in {var}: feedback path delay may drop to {delay} sample(s)")]
    UnresolvableRecursion {
        /// Name of the recursion variable.
        var: String,
        /// Lower bound of the loop delay, rendered (`-inf` when unbounded).
        delay: String,
    },

    /// `flatten` was called on a box that still has open inputs.
    #[error("cannot flatten a box with {inputs} unconnected input(s)")]
    OpenInput {
        /// Number of open inputs.
        inputs: usize,
    },

    /// Internal inconsistency that construction-time checks should have
    /// prevented.
    #[error("malformed graph: {0}")]
    MalformedGraph(String),

    /// Box nesting exceeds the session's
    /// [`max_depth`](crate::SessionOptions::max_depth) resource limit.
    #[error("box nesting exceeds the limit of {limit} levels")]
    DepthLimitExceeded {
        /// The configured limit.
        limit: usize,
    },

    /// A session is already live on this thread.
    #[error("a compilation context is already active on this thread")]
    ContextAlreadyActive,

    /// No session is live on this thread.
    #[error("no active compilation context")]
    NoActiveContext,

    /// The box belongs to another (or an already destroyed) session.
    #[error("{0} does not belong to this compilation context")]
    StaleBox(BoxId),

    /// A route descriptor is not valid.
    #[error("invalid route: {0}")]
    InvalidRoute(String),

    /// A parameter that must be a constant numerical expression is not.
    #[error("{op}: {what} must be a constant numerical expression")]
    NotConstant {
        /// Constructor name.
        op: &'static str,
        /// Which parameter.
        what: &'static str,
    },
}

impl BoxError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedGraph(msg.into())
    }
}
