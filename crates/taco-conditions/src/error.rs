//! Condition Engine failure classes.

/// Errors the condition engine can raise. The split matters for
/// propagation: [`ConditionError::Invalid`], [`ConditionError::ReturnValueMismatch`],
/// and [`ConditionError::UnauthorizedChain`] are permanent (fail the whole
/// request); [`ConditionError::Rpc`] is transient and must not be silently
/// downgraded to "condition is false" by a caller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConditionError {
    /// Structural or schema error in the condition tree itself.
    #[error("invalid condition: {0}")]
    Invalid(String),

    /// A backend RPC/HTTP call failed. Transient; caller's concern to
    /// retry, never treated as a `false` evaluation result.
    #[error("backend RPC error: {0}")]
    Rpc(String),

    /// A `return_value_test` compared values of incompatible types.
    #[error("return value mismatch: {0}")]
    ReturnValueMismatch(String),

    /// A leaf condition referenced a chain outside the node's allow-list.
    #[error("unauthorized chain: {0}")]
    UnauthorizedChain(String),

    /// The condition tree exceeded the maximum nesting depth.
    #[error("condition depth exceeded: max {max}, got {got}")]
    DepthExceeded {
        /// Configured maximum depth.
        max: usize,
        /// Depth actually observed.
        got: usize,
    },

    /// Evaluation exceeded its wall-clock budget.
    #[error("condition evaluation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl ConditionError {
    /// `true` for failure classes that are permanent — fail the whole
    /// request rather than being worth a retry.
    pub fn is_permanent(&self) -> bool {
        !matches!(self, ConditionError::Rpc(_) | ConditionError::Timeout(_))
    }
}
