//! The external-RPC collaborator every leaf condition reads through.
//!
//! Condition-evaluation backends (chain RPC clients, HTTPS JSON fetchers)
//! are out of scope for this crate — this trait is the boundary:
//! `evaluate(condition, context) -> bool | raise`. `taco-node`'s caller
//! supplies a real implementation, `taco-testkit` supplies an in-memory
//! fake for tests.

use crate::condition::Chain;
use crate::error::ConditionError;
use async_trait::async_trait;
use serde_json::Value;

/// A single leaf read: a chain-scoped RPC call, a contract view-function
/// call, or an arbitrary JSON-RPC/HTTPS read.
#[derive(Debug, Clone)]
pub struct LeafRead {
    /// Chain the read targets, if any (`None` for [`crate::Condition::JsonRpc`]).
    pub chain: Option<Chain>,
    /// Endpoint URL, for [`crate::Condition::JsonRpc`] reads.
    pub endpoint: Option<String>,
    /// Contract address, for [`crate::Condition::Contract`] reads.
    pub address: Option<String>,
    /// Method or ABI entry name.
    pub method: String,
    /// Ordered parameters, with `:`-prefixed free variables already
    /// substituted from the [`crate::EvalContext`].
    pub params: Vec<Value>,
}

/// External collaborator performing the actual chain/HTTPS reads a
/// condition leaf requires. Implementations own retry policy for transient
/// failures; a [`ConditionError::Rpc`] returned here propagates to the
/// caller unchanged — an evaluation error must never be treated as `false`.
#[async_trait]
pub trait ConditionBackend: Send + Sync {
    /// Perform `read` and return the raw value observed, for comparison
    /// against a `return_value_test`.
    async fn read(&self, read: &LeafRead) -> Result<Value, ConditionError>;

    /// The chains this backend is willing to serve reads for. A read whose
    /// chain is not in this list should itself be rejected by the caller
    /// before reaching this trait, via
    /// [`crate::Condition::referenced_chains`] — this accessor exists so
    /// `taco-node` can validate the allow-list once per request rather than
    /// per leaf.
    fn allowed_chains(&self) -> &[Chain];
}
