//! Evaluation context threaded through a condition tree.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Context available to condition evaluation: the protocol identifiers
/// every request carries, plus user-supplied custom parameters. Free
/// variables in a `return_value_test`'s expected value (prefixed `:`) are
/// substituted from here before the backend call is issued.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvalContext {
    values: BTreeMap<String, Value>,
}

impl EvalContext {
    /// Start a context with the requester's verifying-key-derived address.
    pub fn with_user_address(user_address: impl Into<String>) -> Self {
        let mut ctx = Self::default();
        ctx.set("userAddress", Value::String(user_address.into()));
        ctx
    }

    /// Set a context variable (without the leading `:`).
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Look up a context variable by name (without the leading `:`).
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Resolve a `return_value_test` value: if it is a string beginning
    /// with `:`, substitute the named context variable; otherwise return it
    /// unchanged.
    pub fn resolve<'a>(&'a self, value: &'a Value) -> Option<&'a Value> {
        match value {
            Value::String(s) if s.starts_with(':') => self.get(&s[1..]),
            other => Some(other),
        }
    }
}
