//! The condition grammar: leaves that read external state, and composites
//! that combine them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparators available to a [`ReturnValueTest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOperator {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

/// A comparison applied to the value a leaf condition read from its
/// backend. `value` may contain free variables prefixed `:` (e.g.
/// `:userAddress`), substituted from the [`crate::EvalContext`] before the
/// backend call is issued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnValueTest {
    /// The comparator to apply.
    pub comparator: ComparisonOperator,
    /// The expected value, or a `:`-prefixed context variable reference.
    pub value: Value,
    /// Optional index into a tuple-valued read result.
    pub index: Option<usize>,
}

/// An EVM-style chain identifier a leaf condition is evaluated against.
/// Newtype over the numeric chain id so a node's allow-list
/// (`Vec<Chain>`) can't be confused with an arbitrary integer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Chain(pub u64);

/// A single access condition. Depth is bounded by [`Condition::max_depth`];
/// callers reject trees deeper than their configured limit before
/// evaluating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Condition {
    /// True once `chain`'s current block timestamp satisfies
    /// `return_value_test`.
    Time {
        /// Chain to read the timestamp from.
        chain: Chain,
        /// Test applied to the timestamp.
        return_value_test: ReturnValueTest,
    },
    /// Generic JSON-RPC read (`eth_call`-style) against `chain`.
    Rpc {
        /// Chain to issue the RPC against.
        chain: Chain,
        /// RPC method name.
        method: String,
        /// Ordered RPC parameters.
        params: Vec<Value>,
        /// Test applied to the RPC result.
        return_value_test: ReturnValueTest,
    },
    /// A contract view-function read.
    Contract {
        /// Chain the contract lives on.
        chain: Chain,
        /// Contract address (chain-native encoding, e.g. `0x…`).
        address: String,
        /// ABI entry describing the function to call.
        abi_entry: Value,
        /// Test applied to the call result.
        return_value_test: ReturnValueTest,
    },
    /// A read against an arbitrary JSON-RPC or HTTPS endpoint not tied to a
    /// specific chain (oracle reads).
    JsonRpc {
        /// Endpoint URL.
        endpoint: String,
        /// RPC method name.
        method: String,
        /// Ordered RPC parameters.
        params: Vec<Value>,
        /// Test applied to the result.
        return_value_test: ReturnValueTest,
    },
    /// Logical AND, short-circuiting over ordered children.
    And(Vec<Condition>),
    /// Logical OR, short-circuiting over ordered children.
    Or(Vec<Condition>),
    /// Logical NOT. Negates a boolean result but propagates errors
    /// unchanged.
    Not(Box<Condition>),
    /// Evaluates `guard`, then exactly one of `if_true` / `if_false`.
    IfThenElse {
        /// Guard condition.
        guard: Box<Condition>,
        /// Branch taken when the guard is true.
        if_true: Box<Condition>,
        /// Branch taken when the guard is false.
        if_false: Box<Condition>,
    },
    /// Threads a shared context through children in order, so later
    /// children can reference values derived by earlier ones.
    SequentialAccess(Vec<Condition>),
}

impl Condition {
    /// Maximum nesting depth accepted by [`crate::evaluate`].
    pub const MAX_DEPTH: usize = 16;

    /// Compute this condition tree's nesting depth.
    pub fn depth(&self) -> usize {
        match self {
            Condition::Time { .. }
            | Condition::Rpc { .. }
            | Condition::Contract { .. }
            | Condition::JsonRpc { .. } => 1,
            Condition::Not(inner) => 1 + inner.depth(),
            Condition::And(children) | Condition::Or(children) | Condition::SequentialAccess(children) => {
                1 + children.iter().map(Condition::depth).max().unwrap_or(0)
            }
            Condition::IfThenElse { guard, if_true, if_false } => {
                1 + [guard.depth(), if_true.depth(), if_false.depth()]
                    .into_iter()
                    .max()
                    .unwrap_or(0)
            }
        }
    }

    /// Every chain referenced anywhere in this tree, used to check against
    /// a node's allow-list up front.
    pub fn referenced_chains(&self) -> Vec<Chain> {
        let mut out = Vec::new();
        self.collect_chains(&mut out);
        out
    }

    fn collect_chains(&self, out: &mut Vec<Chain>) {
        match self {
            Condition::Time { chain, .. } | Condition::Contract { chain, .. } | Condition::Rpc { chain, .. } => {
                out.push(*chain);
            }
            Condition::JsonRpc { .. } => {}
            Condition::Not(inner) => inner.collect_chains(out),
            Condition::And(children) | Condition::Or(children) | Condition::SequentialAccess(children) => {
                for c in children {
                    c.collect_chains(out);
                }
            }
            Condition::IfThenElse { guard, if_true, if_false } => {
                guard.collect_chains(out);
                if_true.collect_chains(out);
                if_false.collect_chains(out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(chain: u64) -> Condition {
        Condition::Time {
            chain: Chain(chain),
            return_value_test: ReturnValueTest {
                comparator: ComparisonOperator::Gt,
                value: Value::from(0),
                index: None,
            },
        }
    }

    #[test]
    fn depth_of_leaf_is_one() {
        assert_eq!(leaf(1).depth(), 1);
    }

    #[test]
    fn depth_of_nested_and_is_computed() {
        let tree = Condition::And(vec![leaf(1), Condition::Not(Box::new(leaf(2)))]);
        assert_eq!(tree.depth(), 2);
    }

    #[test]
    fn referenced_chains_collects_from_all_branches() {
        let tree = Condition::IfThenElse {
            guard: Box::new(leaf(1)),
            if_true: Box::new(leaf(2)),
            if_false: Box::new(leaf(3)),
        };
        let chains = tree.referenced_chains();
        assert_eq!(chains, vec![Chain(1), Chain(2), Chain(3)]);
    }
}
