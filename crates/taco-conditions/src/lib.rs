//! # TACo Conditions — Layer 1: Condition Engine (C1)
//!
//! Evaluates the boolean access-condition tree guarding every node-side
//! re-encryption or decryption-share operation. This crate defines the
//! condition grammar, the evaluation context, and the [`ConditionBackend`]
//! trait through which leaf conditions reach out to chain RPC / HTTPS
//! endpoints — those backends are external collaborators and
//! are not implemented here; `taco-testkit` provides in-memory fakes for
//! tests and `taco-node` is wired to a real implementation by its caller.
//!
//! Evaluation is pure with respect to the supplied [`EvalContext`]: no
//! writes, and every leaf read goes through the caller-supplied backend so
//! the total wall-clock budget can be enforced by wrapping the whole call in
//! a timeout (`taco_node` does this, to keep evaluation bounded in time).

#![forbid(unsafe_code)]

pub mod acp;
pub mod backend;
pub mod condition;
pub mod context;
pub mod error;
pub mod eval;

pub use acp::{hash_ciphertext_header, Acp};
pub use backend::ConditionBackend;
pub use condition::{Chain, Condition, ComparisonOperator, ReturnValueTest};
pub use context::EvalContext;
pub use error::ConditionError;
pub use eval::evaluate;
