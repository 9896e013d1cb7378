//! Condition tree evaluation.
//!
//! Evaluation is pure w.r.t. the supplied context: no writes, and every
//! leaf read goes through the caller's [`ConditionBackend`]. Depth is
//! checked once up front rather than per-recursive-call so a caller gets a
//! single [`ConditionError::DepthExceeded`] rather than one per level.

use crate::backend::{ConditionBackend, LeafRead};
use crate::condition::{Chain, ComparisonOperator, Condition, ReturnValueTest};
use crate::context::EvalContext;
use crate::error::ConditionError;
use serde_json::Value;
use std::cmp::Ordering;

/// Evaluate `condition` against `context` using `backend` for leaf reads.
///
/// Enforces the depth bound and the chain allow-list before recursing, then
/// evaluates as follows: `And`/`Or` short-circuit over ordered
/// children, `Not` negates a boolean result but propagates errors
/// unchanged, `IfThenElse` evaluates the guard then exactly one branch, and
/// `SequentialAccess` threads a context enriched with each prior child's
/// observed value (under key `seq.<index>`) so later children can
/// reference values derived by earlier ones.
pub async fn evaluate(
    condition: &Condition,
    context: &EvalContext,
    backend: &dyn ConditionBackend,
) -> Result<bool, ConditionError> {
    let depth = condition.depth();
    if depth > Condition::MAX_DEPTH {
        return Err(ConditionError::DepthExceeded { max: Condition::MAX_DEPTH, got: depth });
    }
    for chain in condition.referenced_chains() {
        if !backend.allowed_chains().contains(&chain) {
            return Err(ConditionError::UnauthorizedChain(format!("{}", chain.0)));
        }
    }
    evaluate_inner(condition, context, backend).await
}

fn evaluate_inner<'a>(
    condition: &'a Condition,
    context: &'a EvalContext,
    backend: &'a dyn ConditionBackend,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<bool, ConditionError>> + Send + 'a>> {
    Box::pin(async move {
        match condition {
            Condition::Time { chain, return_value_test } => {
                let read = LeafRead {
                    chain: Some(*chain),
                    endpoint: None,
                    address: None,
                    method: "block_timestamp".into(),
                    params: vec![],
                };
                evaluate_leaf(&read, return_value_test, context, backend).await
            }
            Condition::Rpc { chain, method, params, return_value_test } => {
                let read = LeafRead {
                    chain: Some(*chain),
                    endpoint: None,
                    address: None,
                    method: method.clone(),
                    params: substitute_params(params, context)?,
                };
                evaluate_leaf(&read, return_value_test, context, backend).await
            }
            Condition::Contract { chain, address, abi_entry, return_value_test } => {
                let read = LeafRead {
                    chain: Some(*chain),
                    endpoint: None,
                    address: Some(address.clone()),
                    method: abi_entry
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or("call")
                        .to_string(),
                    params: vec![abi_entry.clone()],
                };
                evaluate_leaf(&read, return_value_test, context, backend).await
            }
            Condition::JsonRpc { endpoint, method, params, return_value_test } => {
                let read = LeafRead {
                    chain: None,
                    endpoint: Some(endpoint.clone()),
                    address: None,
                    method: method.clone(),
                    params: substitute_params(params, context)?,
                };
                evaluate_leaf(&read, return_value_test, context, backend).await
            }
            Condition::And(children) => {
                for child in children {
                    if !evaluate_inner(child, context, backend).await? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Condition::Or(children) => {
                for child in children {
                    if evaluate_inner(child, context, backend).await? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Condition::Not(inner) => {
                let result = evaluate_inner(inner, context, backend).await?;
                Ok(!result)
            }
            Condition::IfThenElse { guard, if_true, if_false } => {
                if evaluate_inner(guard, context, backend).await? {
                    evaluate_inner(if_true, context, backend).await
                } else {
                    evaluate_inner(if_false, context, backend).await
                }
            }
            Condition::SequentialAccess(children) => {
                let mut threaded = context.clone();
                for (i, child) in children.iter().enumerate() {
                    let result = evaluate_inner(child, &threaded, backend).await?;
                    if !result {
                        return Ok(false);
                    }
                    threaded.set(format!("seq.{i}"), Value::Bool(result));
                }
                Ok(true)
            }
        }
    })
}

fn substitute_params(params: &[Value], context: &EvalContext) -> Result<Vec<Value>, ConditionError> {
    params
        .iter()
        .map(|p| {
            context
                .resolve(p)
                .cloned()
                .ok_or_else(|| ConditionError::Invalid(format!("unresolved context variable: {p}")))
        })
        .collect()
}

async fn evaluate_leaf(
    read: &LeafRead,
    test: &ReturnValueTest,
    context: &EvalContext,
    backend: &dyn ConditionBackend,
) -> Result<bool, ConditionError> {
    let observed = backend.read(read).await?;
    let observed = match test.index {
        Some(i) => observed
            .get(i)
            .cloned()
            .ok_or_else(|| ConditionError::ReturnValueMismatch(format!("no element at index {i}")))?,
        None => observed,
    };
    let expected = context
        .resolve(&test.value)
        .ok_or_else(|| ConditionError::Invalid(format!("unresolved context variable: {}", test.value)))?;
    compare(&observed, expected, test.comparator)
}

fn compare(observed: &Value, expected: &Value, op: ComparisonOperator) -> Result<bool, ConditionError> {
    if matches!(op, ComparisonOperator::Eq | ComparisonOperator::Ne) {
        let equal = observed == expected;
        return Ok(match op {
            ComparisonOperator::Eq => equal,
            ComparisonOperator::Ne => !equal,
            _ => unreachable!(),
        });
    }
    let ordering = numeric_ordering(observed, expected)?;
    Ok(match op {
        ComparisonOperator::Lt => ordering == Ordering::Less,
        ComparisonOperator::Le => ordering != Ordering::Greater,
        ComparisonOperator::Gt => ordering == Ordering::Greater,
        ComparisonOperator::Ge => ordering != Ordering::Less,
        ComparisonOperator::Eq | ComparisonOperator::Ne => unreachable!(),
    })
}

fn numeric_ordering(observed: &Value, expected: &Value) -> Result<Ordering, ConditionError> {
    let (Some(o), Some(e)) = (observed.as_f64(), expected.as_f64()) else {
        return Err(ConditionError::ReturnValueMismatch(format!(
            "cannot order {observed} against {expected}"
        )));
    };
    o.partial_cmp(&e)
        .ok_or_else(|| ConditionError::ReturnValueMismatch("NaN comparison".into()))
}
