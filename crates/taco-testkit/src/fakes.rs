//! In-memory stand-ins for the external collaborators every layer of this
//! workspace reaches through a trait instead of calling directly.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeSet;
use taco_conditions::backend::LeafRead;
use taco_conditions::{Chain, ConditionBackend, ConditionError};
use taco_core::Hrac;
use taco_directory::OperatorRegistry;
use taco_node::PaymentBackend;

/// A condition backend that returns the same observed value for every leaf
/// read, restricted to a fixed chain allow-list. Good enough to express
/// "always true" / "always false" conditions in scenario tests without a
/// real RPC client.
pub struct FakeConditionBackend {
    value: Value,
    allowed: Vec<Chain>,
}

impl FakeConditionBackend {
    /// A backend that answers every leaf read with `value`, accepting reads
    /// against any of `allowed`.
    pub fn new(value: Value, allowed: Vec<Chain>) -> Self {
        Self { value, allowed }
    }

    /// A backend tuned to satisfy a `Time { return_value_test: { ">", 0 } }`
    /// style "always true" condition on `chain`.
    pub fn always_true(chain: Chain) -> Self {
        Self::new(Value::from(i64::MAX), vec![chain])
    }

    /// A backend tuned to fail a `Time { return_value_test: { ">", ... } }`
    /// style condition: it reports a timestamp of zero, which fails any
    /// `Gt`/`Ge` test against a positive value.
    pub fn always_false(chain: Chain) -> Self {
        Self::new(Value::from(0), vec![chain])
    }
}

#[async_trait]
impl ConditionBackend for FakeConditionBackend {
    async fn read(&self, _read: &LeafRead) -> Result<Value, ConditionError> {
        Ok(self.value.clone())
    }

    fn allowed_chains(&self) -> &[Chain] {
        &self.allowed
    }
}

/// A payment backend whose answer is configured per-HRAC up front, so tests
/// can exercise the unpaid-policy path without a real payments integration.
#[derive(Default)]
pub struct FakePaymentBackend {
    unpaid: RwLock<BTreeSet<Hrac>>,
}

impl FakePaymentBackend {
    /// Every policy is paid by default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `hrac` as unpaid from now on.
    pub fn mark_unpaid(&self, hrac: Hrac) {
        self.unpaid.write().insert(hrac);
    }
}

#[async_trait]
impl PaymentBackend for FakePaymentBackend {
    async fn is_paid(&self, hrac: &Hrac) -> Result<bool, String> {
        Ok(!self.unpaid.read().contains(hrac))
    }
}

/// A staking/operator registry backed by a fixed allow-list of
/// `(staking_provider_address, operator_verifying_key)` pairs, instead of a
/// real on-chain bonding lookup.
#[derive(Default)]
pub struct FakeStakingRegistry {
    bonded: RwLock<BTreeSet<(String, Vec<u8>)>>,
}

impl FakeStakingRegistry {
    /// No bonded operators.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bond `operator_verifying_key` to `staking_provider_address`.
    pub fn bond(&self, staking_provider_address: impl Into<String>, operator_verifying_key: &[u8]) {
        self.bonded.write().insert((staking_provider_address.into(), operator_verifying_key.to_vec()));
    }
}

#[async_trait]
impl OperatorRegistry for FakeStakingRegistry {
    async fn is_bonded(&self, staking_provider_address: &str, operator_verifying_key: &[u8]) -> Result<bool, String> {
        Ok(self.bonded.read().contains(&(staking_provider_address.to_string(), operator_verifying_key.to_vec())))
    }
}

/// A registry that treats every node as bonded, for tests that don't care
/// about the bonding gate at all.
pub struct AlwaysBondedRegistry;

#[async_trait]
impl OperatorRegistry for AlwaysBondedRegistry {
    async fn is_bonded(&self, _staking_provider_address: &str, _operator_verifying_key: &[u8]) -> Result<bool, String> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_payment_backend_defaults_to_paid_then_honors_mark_unpaid() {
        let backend = FakePaymentBackend::new();
        let hrac = Hrac::derive(b"a", b"b", b"c");
        assert!(backend.is_paid(&hrac).await.unwrap());
        backend.mark_unpaid(hrac);
        assert!(!backend.is_paid(&hrac).await.unwrap());
    }

    #[tokio::test]
    async fn fake_staking_registry_only_knows_bonded_pairs() {
        let registry = FakeStakingRegistry::new();
        assert!(!registry.is_bonded("0xabc", b"key").await.unwrap());
        registry.bond("0xabc", b"key");
        assert!(registry.is_bonded("0xabc", b"key").await.unwrap());
    }
}
