//! The external collaborator that confirms a policy has been paid for.
//!
//! Whether a policy's HRAC has an active subscription or on-chain payment
//! backing it is a payments/staking-layer concern; this crate only asks.

use async_trait::async_trait;
use taco_core::Hrac;

/// Confirms payment for a policy before a node serves `/reencrypt` or
/// `/decrypt` for it.
#[async_trait]
pub trait PaymentBackend: Send + Sync {
    /// Returns `Ok(true)` if `hrac` is currently paid for.
    async fn is_paid(&self, hrac: &Hrac) -> Result<bool, String>;
}

/// A backend that treats every policy as paid. Useful for domains where
/// payment enforcement is handled upstream (e.g. a private deployment) and
/// for tests.
pub struct AlwaysPaid;

#[async_trait]
impl PaymentBackend for AlwaysPaid {
    async fn is_paid(&self, _hrac: &Hrac) -> Result<bool, String> {
        Ok(true)
    }
}
