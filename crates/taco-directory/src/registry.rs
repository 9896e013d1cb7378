//! The external collaborator that confirms on-chain operator bonding.
//!
//! Whether a staking provider's operator key really authorized a node's
//! identity key lives on-chain; this crate only consumes the answer.

use async_trait::async_trait;

/// Confirms that `operator_verifying_key` was bonded to
/// `staking_provider_address` at the time a node's metadata was learned.
#[async_trait]
pub trait OperatorRegistry: Send + Sync {
    /// Returns `Ok(true)` if the bonding holds, `Ok(false)` if it was
    /// checked and does not, and `Err` if the check itself could not be
    /// completed (e.g. the provider's chain RPC is unreachable).
    async fn is_bonded(
        &self,
        staking_provider_address: &str,
        operator_verifying_key: &[u8],
    ) -> Result<bool, String>;
}
