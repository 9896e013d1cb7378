//! This node's material for each DKG ritual it participates in.
//!
//! The ceremony that produces this material runs entirely outside this
//! crate; `RitualStore` just holds the result so `/decrypt` has something
//! to derive a share from.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use taco_core::RitualId;
use taco_crypto::dkg::RitualPublicKey;
use threshold_crypto::SecretKeyShare;

/// One ritual's local material: the ritual's public key set plus this
/// node's own secret share and its index within the cohort.
#[derive(Clone)]
pub struct RitualMaterial {
    /// Public material, shared by every ritual participant.
    pub public_key: RitualPublicKey,
    /// This node's secret share.
    pub secret_share: SecretKeyShare,
    /// This node's index within the ritual's cohort.
    pub share_index: usize,
}

/// Thread-safe store of this node's ritual material, keyed by ritual id.
#[derive(Default)]
pub struct RitualStore {
    rituals: RwLock<BTreeMap<RitualId, RitualMaterial>>,
}

impl RitualStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install material for a ritual this node has just finished the
    /// ceremony for.
    pub fn insert(&self, ritual_id: RitualId, material: RitualMaterial) {
        self.rituals.write().insert(ritual_id, material);
    }

    /// Look up material for an active ritual.
    pub fn get(&self, ritual_id: RitualId) -> Option<RitualMaterial> {
        self.rituals.read().get(&ritual_id).cloned()
    }
}
