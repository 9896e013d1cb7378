//! The peer directory itself.

use crate::error::DirectoryError;
use crate::registry::OperatorRegistry;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use taco_core::identifiers::NodeId;
use taco_core::metadata::{FleetStateChecksum, NodeMetadata};
use taco_crypto::signing::verify_from_bytes;

/// An immutable view of the directory at one point in time. Cheap to clone
/// (it's an `Arc` underneath via [`PeerDirectory::snapshot`]); readers hold
/// one for as long as they need a consistent view, with no lock contention
/// against concurrent writers.
#[derive(Debug, Clone, Default)]
pub struct DirectorySnapshot {
    /// Nodes whose operator bonding has been confirmed.
    pub verified: BTreeMap<NodeId, NodeMetadata>,
    /// Nodes we've heard about but not yet confirmed bonding for.
    pub sprout: BTreeMap<NodeId, NodeMetadata>,
    /// Checksum over `verified`, per [`FleetStateChecksum::from_sorted_hashes`].
    pub checksum: FleetStateChecksum,
}

impl DirectorySnapshot {
    fn recompute_checksum(&mut self) {
        let mut hashes: Vec<[u8; 32]> = self.verified.values().map(NodeMetadata::metadata_hash).collect();
        hashes.sort();
        self.checksum = FleetStateChecksum::from_sorted_hashes(&hashes);
    }
}

/// What a single [`PeerDirectory::learn`] call did with one offered record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LearnOutcome {
    /// Accepted into the verified set (bonding confirmed).
    Verified,
    /// Accepted into the sprout set; bonding not yet confirmed.
    Sprouted,
    /// Rejected, with the reason attached to the returned error instead.
    Rejected,
}

/// The peer directory for one running node.
pub struct PeerDirectory {
    self_id: NodeId,
    snapshot: RwLock<Arc<DirectorySnapshot>>,
}

impl PeerDirectory {
    /// Start an empty directory for a node identified by `self_id` — its
    /// own metadata is never accepted back from a peer (see [`Self::learn`]).
    pub fn new(self_id: NodeId) -> Self {
        Self { self_id, snapshot: RwLock::new(Arc::new(DirectorySnapshot::default())) }
    }

    /// A cheap, consistent snapshot of the current directory state.
    pub fn snapshot(&self) -> Arc<DirectorySnapshot> {
        self.snapshot.read().clone()
    }

    /// Consider one peer-offered record, verifying self-signature,
    /// freshness, and (if not already verified) operator bonding, then
    /// folding it into the directory if it survives.
    ///
    /// Gossip only ever moves a node's record forward in time: an offered
    /// record whose timestamp is not strictly greater than the one already
    /// on file is rejected outright, even if its content is identical —
    /// this is what lets two directories that already agree skip doing any
    /// work on a replay of the same gossip round.
    #[tracing::instrument(skip(self, candidate, registry), fields(node_id = %candidate.node_id()))]
    pub async fn learn(
        &self,
        candidate: NodeMetadata,
        registry: &dyn OperatorRegistry,
    ) -> Result<LearnOutcome, DirectoryError> {
        let node_id = candidate.node_id();

        if node_id == self.self_id {
            tracing::warn!("peer attempted to teach us our own metadata");
            return Err(DirectoryError::SelfMetadataRejected);
        }

        if !verify_from_bytes(&candidate.verifying_key, &candidate.signing_payload(), &candidate.self_signature) {
            return Err(DirectoryError::SelfSignatureInvalid { node_id: node_id.to_hex() });
        }

        {
            let current = self.snapshot.read().clone();
            let existing = current.verified.get(&node_id).or_else(|| current.sprout.get(&node_id));
            if let Some(existing) = existing {
                if candidate.timestamp <= existing.timestamp {
                    return Err(DirectoryError::StaleMetadata {
                        node_id: node_id.to_hex(),
                        offered: candidate.timestamp,
                        known: existing.timestamp,
                    });
                }
            }
        }

        let bonded = registry
            .is_bonded(&candidate.staking_provider_address, &candidate.verifying_key)
            .await
            .map_err(DirectoryError::RegistryUnavailable)?;

        if !bonded {
            let mut next = (*self.snapshot.read().clone()).clone();
            next.sprout.insert(node_id, candidate);
            *self.snapshot.write() = Arc::new(next);
            tracing::debug!("sprouted unbonded node");
            return Ok(LearnOutcome::Sprouted);
        }

        let mut next = (*self.snapshot.read().clone()).clone();
        next.sprout.remove(&node_id);
        next.verified.insert(node_id, candidate);
        next.recompute_checksum();
        *self.snapshot.write() = Arc::new(next);
        tracing::info!("learned verified node");
        Ok(LearnOutcome::Verified)
    }

    /// Our own node id, for rejecting self-metadata in [`Self::learn`].
    pub fn self_id(&self) -> NodeId {
        self.self_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use taco_crypto::signing::Identity;

    struct AlwaysBonded;
    #[async_trait]
    impl OperatorRegistry for AlwaysBonded {
        async fn is_bonded(&self, _addr: &str, _key: &[u8]) -> Result<bool, String> {
            Ok(true)
        }
    }

    struct NeverBonded;
    #[async_trait]
    impl OperatorRegistry for NeverBonded {
        async fn is_bonded(&self, _addr: &str, _key: &[u8]) -> Result<bool, String> {
            Ok(false)
        }
    }

    fn signed_metadata(identity: &Identity, host: &str, timestamp: u64) -> NodeMetadata {
        let mut m = NodeMetadata {
            host: host.into(),
            port: 9151,
            verifying_key: identity.verifying_key().to_bytes().to_vec(),
            encrypting_key: vec![1, 2, 3],
            ferveo_public_key: vec![4, 5, 6],
            tls_der: vec![7, 8],
            timestamp,
            self_signature: vec![],
            operator_signature: vec![],
            staking_provider_address: "0xprovider".into(),
            domain: "lynx".into(),
        };
        m.self_signature = identity.sign(&m.signing_payload()).to_bytes().to_vec();
        m
    }

    #[tokio::test]
    async fn bonded_node_is_accepted_as_verified() {
        let directory = PeerDirectory::new(NodeId([0xFF; 20]));
        let identity = Identity::generate();
        let metadata = signed_metadata(&identity, "ursula1.example", 100);

        let outcome = directory.learn(metadata.clone(), &AlwaysBonded).await.unwrap();
        assert_eq!(outcome, LearnOutcome::Verified);
        assert!(directory.snapshot().verified.contains_key(&metadata.node_id()));
    }

    #[tokio::test]
    async fn unbonded_node_is_sprouted_not_verified() {
        let directory = PeerDirectory::new(NodeId([0xFF; 20]));
        let identity = Identity::generate();
        let metadata = signed_metadata(&identity, "ursula1.example", 100);

        let outcome = directory.learn(metadata.clone(), &NeverBonded).await.unwrap();
        assert_eq!(outcome, LearnOutcome::Sprouted);
        let snapshot = directory.snapshot();
        assert!(snapshot.sprout.contains_key(&metadata.node_id()));
        assert!(!snapshot.verified.contains_key(&metadata.node_id()));
    }

    #[tokio::test]
    async fn self_metadata_from_a_peer_is_rejected() {
        let identity = Identity::generate();
        let metadata = signed_metadata(&identity, "ursula1.example", 100);
        let directory = PeerDirectory::new(metadata.node_id());

        let err = directory.learn(metadata, &AlwaysBonded).await.unwrap_err();
        assert!(matches!(err, DirectoryError::SelfMetadataRejected));
    }

    #[tokio::test]
    async fn stale_record_does_not_overwrite_a_newer_one() {
        let directory = PeerDirectory::new(NodeId([0xFF; 20]));
        let identity = Identity::generate();
        let newer = signed_metadata(&identity, "ursula1.example", 200);
        let older = signed_metadata(&identity, "ursula1.example", 100);

        directory.learn(newer, &AlwaysBonded).await.unwrap();
        let err = directory.learn(older, &AlwaysBonded).await.unwrap_err();
        assert!(matches!(err, DirectoryError::StaleMetadata { .. }));
    }

    #[tokio::test]
    async fn tampered_signature_is_rejected() {
        let directory = PeerDirectory::new(NodeId([0xFF; 20]));
        let identity = Identity::generate();
        let mut metadata = signed_metadata(&identity, "ursula1.example", 100);
        metadata.host = "evil.example".into();

        let err = directory.learn(metadata, &AlwaysBonded).await.unwrap_err();
        assert!(matches!(err, DirectoryError::SelfSignatureInvalid { .. }));
    }
}
