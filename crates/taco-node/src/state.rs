//! Shared application state handed to every handler.

use crate::config::NodeConfig;
use crate::payment::PaymentBackend;
use crate::rituals::RitualStore;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;
use taco_conditions::ConditionBackend;
use taco_core::metadata::NodeMetadata;
use taco_core::Hrac;
use taco_crypto::signing::Identity;
use taco_directory::{OperatorRegistry, PeerDirectory};
use umbral_pre::SecretKey as PreSecretKey;

/// Everything a handler needs, cloned cheaply (every field is an `Arc` or
/// `Copy`) into each request's extractor.
#[derive(Clone)]
pub struct NodeState {
    /// Static configuration loaded at startup.
    pub config: Arc<NodeConfig>,
    /// This node's long-term signing identity.
    pub identity: Arc<Identity>,
    /// This node's long-term PRE decrypting key.
    pub decrypting_key: Arc<PreSecretKey>,
    /// Computed once at construction and served verbatim by
    /// `/public_information`.
    pub self_metadata: Arc<NodeMetadata>,
    /// Known peers.
    pub directory: Arc<PeerDirectory>,
    /// Confirms operator bonding for nodes announced through gossip,
    /// before `directory.learn` admits them into the verified set.
    pub operator_registry: Arc<dyn OperatorRegistry>,
    /// This node's DKG ritual material.
    pub rituals: Arc<RitualStore>,
    /// External condition-leaf reader.
    pub condition_backend: Arc<dyn ConditionBackend>,
    /// External payment confirmation.
    pub payment_backend: Arc<dyn PaymentBackend>,
    /// Policies a publisher has revoked at this node specifically. Checked
    /// by `/reencrypt` before every fragment is produced; never cleared.
    pub revocations: Arc<RwLock<BTreeSet<Hrac>>>,
}

impl NodeState {
    /// Assemble node state around an already-signed self metadata record.
    /// Callers are responsible for having produced `self_metadata` with a
    /// valid self-signature (see `taco_core::metadata::NodeMetadata`) and
    /// registering it with `directory` if desired — a node does not learn
    /// about itself through its own directory.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: NodeConfig,
        identity: Identity,
        decrypting_key: PreSecretKey,
        self_metadata: NodeMetadata,
        directory: Arc<PeerDirectory>,
        operator_registry: Arc<dyn OperatorRegistry>,
        rituals: Arc<RitualStore>,
        condition_backend: Arc<dyn ConditionBackend>,
        payment_backend: Arc<dyn PaymentBackend>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            identity: Arc::new(identity),
            decrypting_key: Arc::new(decrypting_key),
            self_metadata: Arc::new(self_metadata),
            directory,
            operator_registry,
            rituals,
            condition_backend,
            payment_backend,
            revocations: Arc::new(RwLock::new(BTreeSet::new())),
        }
    }

    /// This node's own id, derived from its cached self metadata.
    pub fn node_id(&self) -> taco_core::identifiers::NodeId {
        self.self_metadata.node_id()
    }
}
