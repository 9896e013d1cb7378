//! A multi-node harness: real in-process node services bound to loopback,
//! for integration tests that exercise actual HTTP round-trips without a
//! real network or a real fleet of operators.

use crate::fakes::AlwaysBondedRegistry;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use taco_conditions::ConditionBackend;
use taco_core::identifiers::NodeId;
use taco_core::metadata::NodeMetadata;
use taco_crypto::signing::Identity;
use taco_directory::PeerDirectory;
use taco_node::payment::AlwaysPaid;
use taco_node::rituals::RitualStore;
use taco_node::{build_router, NodeConfig, NodeState};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use umbral_pre::{DeserializableFromArray, SecretKey as PreSecretKey, SerializableToArray};

/// One running node in a [`NodeCluster`], bound to an ephemeral loopback
/// port with a real axum server behind it.
pub struct RunningNode {
    /// This node's id.
    pub node_id: NodeId,
    /// This node's signed, servable metadata.
    pub metadata: NodeMetadata,
    /// The state handed to every request this node's router handles,
    /// exposed so a test can reach in and inspect e.g. `revocations`.
    pub state: NodeState,
    /// The loopback address the server is actually listening on.
    pub addr: SocketAddr,
    server_task: JoinHandle<()>,
}

impl Drop for RunningNode {
    fn drop(&mut self) {
        self.server_task.abort();
    }
}

impl RunningNode {
    /// Stop serving immediately, simulating this node going offline.
    /// Already-open connections fail; new ones are refused.
    pub fn stop(&self) {
        self.server_task.abort();
    }
}

/// A set of real, independently running node services, each with its own
/// `PeerDirectory` (gossip convergence between them is driven explicitly by
/// a test via [`PeerDirectory::learn`], not by this harness), a fake
/// condition backend that always reports `true`, and unconditional payment
/// acceptance.
pub struct NodeCluster {
    /// The running nodes, in spawn order.
    pub nodes: Vec<RunningNode>,
}

impl NodeCluster {
    /// Spawn `n` nodes, each on its own ephemeral loopback port, each
    /// backed by a condition backend that reports chain 1's clock as
    /// `i64::MAX` — enough to satisfy any `AlwaysTrue`-style time
    /// condition a scenario test attaches.
    pub async fn spawn(n: usize) -> Self {
        let backend: Arc<dyn ConditionBackend> =
            Arc::new(crate::fakes::FakeConditionBackend::always_true(taco_conditions::Chain(1)));
        Self::spawn_with_condition_backend(n, backend).await
    }

    /// Spawn `n` nodes sharing one condition backend, for scenarios that
    /// need a specific (e.g. always-false) leaf-read outcome.
    pub async fn spawn_with_condition_backend(n: usize, backend: Arc<dyn ConditionBackend>) -> Self {
        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            nodes.push(spawn_one(i as u64, backend.clone()).await);
        }
        Self { nodes }
    }

    /// Build a fresh [`PeerDirectory`] (as a recipient or publisher would
    /// hold) pre-populated with every member's metadata, verified via an
    /// always-bonded registry. `self_id` should not collide with any
    /// member's id — pass a sentinel like `NodeId([0xFF; 20])`.
    pub async fn directory_view(&self, self_id: NodeId) -> Arc<PeerDirectory> {
        let directory = Arc::new(PeerDirectory::new(self_id));
        for node in &self.nodes {
            directory
                .learn(node.metadata.clone(), &AlwaysBondedRegistry)
                .await
                .expect("harness-constructed metadata is always well-formed and bondable");
        }
        directory
    }
}

async fn spawn_one(seed: u64, condition_backend: Arc<dyn ConditionBackend>) -> RunningNode {
    let identity = Identity::generate();
    let decrypting_key = PreSecretKey::random();
    let encrypting_key = decrypting_key.public_key();

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("loopback bind never fails in a test sandbox");
    let addr = listener.local_addr().expect("a bound listener always has a local address");

    let timestamp = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(seed) + seed;

    let mut metadata = NodeMetadata {
        host: addr.ip().to_string(),
        port: addr.port(),
        verifying_key: identity.verifying_key().to_bytes().to_vec(),
        encrypting_key: encrypting_key.to_array().as_slice().to_vec(),
        ferveo_public_key: vec![0u8; 32],
        tls_der: vec![],
        timestamp,
        self_signature: vec![],
        operator_signature: vec![],
        staking_provider_address: format!("0xtestkit{seed:x}"),
        domain: "testkit".into(),
    };
    metadata.self_signature = identity.sign(&metadata.signing_payload()).to_bytes().to_vec();

    let config = NodeConfig {
        host: metadata.host.clone(),
        port: metadata.port,
        domain: metadata.domain.clone(),
        allowed_chains: vec![1, 137],
        payment_required: false,
        keystore_path: "in-memory".into(),
    };

    let directory = Arc::new(PeerDirectory::new(metadata.node_id()));

    let state = NodeState::new(
        config,
        identity,
        decrypting_key,
        metadata.clone(),
        directory,
        Arc::new(AlwaysBondedRegistry),
        Arc::new(RitualStore::new()),
        condition_backend,
        Arc::new(AlwaysPaid),
    );

    let router = build_router(state.clone());
    let node_id = metadata.node_id();

    let server_task = tokio::spawn(async move {
        axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .expect("node server exited unexpectedly");
    });

    RunningNode { node_id, metadata, state, addr, server_task }
}
