//! Cross-crate scenario tests driving a publisher, a recipient, and a real
//! (if loopback) fleet of node services through the access paths this
//! workspace exists to provide: happy-path PRE retrieval, a condition that
//! never opens, revocation taking effect mid-policy, threshold DKG
//! decryption, an adversarial node's response being caught and quarantined,
//! and two directories converging on the same fleet view after gossip.

use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};
use taco_conditions::{Acp, Chain, ComparisonOperator, Condition, EvalContext, ReturnValueTest};
use taco_core::identifiers::NodeId;
use taco_core::metadata::NodeMetadata;
use taco_core::{Hrac, RitualId};
use taco_crypto::dkg::{self, RitualPublicKey};
use taco_crypto::pre;
use taco_crypto::signing::Identity;
use taco_directory::PeerDirectory;
use taco_policy::error::RetrieveError;
use taco_policy::{Publisher, Recipient};
use taco_testkit::{AlwaysBondedRegistry, FakeConditionBackend, NodeCluster};
use threshold_crypto::SecretKeySet;
use umbral_pre::{SecretKey as PreSecretKey, SerializableToArray};

/// A `Time { chain: 1, return_value_test: { Gt, 0 } }` condition: true when a
/// backend reports a positive timestamp, false when it reports zero.
fn positive_timestamp_condition() -> Condition {
    Condition::Time {
        chain: Chain(1),
        return_value_test: ReturnValueTest { comparator: ComparisonOperator::Gt, value: Value::from(0), index: None },
    }
}

#[tokio::test]
async fn s1_happy_path_retrieval_survives_one_offline_node() {
    let cluster = NodeCluster::spawn(3).await;
    let directory = cluster.directory_view(NodeId([0xAA; 20])).await;

    let publisher = Publisher::new(Identity::generate());
    let recipient = Recipient::new_insecure_for_tests(
        Identity::generate().verifying_key().to_bytes().to_vec(),
        PreSecretKey::random(),
    );

    let cohort: Vec<NodeMetadata> = cluster.nodes.iter().map(|n| n.metadata.clone()).collect();
    let treasure_map = publisher
        .grant(
            recipient.verifying_key_bytes(),
            &recipient.encrypting_key(),
            b"secret/files/42",
            2,
            3,
            &cohort,
            Some(positive_timestamp_condition()),
            1_900_000_000,
        )
        .unwrap();

    let (capsule, ciphertext) = pre::encrypt_original(&publisher.policy_encrypting_key(), b"hello").unwrap();

    cluster.nodes[1].stop();

    let plaintext = recipient
        .retrieve(&treasure_map, &directory, &capsule, &ciphertext, &EvalContext::default())
        .await
        .unwrap();
    assert_eq!(plaintext, b"hello");
}

#[tokio::test]
async fn s2_condition_that_never_opens_leaves_threshold_unmet() {
    let backend: std::sync::Arc<dyn taco_conditions::ConditionBackend> =
        std::sync::Arc::new(FakeConditionBackend::always_false(Chain(1)));
    let cluster = NodeCluster::spawn_with_condition_backend(3, backend).await;
    let directory = cluster.directory_view(NodeId([0xAB; 20])).await;

    let publisher = Publisher::new(Identity::generate());
    let recipient = Recipient::new_insecure_for_tests(
        Identity::generate().verifying_key().to_bytes().to_vec(),
        PreSecretKey::random(),
    );

    let cohort: Vec<NodeMetadata> = cluster.nodes.iter().map(|n| n.metadata.clone()).collect();
    let treasure_map = publisher
        .grant(
            recipient.verifying_key_bytes(),
            &recipient.encrypting_key(),
            b"secret/files/future",
            2,
            3,
            &cohort,
            Some(positive_timestamp_condition()),
            1_900_000_000,
        )
        .unwrap();

    let (capsule, ciphertext) = pre::encrypt_original(&publisher.policy_encrypting_key(), b"hello").unwrap();

    let err = recipient
        .retrieve(&treasure_map, &directory, &capsule, &ciphertext, &EvalContext::default())
        .await
        .unwrap_err();

    match err {
        RetrieveError::ThresholdNotMet { collected, needed, attempted } => {
            assert_eq!(collected, 0);
            assert_eq!(needed, 2);
            assert_eq!(attempted, 3);
        }
        other => panic!("expected ThresholdNotMet, got {other:?}"),
    }
    assert_eq!(recipient.suspicious_nodes().len(), 3);
}

#[tokio::test]
async fn s3_revocation_at_one_node_shrinks_the_reachable_pool() {
    let cluster = NodeCluster::spawn(3).await;
    let directory = cluster.directory_view(NodeId([0xAC; 20])).await;

    let publisher = Publisher::new(Identity::generate());
    let recipient = Recipient::new_insecure_for_tests(
        Identity::generate().verifying_key().to_bytes().to_vec(),
        PreSecretKey::random(),
    );

    let cohort: Vec<NodeMetadata> = cluster.nodes.iter().map(|n| n.metadata.clone()).collect();
    let treasure_map = publisher
        .grant(
            recipient.verifying_key_bytes(),
            &recipient.encrypting_key(),
            b"secret/files/revocable",
            2,
            3,
            &cohort,
            Some(positive_timestamp_condition()),
            1_900_000_000,
        )
        .unwrap();

    let (capsule, ciphertext) = pre::encrypt_original(&publisher.policy_encrypting_key(), b"hello").unwrap();

    cluster.nodes[1].stop();
    recipient
        .retrieve(&treasure_map, &directory, &capsule, &ciphertext, &EvalContext::default())
        .await
        .expect("first retrieval succeeds against N1 and N3 with N2 offline");

    revoke_at(&cluster, 0, &publisher, treasure_map.hrac).await;

    let retry_recipient = Recipient::new_insecure_for_tests(
        Identity::generate().verifying_key().to_bytes().to_vec(),
        PreSecretKey::random(),
    );
    // Retrieve under the same treasure map: the fragment addressed to the
    // retry recipient's own key differs from the original grant's, so build
    // a second grant against the same cohort instead of reusing the first.
    let treasure_map_2 = publisher
        .grant(
            retry_recipient.verifying_key_bytes(),
            &retry_recipient.encrypting_key(),
            b"secret/files/revocable",
            2,
            3,
            &cohort,
            Some(positive_timestamp_condition()),
            1_900_000_000,
        )
        .unwrap();
    revoke_at(&cluster, 0, &publisher, treasure_map_2.hrac).await;

    let (capsule_2, ciphertext_2) = pre::encrypt_original(&publisher.policy_encrypting_key(), b"hello again").unwrap();

    let err = retry_recipient
        .retrieve(&treasure_map_2, &directory, &capsule_2, &ciphertext_2, &EvalContext::default())
        .await
        .unwrap_err();

    match err {
        RetrieveError::ThresholdNotMet { collected, needed, attempted } => {
            assert_eq!(collected, 1, "only N3 is left reachable and unrevoked");
            assert_eq!(needed, 2);
            assert_eq!(attempted, 3, "N1 (revoked), N2 (offline), and N3 (live) are all still destinations");
        }
        other => panic!("expected ThresholdNotMet, got {other:?}"),
    }
}

async fn revoke_at(cluster: &NodeCluster, node_index: usize, publisher: &Publisher, hrac: Hrac) {
    let node = &cluster.nodes[node_index];
    let mut payload = hrac.0.to_vec();
    payload.extend_from_slice(&node.node_id.0);
    let signature = publisher.signing_identity().sign(&payload);

    let body = json!({
        "hrac": hrac,
        "publisher_verifying_key": publisher.signing_identity().verifying_key().to_bytes().to_vec(),
        "publisher_signature": signature.to_bytes().to_vec(),
    });

    let client = reqwest::Client::new();
    let response = client.post(format!("http://{}/revoke", node.addr)).json(&body).send().await.unwrap();
    assert!(response.status().is_success());
}

#[tokio::test]
async fn s4_threshold_decryption_recovers_plaintext_from_two_of_four_shares() {
    let cluster = NodeCluster::spawn(4).await;
    let directory = cluster.directory_view(NodeId([0xAD; 20])).await;

    let ritual_id = RitualId(7);
    let secret_key_set = SecretKeySet::random(1, &mut rand::thread_rng());
    let public_key_set = secret_key_set.public_keys();

    let session_public_keys: std::collections::BTreeMap<usize, [u8; 32]> = cluster
        .nodes
        .iter()
        .enumerate()
        .map(|(index, node)| {
            let session_key = taco_crypto::session::NodeSessionKey::derive(
                &node.state.identity.session_seed(),
                u64::from(ritual_id.0),
            );
            (index, session_key.public_bytes())
        })
        .collect();
    let ritual = RitualPublicKey::new(ritual_id, 2, public_key_set, session_public_keys);

    let mut cohort = Vec::new();
    for (index, node) in cluster.nodes.iter().enumerate() {
        let material = taco_node::rituals::RitualMaterial {
            public_key: ritual.clone(),
            secret_share: secret_key_set.secret_key_share(index),
            share_index: index,
        };
        node.state.rituals.insert(ritual_id, material);
        cohort.push((node.node_id, index));
    }

    let ciphertext = dkg::encrypt_for_ritual(&ritual, b"records break when you don't");
    let hrac = Hrac::derive(b"publisher", b"recipient", b"threshold-policy");

    let recipient = Recipient::new_insecure_for_tests(
        Identity::generate().verifying_key().to_bytes().to_vec(),
        PreSecretKey::random(),
    );

    // The encryptor is a distinct identity from the recipient: it alone
    // signs the ACP a node will check before deriving a share.
    let encryptor = Identity::generate();
    let ciphertext_bytes = bincode::serialize(&ciphertext).unwrap();
    let header_hash = taco_conditions::hash_ciphertext_header(&ciphertext_bytes);
    let acp = Acp::new(
        Some(positive_timestamp_condition()),
        header_hash,
        encryptor.verifying_key().to_bytes(),
        encryptor.sign(&header_hash).to_bytes(),
    );

    let plaintext = recipient
        .threshold_decrypt(hrac, &ritual, &cohort, &directory, &ciphertext, &acp, &EvalContext::default())
        .await
        .unwrap();

    assert_eq!(plaintext, b"records break when you don't");
}

/// Drives `retrieve` against a cohort containing only a node that answers
/// `/reencrypt` with well-formed-but-bogus bytes, then against a cohort of
/// genuinely honest nodes — using the *same* recipient both times, so the
/// second retrieval demonstrates that quarantine from the first one
/// persists rather than being scoped to a single call.
#[tokio::test]
async fn s5_an_adversarial_cfrag_gets_the_offending_node_quarantined() {
    let malicious_identity = Identity::generate();
    let malicious_decrypting_key = PreSecretKey::random();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let router =
        Router::new().route("/reencrypt", post(|| async { Json(json!({ "cfrags": [vec![7u8; 33]] })) }));
    tokio::spawn(async move {
        let _ = axum::serve(listener, router.into_make_service()).await;
    });

    let timestamp = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(1);
    let mut malicious_metadata = NodeMetadata {
        host: addr.ip().to_string(),
        port: addr.port(),
        verifying_key: malicious_identity.verifying_key().to_bytes().to_vec(),
        encrypting_key: malicious_decrypting_key.public_key().to_array().as_slice().to_vec(),
        ferveo_public_key: vec![0u8; 32],
        tls_der: vec![],
        timestamp,
        self_signature: vec![],
        operator_signature: vec![],
        staking_provider_address: "0xmalicious".into(),
        domain: "testkit".into(),
    };
    malicious_metadata.self_signature =
        malicious_identity.sign(&malicious_metadata.signing_payload()).to_bytes().to_vec();
    let malicious_id = malicious_metadata.node_id();

    let malicious_directory = PeerDirectory::new(NodeId([0xAE; 20]));
    malicious_directory.learn(malicious_metadata.clone(), &AlwaysBondedRegistry).await.unwrap();

    let recipient = Recipient::new_insecure_for_tests(
        Identity::generate().verifying_key().to_bytes().to_vec(),
        PreSecretKey::random(),
    );

    let publisher = Publisher::new(Identity::generate());
    let lone_bad_map = publisher
        .grant(
            recipient.verifying_key_bytes(),
            &recipient.encrypting_key(),
            b"secret/files/adversarial-probe",
            1,
            1,
            std::slice::from_ref(&malicious_metadata),
            Some(positive_timestamp_condition()),
            1_900_000_000,
        )
        .unwrap();
    let (probe_capsule, probe_ciphertext) =
        pre::encrypt_original(&publisher.policy_encrypting_key(), b"probe").unwrap();

    let err = recipient
        .retrieve(&lone_bad_map, &malicious_directory, &probe_capsule, &probe_ciphertext, &EvalContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RetrieveError::ThresholdNotMet { collected: 0, needed: 1, attempted: 1 }));
    assert!(recipient.suspicious_nodes().contains(&malicious_id));

    let cluster = NodeCluster::spawn(2).await;
    let honest_directory = cluster.directory_view(NodeId([0xAF; 20])).await;
    let cohort: Vec<NodeMetadata> = cluster.nodes.iter().map(|n| n.metadata.clone()).collect();
    let honest_map = publisher
        .grant(
            recipient.verifying_key_bytes(),
            &recipient.encrypting_key(),
            b"secret/files/adversarial-recover",
            2,
            2,
            &cohort,
            Some(positive_timestamp_condition()),
            1_900_000_000,
        )
        .unwrap();
    let (capsule, ciphertext) = pre::encrypt_original(&publisher.policy_encrypting_key(), b"hello").unwrap();

    let plaintext = recipient
        .retrieve(&honest_map, &honest_directory, &capsule, &ciphertext, &EvalContext::default())
        .await
        .unwrap();
    assert_eq!(plaintext, b"hello");
    assert!(recipient.suspicious_nodes().contains(&malicious_id), "quarantine survives across retrievals");
}

#[tokio::test]
async fn s6_two_directories_converge_after_one_gossip_round() {
    let identity_a1 = Identity::generate();
    let identity_a2 = Identity::generate();
    let identity_b1 = Identity::generate();
    let identity_b2 = Identity::generate();

    let m_a1 = signed_metadata(&identity_a1, "peer-a1.example", 10);
    let m_a2 = signed_metadata(&identity_a2, "peer-a2.example", 10);
    let m_b1 = signed_metadata(&identity_b1, "peer-b1.example", 10);
    let m_b2 = signed_metadata(&identity_b2, "peer-b2.example", 10);

    let directory_a = PeerDirectory::new(NodeId([0x01; 20]));
    directory_a.learn(m_a1.clone(), &AlwaysBondedRegistry).await.unwrap();
    directory_a.learn(m_a2.clone(), &AlwaysBondedRegistry).await.unwrap();

    let directory_b = PeerDirectory::new(NodeId([0x02; 20]));
    directory_b.learn(m_b1.clone(), &AlwaysBondedRegistry).await.unwrap();
    directory_b.learn(m_b2.clone(), &AlwaysBondedRegistry).await.unwrap();

    // One gossip round-trip: A learns everything B knows, B learns
    // everything A knows.
    directory_a.learn(m_b1.clone(), &AlwaysBondedRegistry).await.unwrap();
    directory_a.learn(m_b2.clone(), &AlwaysBondedRegistry).await.unwrap();
    directory_b.learn(m_a1.clone(), &AlwaysBondedRegistry).await.unwrap();
    directory_b.learn(m_a2.clone(), &AlwaysBondedRegistry).await.unwrap();

    let snapshot_a = directory_a.snapshot();
    let snapshot_b = directory_b.snapshot();

    assert_eq!(snapshot_a.verified.len(), 4);
    assert_eq!(snapshot_b.verified.len(), 4);
    assert_eq!(
        snapshot_a.verified.keys().collect::<std::collections::BTreeSet<_>>(),
        snapshot_b.verified.keys().collect::<std::collections::BTreeSet<_>>()
    );
    assert_eq!(snapshot_a.checksum, snapshot_b.checksum);
}

fn signed_metadata(identity: &Identity, host: &str, timestamp: u64) -> NodeMetadata {
    let pre_sk = PreSecretKey::random();
    let mut m = NodeMetadata {
        host: host.into(),
        port: 9151,
        verifying_key: identity.verifying_key().to_bytes().to_vec(),
        encrypting_key: pre_sk.public_key().to_array().as_slice().to_vec(),
        ferveo_public_key: vec![1, 2, 3],
        tls_der: vec![],
        timestamp,
        self_signature: vec![],
        operator_signature: vec![],
        staking_provider_address: "0xprovider".into(),
        domain: "lynx".into(),
    };
    m.self_signature = identity.sign(&m.signing_payload()).to_bytes().to_vec();
    m
}
