//! The recipient (Bob) role: retrieves access by fanning a request out to
//! a policy's cohort and collecting a threshold of usable responses.

use crate::error::RetrieveError;
use crate::treasure_map::TreasureMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use taco_conditions::{Acp, Condition, EvalContext};
use taco_core::identifiers::{NodeId, RitualId};
use taco_core::Hrac;
use taco_crypto::dkg::{self, RitualPublicKey, VerifiedDecryptionShare};
use taco_crypto::pre::{self, EncryptedKeyFrag, VerifiedCapsuleFrag};
use taco_crypto::session::SessionKeyPair;
use taco_crypto::signing::verify_from_bytes;
use taco_directory::PeerDirectory;
use threshold_crypto::Ciphertext;
use umbral_pre::{Capsule, CapsuleFrag, DeserializableFromArray, PublicKey, SecretKey, SerializableToArray};
use x25519_dalek::PublicKey as X25519PublicKey;

/// The recipient (Bob) role. Holds the PRE decrypting key policies are
/// granted against, plus a growing memory of nodes that have returned
/// malformed or unverifiable responses — once a node lands in
/// `suspicious_nodes` it's skipped on every later retrieval from this
/// `Recipient`, not just the one that caught it.
pub struct Recipient {
    verifying_key: Vec<u8>,
    decrypting_key: SecretKey,
    http: reqwest::Client,
    scheme: &'static str,
    suspicious_nodes: RwLock<BTreeSet<NodeId>>,
}

#[derive(Serialize)]
struct ReencryptWireRequest<'a> {
    hrac: Hrac,
    capsules: Vec<Vec<u8>>,
    encrypted_kfrag: &'a EncryptedKeyFrag,
    publisher_verifying_key: Vec<u8>,
    policy_encrypting_key: Vec<u8>,
    recipient_encrypting_key: Vec<u8>,
    bob_verifying_key: Vec<u8>,
    conditions: Vec<Option<Condition>>,
    context: EvalContext,
}

#[derive(Deserialize)]
struct ReencryptWireResponse {
    cfrags: Vec<Vec<u8>>,
    node_signature: Vec<u8>,
}

#[derive(Serialize)]
struct DecryptRequestBody {
    hrac: Hrac,
    ciphertext: Vec<u8>,
    acp: Acp,
    context: EvalContext,
}

#[derive(Serialize)]
struct EncryptedDecryptWireRequest {
    ritual_id: RitualId,
    session_public: [u8; 32],
    sealed_body: Vec<u8>,
}

#[derive(Deserialize)]
struct DecryptResponseBody {
    share_index: usize,
    share: Vec<u8>,
}

#[derive(Deserialize)]
struct EncryptedDecryptWireResponse {
    sealed_body: Vec<u8>,
}

impl Recipient {
    /// Build a recipient around a verifying-key identity and a fresh PRE
    /// decrypting keypair. Talks to nodes over `https://`, matching how a
    /// node's `tls_der` is meant to be pinned rather than trusted via a
    /// public CA.
    pub fn new(verifying_key: Vec<u8>, decrypting_key: SecretKey) -> Self {
        Self {
            verifying_key,
            decrypting_key,
            http: reqwest::Client::new(),
            scheme: "https",
            suspicious_nodes: RwLock::new(BTreeSet::new()),
        }
    }

    /// Build a recipient that talks to nodes over plain `http://` instead
    /// of `https://`. Only appropriate against a loopback test harness
    /// (`taco_testkit::NodeCluster`) where there is no certificate to pin in
    /// the first place; never use this against a real fleet.
    pub fn new_insecure_for_tests(verifying_key: Vec<u8>, decrypting_key: SecretKey) -> Self {
        Self { scheme: "http", ..Self::new(verifying_key, decrypting_key) }
    }

    /// This recipient's PRE encrypting key — what a publisher's `grant`
    /// call should be given as `recipient_encrypting_key`.
    pub fn encrypting_key(&self) -> PublicKey {
        self.decrypting_key.public_key()
    }

    /// This recipient's verifying-key identity bytes, used when deriving
    /// an `Hrac` for a policy it's requesting.
    pub fn verifying_key_bytes(&self) -> &[u8] {
        &self.verifying_key
    }

    /// Nodes this recipient has stopped trusting, across every retrieval
    /// it has attempted so far.
    pub fn suspicious_nodes(&self) -> BTreeSet<NodeId> {
        self.suspicious_nodes.read().clone()
    }

    /// Fan a reencryption request for `capsule`/`ciphertext` out to
    /// `treasure_map`'s cohort, in an order deterministically shuffled by
    /// `(hrac, capsule)` so repeated retrievals of the same policy don't
    /// always hammer the same destinations first, and combine the first
    /// `threshold` verified fragments returned into the original plaintext.
    pub async fn retrieve(
        &self,
        treasure_map: &TreasureMap,
        directory: &PeerDirectory,
        capsule: &Capsule,
        ciphertext: &[u8],
        context: &EvalContext,
    ) -> Result<Vec<u8>, RetrieveError> {
        let now = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
        if treasure_map.is_expired(now) {
            return Err(RetrieveError::Expired { expiration: treasure_map.expiration, now });
        }

        let publisher_verifying_key = parse_public_key(&treasure_map.publisher_verifying_key)?;
        let policy_encrypting_key = parse_public_key(&treasure_map.policy_encrypting_key)?;
        let recipient_encrypting_key = parse_public_key(&treasure_map.recipient_encrypting_key)?;
        let capsule_bytes = capsule.to_array().as_slice().to_vec();

        let order = shuffled_order(treasure_map.hrac, &capsule_bytes, treasure_map.destinations.keys().copied());
        let snapshot = directory.snapshot();

        let mut collected: Vec<VerifiedCapsuleFrag> = Vec::new();
        let mut attempted = 0usize;

        for node_id in order {
            if self.suspicious_nodes.read().contains(&node_id) {
                continue;
            }
            let Some(encrypted_kfrag) = treasure_map.destinations.get(&node_id) else { continue };
            let Some(metadata) = snapshot.verified.get(&node_id) else { continue };
            attempted += 1;

            let body = ReencryptWireRequest {
                hrac: treasure_map.hrac,
                capsules: vec![capsule_bytes.clone()],
                encrypted_kfrag,
                publisher_verifying_key: treasure_map.publisher_verifying_key.clone(),
                policy_encrypting_key: treasure_map.policy_encrypting_key.clone(),
                recipient_encrypting_key: treasure_map.recipient_encrypting_key.clone(),
                bob_verifying_key: self.verifying_key.clone(),
                conditions: vec![treasure_map.conditions.clone()],
                context: context.clone(),
            };

            let url = format!("{}://{}:{}/reencrypt", self.scheme, metadata.host, metadata.port);
            let outcome = self.http.post(&url).json(&body).send().await;

            let parsed = match outcome {
                Ok(response) if response.status().is_success() => match response.json::<ReencryptWireResponse>().await
                {
                    Ok(parsed) => parsed,
                    Err(_) => {
                        self.mark_suspicious(node_id);
                        continue;
                    }
                },
                _ => {
                    self.mark_suspicious(node_id);
                    continue;
                }
            };

            let Some(cfrag) = parsed.cfrags.into_iter().next() else {
                self.mark_suspicious(node_id);
                continue;
            };
            let signature_payload = [capsule_bytes.as_slice(), cfrag.as_slice()].concat();
            if !verify_from_bytes(&metadata.verifying_key, &signature_payload, &parsed.node_signature) {
                self.mark_suspicious(node_id);
                continue;
            }

            let Ok(raw_cfrag) = CapsuleFrag::from_array(&array33(&cfrag)) else {
                self.mark_suspicious(node_id);
                continue;
            };
            let Ok(verified) = pre::verify_cfrag(
                raw_cfrag,
                capsule,
                &publisher_verifying_key,
                &policy_encrypting_key,
                &recipient_encrypting_key,
            ) else {
                self.mark_suspicious(node_id);
                continue;
            };

            collected.push(verified);
            if collected.len() >= treasure_map.threshold {
                break;
            }
        }

        if collected.len() < treasure_map.threshold {
            return Err(RetrieveError::ThresholdNotMet {
                collected: collected.len(),
                needed: treasure_map.threshold,
                attempted,
            });
        }

        pre::decrypt_with_cfrags(
            &self.decrypting_key,
            &policy_encrypting_key,
            capsule,
            &collected,
            treasure_map.threshold,
            ciphertext,
        )
        .map_err(|e| RetrieveError::Decryption(e.to_string()))
    }

    /// Fan a decryption-share request for `ciphertext` out to `ritual`'s
    /// cohort — named by `cohort` as `(NodeId, share_index)` pairs — and
    /// combine the first `ritual.threshold()` verified shares into
    /// plaintext. `acp` must have been sealed by the encryptor over
    /// `taco_conditions::hash_ciphertext_header(&bincode::serialize(ciphertext)?)`
    /// — the same bytes this call serializes `ciphertext` into — or every
    /// node contacted will reject it at ACP-verification (spec §4.3.2 step
    /// 3).
    pub async fn threshold_decrypt(
        &self,
        hrac: Hrac,
        ritual: &RitualPublicKey,
        cohort: &[(NodeId, usize)],
        directory: &PeerDirectory,
        ciphertext: &Ciphertext,
        acp: &Acp,
        context: &EvalContext,
    ) -> Result<Vec<u8>, RetrieveError> {
        let ciphertext_bytes =
            bincode::serialize(ciphertext).map_err(|e| RetrieveError::Decryption(e.to_string()))?;
        let snapshot = directory.snapshot();

        let order = shuffled_order(hrac, &ciphertext_bytes, cohort.iter().map(|(id, _)| *id));
        let index_of: std::collections::BTreeMap<NodeId, usize> = cohort.iter().copied().collect();

        // One session keypair generated for this retrieval, handshaked
        // against every cohort member it contacts, then dropped — spec
        // §4.5.3 step 2.
        let session_keys = SessionKeyPair::generate();
        let aad = ritual.ritual_id().0.to_be_bytes();

        let mut shares: Vec<VerifiedDecryptionShare> = Vec::new();
        let mut attempted = 0usize;

        for node_id in order {
            if self.suspicious_nodes.read().contains(&node_id) {
                continue;
            }
            let Some(&share_index) = index_of.get(&node_id) else { continue };
            let Some(metadata) = snapshot.verified.get(&node_id) else { continue };
            let Some(node_session_public) = ritual.session_public_key(share_index) else {
                self.mark_suspicious(node_id);
                continue;
            };
            attempted += 1;

            let handshake =
                session_keys.handshake(&X25519PublicKey::from(node_session_public), &aad);
            let body = DecryptRequestBody {
                hrac,
                ciphertext: ciphertext_bytes.clone(),
                acp: acp.clone(),
                context: context.clone(),
            };
            let Ok(body_bytes) = bincode::serialize(&body) else {
                self.mark_suspicious(node_id);
                continue;
            };
            let Ok(sealed_body) = handshake.seal_request(&body_bytes, &aad) else {
                self.mark_suspicious(node_id);
                continue;
            };
            let wire_request = EncryptedDecryptWireRequest {
                ritual_id: ritual.ritual_id(),
                session_public: session_keys.public.to_bytes(),
                sealed_body,
            };

            let url = format!("{}://{}:{}/decrypt", self.scheme, metadata.host, metadata.port);
            let outcome = self.http.post(&url).json(&wire_request).send().await;

            let parsed: EncryptedDecryptWireResponse = match outcome {
                Ok(response) if response.status().is_success() => match response.json().await {
                    Ok(parsed) => parsed,
                    Err(_) => {
                        self.mark_suspicious(node_id);
                        continue;
                    }
                },
                _ => {
                    self.mark_suspicious(node_id);
                    continue;
                }
            };

            let Ok(response_bytes) = handshake.open_response(&parsed.sealed_body, &aad) else {
                self.mark_suspicious(node_id);
                continue;
            };
            let Ok(response_body) = bincode::deserialize::<DecryptResponseBody>(&response_bytes) else {
                self.mark_suspicious(node_id);
                continue;
            };
            let Ok(share) = bincode::deserialize(&response_body.share) else {
                self.mark_suspicious(node_id);
                continue;
            };
            let Ok(verified) = dkg::verify_decryption_share(ritual, response_body.share_index, &share, ciphertext)
            else {
                self.mark_suspicious(node_id);
                continue;
            };

            shares.push(verified);
            if shares.len() >= ritual.threshold() {
                break;
            }
        }

        if shares.len() < ritual.threshold() {
            return Err(RetrieveError::ThresholdNotMet {
                collected: shares.len(),
                needed: ritual.threshold(),
                attempted,
            });
        }

        dkg::combine_and_decrypt(ritual, &shares, ciphertext).map_err(|e| RetrieveError::Decryption(e.to_string()))
    }

    fn mark_suspicious(&self, node_id: NodeId) {
        tracing::warn!(node_id = %node_id, "node returned an unverifiable response, marking suspicious");
        self.suspicious_nodes.write().insert(node_id);
    }
}

/// Deterministically shuffle `node_ids` using a key derived from `(hrac,
/// salt)`: stable across calls with the same inputs (so retries of the
/// same retrieval contact nodes in the same order), but different policies
/// or capsules land on different orderings, spreading load rather than
/// always hitting the destination list in its insertion order.
fn shuffled_order(hrac: Hrac, salt: &[u8], node_ids: impl Iterator<Item = NodeId>) -> Vec<NodeId> {
    let mut keyed: Vec<(blake3::Hash, NodeId)> = node_ids
        .map(|node_id| {
            let mut hasher = blake3::Hasher::new();
            hasher.update(&hrac.0);
            hasher.update(salt);
            hasher.update(&node_id.0);
            (hasher.finalize(), node_id)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
    keyed.into_iter().map(|(_, id)| id).collect()
}

fn parse_public_key(bytes: &[u8]) -> Result<PublicKey, RetrieveError> {
    let array: [u8; 33] =
        bytes.try_into().map_err(|_| RetrieveError::Decryption("malformed public key bytes".into()))?;
    PublicKey::from_array(&array).map_err(|e| RetrieveError::Decryption(format!("{e:?}")))
}

fn array33(bytes: &[u8]) -> [u8; 33] {
    let mut out = [0u8; 33];
    let n = bytes.len().min(33);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shuffled_order_is_stable_for_identical_inputs() {
        let hrac = Hrac::derive(b"pub", b"rec", b"label");
        let ids = vec![NodeId([1; 20]), NodeId([2; 20]), NodeId([3; 20])];
        let a = shuffled_order(hrac, b"capsule-bytes", ids.clone().into_iter());
        let b = shuffled_order(hrac, b"capsule-bytes", ids.into_iter());
        assert_eq!(a, b);
    }

    #[test]
    fn shuffled_order_differs_across_salts() {
        let hrac = Hrac::derive(b"pub", b"rec", b"label");
        let ids = vec![NodeId([1; 20]), NodeId([2; 20]), NodeId([3; 20]), NodeId([4; 20])];
        let a = shuffled_order(hrac, b"capsule-one", ids.clone().into_iter());
        let b = shuffled_order(hrac, b"capsule-two", ids.into_iter());
        assert_ne!(a, b);
    }

    #[test]
    fn recipient_retrieve_fails_closed_with_an_empty_cohort() {
        let decrypting_key = SecretKey::random();
        let recipient = Recipient::new(vec![1, 2, 3], decrypting_key);
        assert!(recipient.suspicious_nodes().is_empty());
    }

    #[tokio::test]
    async fn retrieve_refuses_an_expired_treasure_map_before_contacting_any_node() {
        use crate::treasure_map::TreasureMap;
        use std::collections::BTreeMap;
        use taco_core::Hrac;

        let decrypting_key = SecretKey::random();
        let recipient = Recipient::new_insecure_for_tests(vec![1, 2, 3], decrypting_key);
        let directory = PeerDirectory::new(NodeId([0xFF; 20]));

        let treasure_map = TreasureMap {
            hrac: Hrac::derive(b"pub", b"rec", b"label"),
            publisher_verifying_key: vec![1, 2, 3],
            policy_encrypting_key: SecretKey::random().public_key().to_array().as_slice().to_vec(),
            recipient_encrypting_key: SecretKey::random().public_key().to_array().as_slice().to_vec(),
            threshold: 1,
            destinations: BTreeMap::new(),
            conditions: None,
            expiration: 1,
        };
        let (capsule, ciphertext) =
            pre::encrypt_original(&parse_public_key(&treasure_map.policy_encrypting_key).unwrap(), b"hi").unwrap();

        let err = recipient
            .retrieve(&treasure_map, &directory, &capsule, &ciphertext, &EvalContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RetrieveError::Expired { expiration: 1, .. }));
    }
}
