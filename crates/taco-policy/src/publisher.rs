//! The publisher (Alice) role: grants policies by splitting a key across
//! a cohort of nodes.

use crate::error::GrantError;
use crate::treasure_map::TreasureMap;
use std::collections::{BTreeMap, BTreeSet};
use taco_conditions::Condition;
use taco_core::metadata::NodeMetadata;
use taco_core::Hrac;
use taco_crypto::pre;
use taco_crypto::signing::Identity;
use umbral_pre::{PublicKey, SecretKey, SerializableToArray, Signer};

/// A publisher's long-term identity: an ed25519 identity used to sign
/// node-metadata-facing artifacts (revocation certificates), a dedicated
/// Umbral signing key whose public half every [`TreasureMap`] and
/// [`pre::EncryptedKeyFrag`] cites as `publisher_verifying_key` (nodes
/// verify kfrag provenance against this key, so it must stay stable across
/// every grant this publisher makes), and a delegating keypair reused
/// across every policy it grants.
pub struct Publisher {
    signing_identity: Identity,
    policy_signing_key: SecretKey,
    delegating_key: SecretKey,
}

impl Publisher {
    /// Create a publisher around freshly generated policy-signing and
    /// delegating keys.
    pub fn new(signing_identity: Identity) -> Self {
        Self { signing_identity, policy_signing_key: SecretKey::random(), delegating_key: SecretKey::random() }
    }

    /// The policy encrypting key every grant from this publisher shares.
    pub fn policy_encrypting_key(&self) -> PublicKey {
        self.delegating_key.public_key()
    }

    /// The Umbral verifying key nodes check kfrag provenance against.
    pub fn policy_verifying_key(&self) -> PublicKey {
        self.policy_signing_key.public_key()
    }

    /// This publisher's ed25519 signing identity, used outside the PRE
    /// layer (e.g. revocation certificates).
    pub fn signing_identity(&self) -> &Identity {
        &self.signing_identity
    }

    /// Split this publisher's delegating key across `cohort`, producing a
    /// fragment encrypted to each of the first `shares` members, and
    /// package the result as a [`TreasureMap`] gated by `conditions`.
    pub fn grant(
        &self,
        recipient_verifying_key: &[u8],
        recipient_encrypting_key: &PublicKey,
        label: &[u8],
        threshold: usize,
        shares: usize,
        cohort: &[NodeMetadata],
        conditions: Option<Condition>,
        expiration: u64,
    ) -> Result<TreasureMap, GrantError> {
        if cohort.len() < shares {
            return Err(GrantError::CohortTooSmall { have: cohort.len(), need: shares });
        }

        let mut seen = BTreeSet::new();
        for node in cohort.iter().take(shares) {
            if !seen.insert(node.node_id()) {
                return Err(GrantError::DuplicateNode { node_id: node.node_id().to_hex() });
            }
        }

        let publisher_verifying_key = self.policy_verifying_key().to_array().as_slice().to_vec();
        let hrac = Hrac::derive(&publisher_verifying_key, recipient_verifying_key, label);

        let signer = Signer::new(self.policy_signing_key.clone());
        let (verified_kfrags, policy_encrypting_key) =
            pre::generate_kfrags(&self.delegating_key, recipient_encrypting_key, &signer, threshold, shares)?;

        let mut destinations = BTreeMap::new();
        for (node, kfrag) in cohort.iter().take(shares).zip(verified_kfrags.iter()) {
            let node_encrypting_key = parse_node_encrypting_key(node)?;
            let encrypted = pre::EncryptedKeyFrag::new(&signer, &node_encrypting_key, &hrac, kfrag)?;
            destinations.insert(node.node_id(), encrypted);
        }

        Ok(TreasureMap {
            hrac,
            publisher_verifying_key,
            policy_encrypting_key: policy_encrypting_key.to_array().as_slice().to_vec(),
            recipient_encrypting_key: recipient_encrypting_key.to_array().as_slice().to_vec(),
            threshold,
            destinations,
            conditions,
            expiration,
        })
    }
}

fn parse_node_encrypting_key(node: &NodeMetadata) -> Result<PublicKey, GrantError> {
    let array: [u8; 33] = node
        .encrypting_key
        .as_slice()
        .try_into()
        .map_err(|_| taco_crypto::PreError::InvalidParameters("malformed node encrypting key".into()))?;
    umbral_pre::DeserializableFromArray::from_array(&array)
        .map_err(|e| GrantError::Pre(taco_crypto::PreError::InvalidParameters(format!("{e:?}"))))
}
