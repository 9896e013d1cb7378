//! The treasure map: a policy's distribution list, naming which node holds
//! which encrypted key fragment.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use taco_conditions::Condition;
use taco_core::envelope::WireObject;
use taco_core::identifiers::NodeId;
use taco_core::Hrac;
use taco_crypto::pre::{self, EncryptedKeyFrag};
use umbral_pre::{PublicKey, SecretKey};

/// A policy's full distribution list: which node holds which encrypted key
/// fragment, plus the conditions gating access and the threshold required
/// to reconstruct it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreasureMap {
    /// The policy this map belongs to.
    pub hrac: Hrac,
    /// The publisher's long-term verifying key, canonical bytes.
    pub publisher_verifying_key: Vec<u8>,
    /// The policy's delegating (encrypting) public key, canonical bytes.
    pub policy_encrypting_key: Vec<u8>,
    /// The recipient's encrypting public key, canonical bytes.
    pub recipient_encrypting_key: Vec<u8>,
    /// Fragments required to reconstruct access.
    pub threshold: usize,
    /// Each destination node's encrypted fragment.
    pub destinations: BTreeMap<NodeId, EncryptedKeyFrag>,
    /// Access conditions gating this policy, if any.
    pub conditions: Option<Condition>,
    /// Unix timestamp (seconds) after which this policy is no longer
    /// honored. A request arriving exactly at expiration is refused (spec
    /// §8 boundary behaviors): `now >= expiration` means expired.
    pub expiration: u64,
}

impl WireObject for TreasureMap {
    fn brand() -> [u8; 4] {
        *b"TMap"
    }
}

impl TreasureMap {
    /// `true` once `now` has reached or passed `expiration` — a request
    /// arriving exactly at expiration is refused, not the request one
    /// tick before it.
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expiration
    }

    /// Encrypt this map to the recipient's encrypting key, the same
    /// generic public-key-encryption primitive used for key fragments
    /// themselves, so only the intended recipient can read the
    /// distribution list.
    pub fn seal_for_recipient(&self, recipient_encrypting_key: &PublicKey) -> Result<SealedTreasureMap, taco_crypto::PreError> {
        let plaintext = self.to_bytes().map_err(|e| taco_crypto::PreError::InvalidParameters(e.to_string()))?;
        let (capsule, ciphertext) = pre::encrypt_original(recipient_encrypting_key, &plaintext)?;
        Ok(SealedTreasureMap {
            capsule_bytes: bincode::serialize(&capsule)
                .map_err(|e| taco_crypto::PreError::InvalidParameters(e.to_string()))?,
            ciphertext,
        })
    }
}

/// A treasure map encrypted for one specific recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedTreasureMap {
    capsule_bytes: Vec<u8>,
    ciphertext: Vec<u8>,
}

impl SealedTreasureMap {
    /// Decrypt with the recipient's PRE secret key.
    pub fn unseal(&self, recipient_secret_key: &SecretKey) -> Result<TreasureMap, taco_crypto::PreError> {
        let capsule = bincode::deserialize(&self.capsule_bytes)
            .map_err(|e| taco_crypto::PreError::InvalidParameters(e.to_string()))?;
        let plaintext = pre::decrypt_with_delegating_key(recipient_secret_key, &capsule, &self.ciphertext)?;
        TreasureMap::from_bytes(&plaintext).map_err(|e| taco_crypto::PreError::InvalidParameters(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn treasure_map_round_trips_through_sealing() {
        let recipient_sk = SecretKey::random();
        let recipient_pk = recipient_sk.public_key();

        let map = TreasureMap {
            hrac: Hrac::derive(b"pub", b"recipient", b"label"),
            publisher_verifying_key: vec![1, 2, 3],
            policy_encrypting_key: vec![4, 5, 6],
            recipient_encrypting_key: vec![7, 8, 9],
            threshold: 2,
            destinations: BTreeMap::new(),
            conditions: None,
            expiration: 1_900_000_000,
        };

        let sealed = map.seal_for_recipient(&recipient_pk).unwrap();
        let unsealed = sealed.unseal(&recipient_sk).unwrap();
        assert_eq!(unsealed.hrac, map.hrac);
        assert_eq!(unsealed.threshold, map.threshold);
        assert_eq!(unsealed.expiration, map.expiration);
    }

    #[test]
    fn expiration_boundary_refuses_exactly_at_expiration() {
        let map = TreasureMap {
            hrac: Hrac::derive(b"pub", b"recipient", b"label"),
            publisher_verifying_key: vec![1, 2, 3],
            policy_encrypting_key: vec![4, 5, 6],
            recipient_encrypting_key: vec![7, 8, 9],
            threshold: 2,
            destinations: BTreeMap::new(),
            conditions: None,
            expiration: 1_000,
        };
        assert!(!map.is_expired(999));
        assert!(map.is_expired(1_000));
        assert!(map.is_expired(1_001));
    }
}
