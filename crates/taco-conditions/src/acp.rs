//! Access Control Policy: the conditions gating a threshold-decryption
//! request, bound to the ciphertext they guard by the encryptor's
//! signature (spec §3's `ThresholdMessageKit`/ACP, verified at §4.3.2
//! step 3 before a node will derive a decryption share).
//!
//! An ACP is produced once, at encryption time, by whoever encrypted the
//! plaintext under the ritual's public key — not by the recipient
//! relaying it later, which has no stake in whether the conditions it
//! forwards are the ones the encryptor actually signed off on.

use crate::condition::Condition;
use ed25519_dalek::{Signature, Verifier as _, VerifyingKey};
use serde::{Deserialize, Serialize};

/// Hash a ciphertext's wire bytes into the "ciphertext header hash" an ACP
/// signs over. Both the encryptor (sealing) and the node (verifying) must
/// hash the exact same bytes, so this is the one place that logic lives.
pub fn hash_ciphertext_header(ciphertext_bytes: &[u8]) -> [u8; 32] {
    *blake3::hash(ciphertext_bytes).as_bytes()
}

/// Conditions plus the encryptor's authorization over the ciphertext
/// header hash they gate. No public field mutation after construction —
/// a recipient forwarding this to a node can't alter `conditions` without
/// invalidating the signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Acp {
    conditions: Option<Condition>,
    ciphertext_header_hash: [u8; 32],
    encryptor_verifying_key: [u8; 32],
    encryptor_signature: [u8; 64],
}

impl Acp {
    /// Assemble an ACP from a signature already produced by the encryptor
    /// over `ciphertext_header_hash` (see [`hash_ciphertext_header`]).
    pub fn new(
        conditions: Option<Condition>,
        ciphertext_header_hash: [u8; 32],
        encryptor_verifying_key: [u8; 32],
        encryptor_signature: [u8; 64],
    ) -> Self {
        Self { conditions, ciphertext_header_hash, encryptor_verifying_key, encryptor_signature }
    }

    /// The conditions this ACP gates, once its signature has been checked.
    pub fn conditions(&self) -> Option<&Condition> {
        self.conditions.as_ref()
    }

    /// Verify the encryptor's signature actually covers
    /// `expected_header_hash` — both that the hash this ACP carries
    /// matches the ciphertext a caller is about to act on, and that the
    /// claimed encryptor's signature covers it. Fails closed on any
    /// malformed key or signature bytes.
    pub fn verify(&self, expected_header_hash: &[u8; 32]) -> bool {
        if self.ciphertext_header_hash != *expected_header_hash {
            return false;
        }
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.encryptor_verifying_key) else { return false };
        let signature = Signature::from_bytes(&self.encryptor_signature);
        verifying_key.verify(&self.ciphertext_header_hash, &signature).is_ok()
    }

    /// The encryptor's verifying key. Only meaningful after [`Acp::verify`]
    /// has confirmed the signature — callers deriving `:userAddress` from
    /// it (spec §4.3.2 step 4) must verify first.
    pub fn encryptor_verifying_key(&self) -> &[u8; 32] {
        &self.encryptor_verifying_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer as _, SigningKey};
    use rand_core::OsRng;

    fn sign(signing_key: &SigningKey, header_hash: &[u8; 32]) -> Acp {
        let signature = signing_key.sign(header_hash);
        Acp::new(None, *header_hash, signing_key.verifying_key().to_bytes(), signature.to_bytes())
    }

    #[test]
    fn verifies_against_the_hash_it_was_sealed_with() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let header_hash = hash_ciphertext_header(b"some ciphertext bytes");
        let acp = sign(&signing_key, &header_hash);
        assert!(acp.verify(&header_hash));
    }

    #[test]
    fn fails_against_a_different_header_hash() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let header_hash = hash_ciphertext_header(b"some ciphertext bytes");
        let acp = sign(&signing_key, &header_hash);
        let other_hash = hash_ciphertext_header(b"different ciphertext bytes");
        assert!(!acp.verify(&other_hash));
    }

    #[test]
    fn fails_when_signed_by_a_different_key() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let header_hash = hash_ciphertext_header(b"some ciphertext bytes");
        let mut acp = sign(&signing_key, &header_hash);
        let other_key = SigningKey::generate(&mut OsRng);
        acp.encryptor_verifying_key = other_key.verifying_key().to_bytes();
        assert!(!acp.verify(&header_hash));
    }
}
