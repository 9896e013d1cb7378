//! Umbral-style proxy re-encryption.
//!
//! Built directly on the `umbral-pre` crate (the same library the upstream
//! `nucypher-core` uses), so the wire-level shapes here are interoperable
//! with the real NuCypher/TACo network's PRE layer.

use crate::error::PreError;
use serde::{Deserialize, Serialize};
use taco_core::Hrac;
use umbral_pre::{
    decrypt_original, decrypt_reencrypted, encrypt, reencrypt as umbral_reencrypt, Capsule,
    CapsuleFrag, DeserializableFromArray, KeyFrag, PublicKey, SecretKey, SerializableToArray,
    Signer, VerifiedCapsuleFrag as UmbralVerifiedCapsuleFrag, VerifiedKeyFrag as UmbralVerifiedKeyFrag,
};

/// A key fragment that has passed [`UmbralVerifiedKeyFrag`]'s verification.
/// There is no public constructor other than [`verify_kfrag`] — the type
/// itself is the witness that verification happened.
#[derive(Debug, Clone)]
pub struct VerifiedKeyFrag(UmbralVerifiedKeyFrag);

impl VerifiedKeyFrag {
    /// Access the underlying `umbral-pre` type for calls into that crate
    /// (e.g. [`reencrypt_capsule`]).
    pub fn inner(&self) -> &UmbralVerifiedKeyFrag {
        &self.0
    }
}

/// A capsule fragment that has passed verification against a specific
/// `(capsule, policy_encrypting_key, delegating_pk, receiving_pk)` tuple.
/// No public constructor other than [`verify_cfrag`].
#[derive(Debug, Clone)]
pub struct VerifiedCapsuleFrag(UmbralVerifiedCapsuleFrag);

impl VerifiedCapsuleFrag {
    /// Access the underlying `umbral-pre` type.
    pub fn inner(&self) -> &UmbralVerifiedCapsuleFrag {
        &self.0
    }
}

/// Generate `shares` verifiable key fragments for a publisher's delegating
/// key, such that any `threshold` of the returned fragments suffice to
/// reconstruct access.
pub fn generate_kfrags(
    delegating_sk: &SecretKey,
    receiving_pk: &PublicKey,
    signer: &Signer,
    threshold: usize,
    shares: usize,
) -> Result<(Vec<VerifiedKeyFrag>, PublicKey), PreError> {
    if threshold == 0 || threshold > shares {
        return Err(PreError::InvalidParameters(format!(
            "threshold {threshold} must be nonzero and <= shares {shares}"
        )));
    }
    let policy_encrypting_key = delegating_sk.public_key();
    let kfrags = umbral_pre::generate_kfrags(
        delegating_sk,
        receiving_pk,
        signer,
        threshold as u8,
        shares as u8,
        true,
        true,
    );
    Ok((kfrags.into_iter().map(VerifiedKeyFrag).collect(), policy_encrypting_key))
}

/// Verify a raw [`KeyFrag`] received over the wire against the policy
/// parameters a node or recipient expects it to carry provenance for.
pub fn verify_kfrag(
    kfrag: KeyFrag,
    publisher_verifying_key: &PublicKey,
    policy_encrypting_key: &PublicKey,
    recipient_encrypting_key: &PublicKey,
) -> Result<VerifiedKeyFrag, PreError> {
    kfrag
        .verify(publisher_verifying_key, Some(policy_encrypting_key), Some(recipient_encrypting_key))
        .map(VerifiedKeyFrag)
        .map_err(|e| PreError::KfragVerification(format!("{e:?}")))
}

/// Perform one partial re-encryption. Deterministic given its inputs; no
/// mutable state.
pub fn reencrypt_capsule(capsule: &Capsule, kfrag: &VerifiedKeyFrag) -> VerifiedCapsuleFrag {
    VerifiedCapsuleFrag(umbral_reencrypt(capsule, kfrag.0.clone()))
}

/// Verify a raw [`CapsuleFrag`] returned by a node against the policy
/// parameters the recipient expects.
pub fn verify_cfrag(
    cfrag: CapsuleFrag,
    capsule: &Capsule,
    publisher_verifying_key: &PublicKey,
    policy_encrypting_key: &PublicKey,
    recipient_encrypting_key: &PublicKey,
) -> Result<VerifiedCapsuleFrag, PreError> {
    cfrag
        .verify(capsule, publisher_verifying_key, policy_encrypting_key, recipient_encrypting_key)
        .map(VerifiedCapsuleFrag)
        .map_err(|e| PreError::CfragVerification(format!("{e:?}")))
}

/// Combine `threshold`-or-more verified capsule fragments with the
/// recipient's secret key to recover the original plaintext.
pub fn decrypt_with_cfrags(
    receiving_sk: &SecretKey,
    delegating_pk: &PublicKey,
    capsule: &Capsule,
    cfrags: &[VerifiedCapsuleFrag],
    threshold: usize,
    ciphertext: &[u8],
) -> Result<Vec<u8>, PreError> {
    if cfrags.len() < threshold {
        return Err(PreError::NotEnoughCfrags { have: cfrags.len(), need: threshold });
    }
    let owned: Vec<UmbralVerifiedCapsuleFrag> = cfrags.iter().map(|c| c.0.clone()).collect();
    decrypt_reencrypted(receiving_sk, delegating_pk, capsule, owned, ciphertext)
        .map(|b| b.to_vec())
        .map_err(|_| PreError::Aead)
}

/// Encrypt `plaintext` under `delegating_pk`, producing the capsule/
/// ciphertext pair a `MessageKit` carries.
pub fn encrypt_original(delegating_pk: &PublicKey, plaintext: &[u8]) -> Result<(Capsule, Vec<u8>), PreError> {
    let (capsule, ciphertext) =
        encrypt(delegating_pk, plaintext).map_err(|e| PreError::InvalidParameters(format!("{e:?}")))?;
    Ok((capsule, ciphertext.to_vec()))
}

/// Decrypt a capsule/ciphertext pair directly with the delegating secret
/// key, bypassing re-encryption entirely (used only by the publisher
/// itself, never by a node or recipient).
pub fn decrypt_with_delegating_key(
    delegating_sk: &SecretKey,
    capsule: &Capsule,
    ciphertext: &[u8],
) -> Result<Vec<u8>, PreError> {
    decrypt_original(delegating_sk, capsule, ciphertext).map(|b| b.to_vec()).map_err(|_| PreError::Aead)
}

/// A key fragment encrypted to a specific node's long-term encrypting key,
/// authenticated by the publisher's signature, and bound to the policy's
/// HRAC so a node can't be tricked into applying it to the wrong policy.
///
/// Built on the same public-key-encryption primitive as `MessageKit`
/// (`encrypt`/`decrypt_original`), matching how the upstream
/// `nucypher-core` encrypts kfrags and treasure maps alike.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedKeyFrag {
    capsule_bytes: Vec<u8>,
    ciphertext: Vec<u8>,
    publisher_signature: Vec<u8>,
}

impl EncryptedKeyFrag {
    /// Encrypt `kfrag` to `recipient_encrypting_key`, binding it to `hrac`
    /// and signing the ciphertext with the publisher's signer.
    pub fn new(
        signer: &Signer,
        recipient_encrypting_key: &PublicKey,
        hrac: &Hrac,
        kfrag: &VerifiedKeyFrag,
    ) -> Result<Self, PreError> {
        let kfrag_bytes =
            bincode::serialize(&kfrag.0.clone().unverify()).map_err(|e| PreError::InvalidParameters(e.to_string()))?;
        let mut message = hrac.0.to_vec();
        message.extend_from_slice(&kfrag_bytes);
        let (capsule, ciphertext) = encrypt_original(recipient_encrypting_key, &message)?;
        let signature_payload = [capsule.to_array().as_slice(), &ciphertext].concat();
        let signature = signer.sign(&signature_payload);
        Ok(Self {
            capsule_bytes: capsule.to_array().as_slice().to_vec(),
            ciphertext,
            publisher_signature: bincode::serialize(&signature).map_err(|e| PreError::InvalidParameters(e.to_string()))?,
        })
    }

    /// Decrypt and verify this fragment as the node it was addressed to.
    ///
    /// Returns the raw [`KeyFrag`] still requiring [`verify_kfrag`] against
    /// the policy's publisher/policy/recipient keys — decrypting the
    /// envelope and verifying provenance are the two separate steps
    /// are kept separate (`403` for the former, `401` for the latter).
    pub fn decrypt(
        &self,
        node_decrypting_key: &SecretKey,
        publisher_verifying_key: &PublicKey,
        hrac: &Hrac,
    ) -> Result<KeyFrag, PreError> {
        let capsule = Capsule::from_array(
            &self
                .capsule_bytes
                .as_slice()
                .try_into()
                .map_err(|_| PreError::InvalidParameters("malformed capsule bytes".into()))?,
        )
        .map_err(|e| PreError::InvalidParameters(format!("{e:?}")))?;
        let signature_payload = [self.capsule_bytes.as_slice(), &self.ciphertext].concat();
        let signature: umbral_pre::Signature =
            bincode::deserialize(&self.publisher_signature).map_err(|e| PreError::InvalidParameters(e.to_string()))?;
        if !signature.verify(publisher_verifying_key, &signature_payload) {
            return Err(PreError::KfragVerification("publisher signature invalid".into()));
        }
        let plaintext = decrypt_with_delegating_key(
            &unsafe_key_view(node_decrypting_key),
            &capsule,
            &self.ciphertext,
        )?;
        if plaintext.len() < 16 || &plaintext[..16] != hrac.0.as_slice() {
            return Err(PreError::KfragVerification("hrac mismatch".into()));
        }
        bincode::deserialize(&plaintext[16..]).map_err(|e| PreError::InvalidParameters(e.to_string()))
    }
}

/// `decrypt_with_delegating_key` takes its secret key by value in some
/// `umbral-pre` versions and by reference in others; this indirection keeps
/// the call site above stable regardless, cloning is cheap for a scalar.
fn unsafe_key_view(sk: &SecretKey) -> SecretKey {
    sk.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::OsRng;

    fn keypair() -> (SecretKey, PublicKey) {
        let sk = SecretKey::random();
        let pk = sk.public_key();
        (sk, pk)
    }

    #[test]
    fn threshold_cfrags_recover_plaintext() {
        let (delegating_sk, delegating_pk) = keypair();
        let (receiving_sk, receiving_pk) = keypair();
        let (publisher_signing_sk, publisher_verifying_pk) = keypair();
        let signer = Signer::new(publisher_signing_sk);

        let (verified_kfrags, policy_pk) =
            generate_kfrags(&delegating_sk, &receiving_pk, &signer, 2, 3).unwrap();
        assert_eq!(policy_pk, delegating_pk);

        let (capsule, ciphertext) = encrypt_original(&delegating_pk, b"hello").unwrap();

        let cfrags: Vec<_> = verified_kfrags
            .iter()
            .take(2)
            .map(|kfrag| reencrypt_capsule(&capsule, kfrag))
            .collect();

        let plaintext =
            decrypt_with_cfrags(&receiving_sk, &delegating_pk, &capsule, &cfrags, 2, &ciphertext).unwrap();
        assert_eq!(plaintext, b"hello");
        let _ = publisher_verifying_pk;
        let _ = OsRng;
    }

    #[test]
    fn fewer_than_threshold_cfrags_fail_closed() {
        let (delegating_sk, delegating_pk) = keypair();
        let (_, receiving_pk) = keypair();
        let (publisher_signing_sk, _) = keypair();
        let signer = Signer::new(publisher_signing_sk);

        let (verified_kfrags, _) = generate_kfrags(&delegating_sk, &receiving_pk, &signer, 2, 3).unwrap();
        let (capsule, _ciphertext) = encrypt_original(&delegating_pk, b"hello").unwrap();
        let cfrags = vec![reencrypt_capsule(&capsule, &verified_kfrags[0])];

        let err = decrypt_with_cfrags(
            &SecretKey::random(),
            &delegating_pk,
            &capsule,
            &cfrags,
            2,
            b"irrelevant",
        )
        .unwrap_err();
        assert!(matches!(err, PreError::NotEnoughCfrags { have: 1, need: 2 }));
    }

    #[test]
    fn encrypted_kfrag_round_trips_through_a_node() {
        let (delegating_sk, _) = keypair();
        let (receiving_sk, receiving_pk) = keypair();
        let (node_decrypting_sk, node_encrypting_pk) = keypair();
        let (publisher_signing_sk, publisher_verifying_pk) = keypair();
        let signer = Signer::new(publisher_signing_sk);

        let (verified_kfrags, _) = generate_kfrags(&delegating_sk, &receiving_pk, &signer, 1, 1).unwrap();
        let hrac = Hrac::derive(publisher_verifying_pk.to_array().as_slice(), b"recipient", b"label");

        let encrypted = EncryptedKeyFrag::new(&signer, &node_encrypting_pk, &hrac, &verified_kfrags[0]).unwrap();
        let decrypted = encrypted.decrypt(&node_decrypting_sk, &publisher_verifying_pk, &hrac).unwrap();
        let _ = verify_kfrag(decrypted, &publisher_verifying_pk, &delegating_sk.public_key(), &receiving_pk);
    }
}
