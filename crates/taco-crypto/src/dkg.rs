//! Ferveo-style threshold decryption over a DKG ritual.
//!
//! The actual distributed key generation ceremony — nodes jointly producing
//! share material with no trusted dealer — is an off-band, multi-round
//! protocol among the ritual's cohort and is out of this crate's scope
//! (it belongs to the orchestration layer that drives the ceremony).
//! What this module provides is everything downstream of that ceremony:
//! given a ritual's already-agreed `PublicKeySet` and a node's own share,
//! encrypt to the ritual, produce a decryption share, verify one, and
//! combine a threshold of them back into plaintext.
//!
//! Built on `threshold_crypto`'s BLS12-381 pairing-based scheme, whose
//! `PublicKeySet`/`SecretKeyShare`/`Ciphertext` types already implement a
//! hybrid encrypt-to-aggregate-key scheme, so no separate DEM layer is
//! needed here.

use crate::error::DkgError;
use std::collections::BTreeMap;
use taco_core::RitualId;
use threshold_crypto::{
    Ciphertext, DecryptionShare, PublicKeySet, PublicKeyShare, SecretKeyShare,
};

/// The public material a completed DKG ritual produces: an aggregate
/// encryption key plus enough structure to verify any participant's
/// decryption share against it, plus every participant's published session
/// public key (spec §3's `participant_public_session_keys`) so a recipient
/// can open a session handshake with any cohort member without a prior
/// round-trip.
#[derive(Debug, Clone)]
pub struct RitualPublicKey {
    ritual_id: RitualId,
    threshold: usize,
    public_key_set: PublicKeySet,
    session_public_keys: BTreeMap<usize, [u8; 32]>,
}

impl RitualPublicKey {
    /// Wrap a ritual's already-agreed public key set. `threshold` is the
    /// number of shares required to decrypt, one less than the ceremony's
    /// `t+1` convention elsewhere in this crate family. `session_public_keys`
    /// maps each participant's cohort index to the session public key it
    /// published at ritual formation time.
    pub fn new(
        ritual_id: RitualId,
        threshold: usize,
        public_key_set: PublicKeySet,
        session_public_keys: BTreeMap<usize, [u8; 32]>,
    ) -> Self {
        Self { ritual_id, threshold, public_key_set, session_public_keys }
    }

    /// The ritual this key belongs to.
    pub fn ritual_id(&self) -> RitualId {
        self.ritual_id
    }

    /// Shares required to decrypt.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// The session public key published by the participant at `index`, if
    /// the ritual recorded one.
    pub fn session_public_key(&self, index: usize) -> Option<[u8; 32]> {
        self.session_public_keys.get(&index).copied()
    }

    fn public_key_share(&self, index: usize) -> PublicKeyShare {
        self.public_key_set.public_key_share(index)
    }
}

/// Encrypt `plaintext` to a ritual's aggregate public key.
pub fn encrypt_for_ritual(ritual: &RitualPublicKey, plaintext: &[u8]) -> Ciphertext {
    ritual.public_key_set.public_key().encrypt(plaintext)
}

/// Produce this node's decryption share for `ciphertext`. `share_index` is
/// the node's index within the ritual's cohort, fixed at ritual formation.
pub fn derive_decryption_share(
    secret_key_share: &SecretKeyShare,
    ciphertext: &Ciphertext,
) -> Result<DecryptionShare, DkgError> {
    secret_key_share
        .decrypt_share(ciphertext)
        .ok_or_else(|| DkgError::InvalidParameters("ciphertext failed its own integrity check".into()))
}

/// A decryption share that has passed verification against the ritual's
/// public key material for a specific ciphertext. No public constructor
/// other than [`verify_decryption_share`].
#[derive(Debug, Clone)]
pub struct VerifiedDecryptionShare {
    share_index: usize,
    share: DecryptionShare,
}

/// Verify `share` was honestly computed by cohort member `share_index`
/// for `ciphertext`.
pub fn verify_decryption_share(
    ritual: &RitualPublicKey,
    share_index: usize,
    share: &DecryptionShare,
    ciphertext: &Ciphertext,
) -> Result<VerifiedDecryptionShare, DkgError> {
    let public_share = ritual.public_key_share(share_index);
    if !public_share.verify_decryption_share(share, ciphertext) {
        return Err(DkgError::ShareVerification(format!("share from index {share_index} failed verification")));
    }
    Ok(VerifiedDecryptionShare { share_index, share: share.clone() })
}

/// Combine `threshold`-or-more verified decryption shares and recover the
/// plaintext `ciphertext` was encrypted for.
pub fn combine_and_decrypt(
    ritual: &RitualPublicKey,
    shares: &[VerifiedDecryptionShare],
    ciphertext: &Ciphertext,
) -> Result<Vec<u8>, DkgError> {
    if shares.len() < ritual.threshold {
        return Err(DkgError::NotEnoughShares { have: shares.len(), need: ritual.threshold });
    }
    let map: BTreeMap<usize, DecryptionShare> =
        shares.iter().map(|s| (s.share_index, s.share.clone())).collect();
    ritual
        .public_key_set
        .decrypt(&map, ciphertext)
        .map_err(|e| DkgError::InvalidParameters(format!("{e:?}")))
        .and_then(|plaintext| if plaintext.is_empty() { Err(DkgError::Aead) } else { Ok(plaintext) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;
    use threshold_crypto::SecretKeySet;

    /// Stand-in for the real off-band ceremony: a trusted dealer splitting
    /// one secret key. Production rituals never run this — it exists here
    /// only so these tests have a `(public_key_set, shares)` pair to work
    /// with.
    fn trusted_dealer_ritual(threshold: usize, shares: usize) -> (PublicKeySet, Vec<SecretKeyShare>) {
        let sks = SecretKeySet::random(threshold, &mut thread_rng());
        let pks = sks.public_keys();
        let shares = (0..shares).map(|i| sks.secret_key_share(i)).collect();
        (pks, shares)
    }

    #[test]
    fn threshold_shares_recover_plaintext() {
        let (pks, shares) = trusted_dealer_ritual(2, 4);
        let ritual = RitualPublicKey::new(RitualId(1), 3, pks, std::collections::BTreeMap::new());
        let ciphertext = encrypt_for_ritual(&ritual, b"threshold secret");

        let verified: Vec<_> = shares
            .iter()
            .enumerate()
            .take(3)
            .map(|(i, sk)| {
                let share = derive_decryption_share(sk, &ciphertext).unwrap();
                verify_decryption_share(&ritual, i, &share, &ciphertext).unwrap()
            })
            .collect();

        let plaintext = combine_and_decrypt(&ritual, &verified, &ciphertext).unwrap();
        assert_eq!(plaintext, b"threshold secret");
    }

    #[test]
    fn fewer_than_threshold_shares_fail_closed() {
        let (pks, shares) = trusted_dealer_ritual(2, 4);
        let ritual = RitualPublicKey::new(RitualId(1), 3, pks, std::collections::BTreeMap::new());
        let ciphertext = encrypt_for_ritual(&ritual, b"threshold secret");

        let share = derive_decryption_share(&shares[0], &ciphertext).unwrap();
        let verified = verify_decryption_share(&ritual, 0, &share, &ciphertext).unwrap();

        let err = combine_and_decrypt(&ritual, &[verified], &ciphertext).unwrap_err();
        assert!(matches!(err, DkgError::NotEnoughShares { have: 1, need: 3 }));
    }

    #[test]
    fn share_from_wrong_index_fails_verification() {
        let (pks, shares) = trusted_dealer_ritual(2, 4);
        let ritual = RitualPublicKey::new(RitualId(1), 3, pks, std::collections::BTreeMap::new());
        let ciphertext = encrypt_for_ritual(&ritual, b"threshold secret");

        let share = derive_decryption_share(&shares[0], &ciphertext).unwrap();
        let err = verify_decryption_share(&ritual, 1, &share, &ciphertext).unwrap_err();
        assert!(matches!(err, DkgError::ShareVerification(_)));
    }
}
