//! Session encryption for the `/decrypt` request/response pair.
//!
//! Two distinct key shapes, matching spec §4.2's `SessionStaticSecret` /
//! `SessionStaticPublicKey`:
//!
//! - [`SessionKeyPair`]: the requester's side. Fresh per request, consumed
//!   by [`SessionKeyPair::handshake`] so it can never be reused for a
//!   second one — forward secrecy for that one round-trip.
//! - [`NodeSessionKey`]: the node's side. Deterministically re-derived from
//!   the node's long-term signing identity and a ritual id, so every
//!   participant (and anyone who knows the node's published session public
//!   key for that ritual) arrives at the same key without an extra
//!   handshake round-trip, and a restarted node doesn't lose the ability
//!   to answer in-flight requests.
//!
//! Both sides of one request end up with a [`SessionHandshake`]: a pair of
//! directional ciphers (request/response) derived from the same X25519
//! Diffie-Hellman output via HKDF, so a single shared secret never seals
//! two different messages under the same key.

use crate::error::PreError;
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use hkdf::Hkdf;
use rand_core::OsRng;
use sha2::Sha256;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroizing;

/// A requester's per-retrieval session keypair (spec §4.2's
/// `SessionStaticSecret`): generated fresh for one policy retrieval, then
/// handshaked against *every* cohort member that retrieval contacts before
/// being discarded — unlike [`NodeSessionKey`], it's reusable within that
/// one retrieval (so one ephemeral key serves the whole fan-out) but never
/// persisted past it.
pub struct SessionKeyPair {
    secret: StaticSecret,
    /// The half sent to every peer this retrieval contacts.
    pub public: X25519PublicKey,
}

impl SessionKeyPair {
    /// Generate a fresh session keypair.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = X25519PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Derive the directional cipher pair shared with whoever holds
    /// `their_public`. `context` binds the derived keys to the specific
    /// exchange they seal (e.g. the ritual id), so a handshake computed for
    /// one ritual can't open traffic for another. Borrows rather than
    /// consumes `self` so one session keypair can handshake with every
    /// node in a cohort.
    pub fn handshake(&self, their_public: &X25519PublicKey, context: &[u8]) -> SessionHandshake {
        let shared = self.secret.diffie_hellman(their_public);
        SessionHandshake::from_shared_secret(shared.as_bytes(), context)
    }
}

/// A node's per-ritual session key: a deterministic X25519 keypair derived
/// from the node's long-term signing identity and the ritual id. Unlike
/// [`SessionKeyPair`] it is not consumed by a handshake — the same node
/// answers many requests, from many different requesters, under the one
/// ritual key.
pub struct NodeSessionKey {
    secret: StaticSecret,
    /// The half published (directly, or as part of a ritual's
    /// `participant_public_session_keys`) for requesters to handshake
    /// against.
    pub public: X25519PublicKey,
}

impl NodeSessionKey {
    /// Derive this node's session key for `ritual_id` from its long-term
    /// identity seed. Domain-separated from the identity's other uses (it
    /// signs messages; this derives a DH key) by the HKDF `info` label, and
    /// from other rituals by the `ritual_id` salt.
    pub fn derive(identity_seed: &[u8; 32], ritual_id: u64) -> Self {
        let hk = Hkdf::<Sha256>::new(Some(&ritual_id.to_be_bytes()), identity_seed);
        let mut scalar = Zeroizing::new([0u8; 32]);
        hk.expand(b"taco-ritual-session-key-v1", scalar.as_mut_slice())
            .expect("32-byte okm is within HKDF-SHA256's expand limit");
        let secret = StaticSecret::from(*scalar);
        let public = X25519PublicKey::from(&secret);
        Self { secret, public }
    }

    /// This session key's public half as raw bytes, as published in a
    /// ritual's session-key table.
    pub fn public_bytes(&self) -> [u8; 32] {
        self.public.to_bytes()
    }

    /// Derive the directional cipher pair shared with `their_public` (the
    /// requester's ephemeral public key for this one request).
    pub fn handshake(&self, their_public: &X25519PublicKey, context: &[u8]) -> SessionHandshake {
        let shared = self.secret.diffie_hellman(their_public);
        SessionHandshake::from_shared_secret(shared.as_bytes(), context)
    }
}

/// Two directional AEAD ciphers derived from one Diffie-Hellman output: one
/// for sealing the request, one for the response, so the handshake can
/// seal and open in both directions without ever reusing a (key, nonce)
/// pair for two different messages.
pub struct SessionHandshake {
    request_cipher: ChaCha20Poly1305,
    response_cipher: ChaCha20Poly1305,
}

impl SessionHandshake {
    fn from_shared_secret(shared: &[u8], context: &[u8]) -> Self {
        let hk = Hkdf::<Sha256>::new(None, shared);
        Self {
            request_cipher: derive_cipher(&hk, context, b"request"),
            response_cipher: derive_cipher(&hk, context, b"response"),
        }
    }

    /// Seal a request body, authenticating `aad` alongside it.
    pub fn seal_request(&self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, PreError> {
        seal(&self.request_cipher, plaintext, aad)
    }

    /// Open a request body sealed by the matching `seal_request` call.
    pub fn open_request(&self, ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>, PreError> {
        open(&self.request_cipher, ciphertext, aad)
    }

    /// Seal a response body, authenticating `aad` alongside it.
    pub fn seal_response(&self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, PreError> {
        seal(&self.response_cipher, plaintext, aad)
    }

    /// Open a response body sealed by the matching `seal_response` call.
    pub fn open_response(&self, ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>, PreError> {
        open(&self.response_cipher, ciphertext, aad)
    }
}

fn derive_cipher(hk: &Hkdf<Sha256>, context: &[u8], label: &[u8]) -> ChaCha20Poly1305 {
    let mut info = context.to_vec();
    info.extend_from_slice(label);
    let mut key_bytes = Zeroizing::new([0u8; 32]);
    hk.expand(&info, key_bytes.as_mut_slice()).expect("32-byte okm is within HKDF-SHA256's expand limit");
    ChaCha20Poly1305::new((&*key_bytes).into())
}

/// Each `SessionHandshake` seals exactly one request and one response, each
/// under its own key, so a fixed all-zero nonce never sees two messages
/// under the same key.
fn seal(cipher: &ChaCha20Poly1305, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, PreError> {
    cipher.encrypt(Nonce::from_slice(&[0u8; 12]), Payload { msg: plaintext, aad }).map_err(|_| PreError::Aead)
}

fn open(cipher: &ChaCha20Poly1305, ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>, PreError> {
    cipher.decrypt(Nonce::from_slice(&[0u8; 12]), Payload { msg: ciphertext, aad }).map_err(|_| PreError::Aead)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requester_and_node_derive_the_matching_handshake() {
        let node_key = NodeSessionKey::derive(&[7u8; 32], 7);
        let requester = SessionKeyPair::generate();
        let requester_public = requester.public;

        let requester_handshake = requester.handshake(&node_key.public, b"ritual-7");
        let sealed_request = requester_handshake.seal_request(b"request body", b"aad").unwrap();

        let node_handshake = node_key.handshake(&requester_public, b"ritual-7");
        let opened = node_handshake.open_request(&sealed_request, b"aad").unwrap();
        assert_eq!(opened, b"request body");

        let sealed_response = node_handshake.seal_response(b"response body", b"aad").unwrap();
        let opened_response = requester_handshake.open_response(&sealed_response, b"aad").unwrap();
        assert_eq!(opened_response, b"response body");
    }

    #[test]
    fn request_cipher_cannot_open_a_response_sealed_under_the_same_handshake() {
        let node_key = NodeSessionKey::derive(&[7u8; 32], 7);
        let requester = SessionKeyPair::generate();
        let requester_public = requester.public;

        let requester_handshake = requester.handshake(&node_key.public, b"ritual-7");
        let node_handshake = node_key.handshake(&requester_public, b"ritual-7");
        let sealed_response = node_handshake.seal_response(b"response body", b"aad").unwrap();

        assert!(requester_handshake.open_request(&sealed_response, b"aad").is_err());
    }

    #[test]
    fn mismatched_context_fails_to_handshake_compatibly() {
        let node_key = NodeSessionKey::derive(&[7u8; 32], 7);
        let requester = SessionKeyPair::generate();
        let requester_public = requester.public;

        let requester_handshake = requester.handshake(&node_key.public, b"ritual-7");
        let sealed_request = requester_handshake.seal_request(b"request body", b"aad").unwrap();

        let node_handshake = node_key.handshake(&requester_public, b"ritual-8");
        assert!(node_handshake.open_request(&sealed_request, b"aad").is_err());
    }

    #[test]
    fn one_requester_session_keypair_handshakes_with_several_nodes() {
        let requester = SessionKeyPair::generate();
        let node_a = NodeSessionKey::derive(&[1u8; 32], 1);
        let node_b = NodeSessionKey::derive(&[2u8; 32], 1);

        let handshake_a = requester.handshake(&node_a.public, b"ritual-1");
        let handshake_b = requester.handshake(&node_b.public, b"ritual-1");

        let sealed_a = handshake_a.seal_request(b"to a", b"aad").unwrap();
        let sealed_b = handshake_b.seal_request(b"to b", b"aad").unwrap();

        assert_eq!(
            node_a.handshake(&requester.public, b"ritual-1").open_request(&sealed_a, b"aad").unwrap(),
            b"to a"
        );
        assert_eq!(
            node_b.handshake(&requester.public, b"ritual-1").open_request(&sealed_b, b"aad").unwrap(),
            b"to b"
        );
    }

    #[test]
    fn the_same_ritual_id_always_rederives_the_same_node_session_key() {
        let a = NodeSessionKey::derive(&[3u8; 32], 42);
        let b = NodeSessionKey::derive(&[3u8; 32], 42);
        assert_eq!(a.public_bytes(), b.public_bytes());

        let c = NodeSessionKey::derive(&[3u8; 32], 43);
        assert_ne!(a.public_bytes(), c.public_bytes());
    }
}
