//! Long-term signing identities.
//!
//! Every node, publisher, and recipient holds one of these for as long as
//! it participates in the network; `session` keys above are the
//! short-lived counterpart used per request.

use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use rand_core::OsRng;

/// A long-term signing keypair.
pub struct Identity {
    signing_key: SigningKey,
}

impl Identity {
    /// Generate a fresh identity.
    pub fn generate() -> Self {
        Self { signing_key: SigningKey::generate(&mut OsRng) }
    }

    /// Reconstruct an identity from its 32-byte secret scalar, e.g. when
    /// loading a node's persisted keystore.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self { signing_key: SigningKey::from_bytes(bytes) }
    }

    /// The public half, safe to publish in node metadata.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Sign `message`.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    /// This identity's raw secret bytes, used as HKDF input keying material
    /// for deriving a [`crate::session::NodeSessionKey`] per ritual. Never
    /// serialized or sent over the wire.
    pub fn session_seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

/// Verify `signature` over `message` under `verifying_key`.
pub fn verify(verifying_key: &VerifyingKey, message: &[u8], signature: &Signature) -> bool {
    verifying_key.verify(message, signature).is_ok()
}

/// Derive a stable, hex-encoded address string from a verifying key's
/// canonical bytes, for binding an authenticated signer to a condition's
/// `:userAddress` context variable (spec §4.3.1 step 4, §4.3.2 step 4) —
/// a node computes this itself from a key it has reason to trust rather
/// than accepting an address string the requester supplies directly.
pub fn derive_user_address(verifying_key_bytes: &[u8]) -> String {
    format!("0x{}", blake3::hash(verifying_key_bytes).to_hex())
}

/// Verify a signature given raw key/signature bytes as carried over the
/// wire (e.g. in `NodeMetadata`). Malformed bytes are treated as a failed
/// verification rather than an error — a caller checking a signature never
/// needs to distinguish "wrong key" from "not a key at all".
pub fn verify_from_bytes(verifying_key_bytes: &[u8], message: &[u8], signature_bytes: &[u8]) -> bool {
    let Ok(key_array) = <[u8; 32]>::try_from(verifying_key_bytes) else { return false };
    let Ok(sig_array) = <[u8; 64]>::try_from(signature_bytes) else { return false };
    let Ok(verifying_key) = VerifyingKey::from_bytes(&key_array) else { return false };
    let signature = Signature::from_bytes(&sig_array);
    verify(&verifying_key, message, &signature)
}
