//! Identifier types used across the TACo access-control core.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Hashed Resource Access Code — the 16-byte policy identifier, derived
/// deterministically as `truncate16(H(publisher_vk ‖ recipient_vk ‖ label))`.
///
/// See [`Hrac::derive`] for the derivation. `blake3` is used for the
/// truncated hash since nothing in this core needs on-chain hash
/// compatibility with keccak or blake2b.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hrac(pub [u8; 16]);

impl Hrac {
    /// Derive an HRAC from the publisher's verifying key, the recipient's
    /// verifying key, and the policy label.
    pub fn derive(publisher_verifying_key: &[u8], recipient_verifying_key: &[u8], label: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(publisher_verifying_key);
        hasher.update(recipient_verifying_key);
        hasher.update(label);
        let digest = hasher.finalize();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest.as_bytes()[..16]);
        Self(bytes)
    }

    /// Hex-encoded representation, used in error messages and status dumps.
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Hrac {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hrac({})", self.to_hex())
    }
}

impl fmt::Display for Hrac {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Identifies a node (Ursula) by the fingerprint of its long-term verifying
/// key. Stable across host/port changes — the metadata record, not this id,
/// carries reachability information.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub [u8; 20]);

impl NodeId {
    /// Derive a node id from a verifying key's canonical bytes.
    pub fn from_verifying_key(verifying_key_bytes: &[u8]) -> Self {
        let digest = blake3::hash(verifying_key_bytes);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest.as_bytes()[..20]);
        Self(bytes)
    }

    /// Hex-encoded representation.
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.to_hex())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Identifies a completed DKG ritual. Assigned by the (out-of-core) ritual
/// setup process; opaque here beyond being a small integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RitualId(pub u32);

impl fmt::Display for RitualId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A policy identifier. In this core a policy is addressed by its `Hrac`
/// directly; `PolicyId` exists as a distinct type so call sites that take
/// "the id of a policy" don't accidentally accept an arbitrary byte string.
pub type PolicyId = Hrac;
