//! Node metadata and the fleet-state checksum it feeds.

use crate::envelope::WireObject;
use crate::identifiers::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Signed record binding a node's reachability and key material.
///
/// The `operator_signature` is produced by the external staking/operator
/// registry's operator key and proves that key authorized `verifying_key`
/// for `staking_provider_address`; verifying it against that registry is
/// out of scope here and left to the caller via
/// `taco_directory::OperatorRegistry`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Hostname or IP the node is reachable at.
    pub host: String,
    /// TCP port the node's REST surface listens on.
    pub port: u16,
    /// Long-term signing (verifying) key, canonical bytes.
    pub verifying_key: Vec<u8>,
    /// Long-term decrypting (encrypting) key, canonical bytes.
    pub encrypting_key: Vec<u8>,
    /// Per-ritual-eligible DKG public key, canonical bytes.
    pub ferveo_public_key: Vec<u8>,
    /// DER-encoded self-signed TLS certificate, pinned by callers instead
    /// of relying on a public CA.
    pub tls_der: Vec<u8>,
    /// Unix timestamp (seconds) this record was authored.
    pub timestamp: u64,
    /// Signature over the record's canonical bytes by `verifying_key`.
    pub self_signature: Vec<u8>,
    /// Signature proving the operator key authorized this identity key.
    pub operator_signature: Vec<u8>,
    /// Staking provider address this node is bonded to.
    pub staking_provider_address: String,
    /// Network domain (e.g. `"mainnet"`, `"lynx"`) this node serves.
    pub domain: String,
}

impl NodeMetadata {
    /// Node id derived from this record's verifying key.
    pub fn node_id(&self) -> NodeId {
        NodeId::from_verifying_key(&self.verifying_key)
    }

    /// Bytes the self-signature and operator-signature are computed over:
    /// every field except the two signatures themselves.
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(self.host.as_bytes());
        buf.extend_from_slice(&self.port.to_be_bytes());
        buf.extend_from_slice(&self.verifying_key);
        buf.extend_from_slice(&self.encrypting_key);
        buf.extend_from_slice(&self.ferveo_public_key);
        buf.extend_from_slice(&self.tls_der);
        buf.extend_from_slice(&self.timestamp.to_be_bytes());
        buf.extend_from_slice(self.staking_provider_address.as_bytes());
        buf.extend_from_slice(self.domain.as_bytes());
        buf
    }

    /// Stable hash of this record, used as the unit the fleet-state
    /// checksum is computed over.
    pub fn metadata_hash(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.signing_payload());
        hasher.update(&self.self_signature);
        hasher.update(&self.operator_signature);
        *hasher.finalize().as_bytes()
    }
}

impl WireObject for NodeMetadata {
    fn brand() -> [u8; 4] {
        *b"NMta"
    }
}

/// `H(sorted(node_metadata_hashes))` — a deterministic summary of a fleet's
/// verified node set. Two directories sharing a checksum are known to
/// share the same verified set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FleetStateChecksum(pub [u8; 32]);

impl FleetStateChecksum {
    /// Compute the checksum over an already-sorted slice of metadata
    /// hashes. Callers are responsible for sorting (`taco_directory`'s
    /// `PeerDirectory` does this internally).
    pub fn from_sorted_hashes(sorted_hashes: &[[u8; 32]]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for h in sorted_hashes {
            hasher.update(h);
        }
        Self(*hasher.finalize().as_bytes())
    }

    /// Hex-encoded representation.
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for FleetStateChecksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
