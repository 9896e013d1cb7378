//! Revocation: a publisher certifying that a specific node should stop
//! serving a policy, independent of that policy's normal expiry.

use serde::{Deserialize, Serialize};
use taco_core::envelope::WireObject;
use taco_core::identifiers::NodeId;
use taco_core::Hrac;
use taco_crypto::signing::{verify_from_bytes, Identity};

/// A publisher-signed statement that `node_id` should no longer honor
/// reencryption requests for `hrac`. Carries no enforcement mechanism of
/// its own — a node applies it by simply dropping its copy of the
/// corresponding [`crate::treasure_map::TreasureMap`] destination entry (or
/// the kfrag behind it) once the signature checks out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevocationCertificate {
    /// The policy being revoked.
    pub hrac: Hrac,
    /// The node this certificate applies to.
    pub node_id: NodeId,
    /// The publisher's verifying key, canonical bytes.
    pub publisher_verifying_key: Vec<u8>,
    /// Signature over `hrac ‖ node_id` by the publisher's signing identity.
    pub publisher_signature: Vec<u8>,
}

impl WireObject for RevocationCertificate {
    fn brand() -> [u8; 4] {
        *b"Revk"
    }
}

impl RevocationCertificate {
    /// Sign a revocation of `hrac` for `node_id` using the publisher's
    /// identity.
    pub fn sign(signing_identity: &Identity, hrac: Hrac, node_id: NodeId) -> Self {
        let payload = signing_payload(hrac, node_id);
        let signature = signing_identity.sign(&payload);
        Self {
            hrac,
            node_id,
            publisher_verifying_key: signing_identity.verifying_key().to_bytes().to_vec(),
            publisher_signature: signature.to_bytes().to_vec(),
        }
    }

    /// Verify this certificate's signature against its own embedded
    /// verifying key. Callers that require the certificate come from the
    /// specific publisher that granted the policy should additionally
    /// compare `publisher_verifying_key` against the key on file for that
    /// policy — this method only checks internal self-consistency.
    pub fn is_valid(&self) -> bool {
        let payload = signing_payload(self.hrac, self.node_id);
        verify_from_bytes(&self.publisher_verifying_key, &payload, &self.publisher_signature)
    }
}

fn signing_payload(hrac: Hrac, node_id: NodeId) -> Vec<u8> {
    let mut buf = hrac.0.to_vec();
    buf.extend_from_slice(&node_id.0);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_certificate_signed_by_the_publisher_validates() {
        let identity = Identity::generate();
        let hrac = Hrac::derive(b"pub", b"rec", b"label");
        let node_id = NodeId([7; 20]);

        let cert = RevocationCertificate::sign(&identity, hrac, node_id);
        assert!(cert.is_valid());
    }

    #[test]
    fn a_tampered_certificate_fails_validation() {
        let identity = Identity::generate();
        let hrac = Hrac::derive(b"pub", b"rec", b"label");
        let node_id = NodeId([7; 20]);

        let mut cert = RevocationCertificate::sign(&identity, hrac, node_id);
        cert.node_id = NodeId([9; 20]);
        assert!(!cert.is_valid());
    }

    #[test]
    fn revocation_certificate_round_trips_over_the_wire() {
        let identity = Identity::generate();
        let cert = RevocationCertificate::sign(&identity, Hrac::derive(b"a", b"b", b"c"), NodeId([1; 20]));
        let bytes = cert.to_bytes().unwrap();
        let back = RevocationCertificate::from_bytes(&bytes).unwrap();
        assert!(back.is_valid());
    }
}
