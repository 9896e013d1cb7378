//! Unified error type for the TACo access-control core.
//!
//! One flat enum rather than a nested hierarchy per crate, following the
//! error kind taxonomy: `Crypto`, `Protocol`, `Authorization`, `Network`,
//! `State`. Each variant carries a human-readable message; callers that need
//! to branch on the failure class use [`TacoError::kind`] rather than
//! matching the variant directly, so the REST status mapping in
//! `taco-node` stays in one place.

use serde::{Deserialize, Serialize};

/// Coarse error classes, mirroring the propagation policy: `Crypto` and
/// `Authorization::*Verification`-style failures bucket the peer as
/// suspicious and are never retried by the node itself; `Network` failures
/// are the caller's concern to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Signature, AEAD, kfrag/cfrag/share verification, or fragment-count
    /// failures. Never retried; indicates active misbehavior.
    Crypto,
    /// Malformed requests, unsupported wire versions, unknown policies or
    /// rituals, revoked grants.
    Protocol,
    /// Condition evaluation outcomes and payment/chain gating.
    Authorization,
    /// Transport-level failures. Retryable by the caller, never by a node.
    Network,
    /// Local preconditions not met (locked keystore, ritual not ready, node
    /// not bonded).
    State,
}

/// Unified error type for all TACo operations.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum TacoError {
    /// A signature failed to verify.
    #[error("signature verification failed: {message}")]
    Signature {
        /// Description of what was being verified.
        message: String,
    },

    /// An AEAD seal or open operation failed.
    #[error("AEAD failure: {message}")]
    Aead {
        /// Description of the AEAD context.
        message: String,
    },

    /// A key fragment failed verification.
    #[error("kfrag verification failed: {message}")]
    KfragVerification {
        /// Description of the failure.
        message: String,
    },

    /// A capsule fragment failed verification.
    #[error("cfrag verification failed: {message}")]
    CfragVerification {
        /// Description of the failure.
        message: String,
    },

    /// A DKG decryption share failed verification.
    #[error("decryption share verification failed: {message}")]
    ShareVerification {
        /// Description of the failure.
        message: String,
    },

    /// Fewer valid fragments/shares were supplied than the threshold
    /// requires.
    #[error("not enough fragments: have {have}, need {need}")]
    NotEnoughFragments {
        /// Fragments actually available.
        have: usize,
        /// Fragments required by the threshold.
        need: usize,
    },

    /// The request body did not parse, or failed a structural check.
    #[error("malformed request: {message}")]
    MalformedRequest {
        /// Description of the parse/validation failure.
        message: String,
    },

    /// The wire version on a request is not supported by this node.
    #[error("unsupported protocol version: {message}")]
    UnsupportedVersion {
        /// Description, usually including the offending version.
        message: String,
    },

    /// No policy exists for the referenced HRAC.
    #[error("unknown policy: {hrac}")]
    UnknownPolicy {
        /// The HRAC that was not found, hex-encoded.
        hrac: String,
    },

    /// No ritual exists for the referenced ritual id.
    #[error("unknown ritual: {ritual_id}")]
    UnknownRitual {
        /// The ritual id that was not found.
        ritual_id: u32,
    },

    /// The policy/node pair has been revoked by the publisher.
    #[error("revoked: {message}")]
    Revoked {
        /// Description, usually naming the hrac/node pair.
        message: String,
    },

    /// The condition evaluated to `false`. Not a systemic error — a
    /// legitimate, expected outcome surfaced with its own status code.
    #[error("condition not satisfied: {message}")]
    ConditionFalse {
        /// Description of which condition failed.
        message: String,
    },

    /// Condition evaluation itself failed (RPC error, schema error, timeout).
    /// Fails closed — treated as a refusal, logged at `error!`.
    #[error("condition evaluation error: {message}")]
    ConditionError {
        /// Description of the evaluation failure.
        message: String,
    },

    /// The policy referenced by this request has not been paid for.
    #[error("unpaid policy: {hrac}")]
    Unpaid {
        /// The HRAC of the unpaid policy, hex-encoded.
        hrac: String,
    },

    /// A condition referenced a chain outside this node's configured
    /// allow-list.
    #[error("unauthorized chain: {chain}")]
    UnauthorizedChain {
        /// The chain identifier that was rejected.
        chain: String,
    },

    /// A network-level failure (timeout, refused connection, TLS handshake,
    /// unreachable peer). Retryable by the caller.
    #[error("network error: {message}")]
    Network {
        /// Description of the network failure.
        message: String,
    },

    /// The local keystore has not been unlocked yet.
    #[error("keystore locked")]
    KeystoreLocked,

    /// The ritual exists but its DKG has not completed.
    #[error("ritual not ready: {ritual_id}")]
    RitualNotReady {
        /// The ritual id that is not yet usable.
        ritual_id: u32,
    },

    /// The node is not bonded to a staking provider.
    #[error("node not bonded: {message}")]
    NodeNotBonded {
        /// Description of the bonding failure.
        message: String,
    },

    /// An unexpected internal failure. MUST map to `500` and MUST NOT leak
    /// partial cryptographic output.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the unexpected failure.
        message: String,
    },
}

impl TacoError {
    /// Classify this error into its coarse [`ErrorKind`] bucket.
    pub fn kind(&self) -> ErrorKind {
        use TacoError::*;
        match self {
            Signature { .. }
            | Aead { .. }
            | KfragVerification { .. }
            | CfragVerification { .. }
            | ShareVerification { .. }
            | NotEnoughFragments { .. } => ErrorKind::Crypto,
            MalformedRequest { .. }
            | UnsupportedVersion { .. }
            | UnknownPolicy { .. }
            | UnknownRitual { .. }
            | Revoked { .. } => ErrorKind::Protocol,
            ConditionFalse { .. } | ConditionError { .. } | Unpaid { .. } | UnauthorizedChain { .. } => {
                ErrorKind::Authorization
            }
            Network { .. } => ErrorKind::Network,
            KeystoreLocked | RitualNotReady { .. } | NodeNotBonded { .. } => ErrorKind::State,
            Internal { .. } => ErrorKind::Protocol,
        }
    }

    /// `true` for the small set of failures that indicate a peer is
    /// actively misbehaving rather than merely unlucky, and so should
    /// bucket the originating node as suspicious per the propagation
    /// policy.
    pub fn indicates_misbehavior(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Crypto
        ) && !matches!(self, TacoError::NotEnoughFragments { .. })
    }

    /// Build an [`TacoError::Internal`] from any displayable error, for the
    /// node's catch-all `500` path.
    pub fn internal(message: impl Into<String>) -> Self {
        TacoError::Internal { message: message.into() }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, TacoError>;
