//! Orchestration-layer failure classes.

/// Failures while a publisher grants a policy.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GrantError {
    /// The cohort offered to `grant` has fewer members than `shares`
    /// requires.
    #[error("cohort too small: have {have}, need {need}")]
    CohortTooSmall {
        /// Nodes actually offered.
        have: usize,
        /// Shares the policy requires.
        need: usize,
    },

    /// The cohort offered to `grant` names the same node more than once —
    /// a `TreasureMap` keyed by node id can't give that node more than one
    /// fragment, so a duplicate would silently shrink `destinations` below
    /// `shares`.
    #[error("duplicate node in cohort: {node_id}")]
    DuplicateNode {
        /// The node id that appeared more than once, hex-encoded.
        node_id: String,
    },

    /// The underlying PRE key-splitting operation failed.
    #[error("key splitting failed: {0}")]
    Pre(#[from] taco_crypto::PreError),
}

/// Failures while a recipient retrieves access to a policy.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RetrieveError {
    /// Fewer nodes returned usable fragments/shares than the policy's
    /// threshold requires, even after trying every destination.
    #[error("threshold not met: collected {collected}, needed {needed} (from {attempted} attempted)")]
    ThresholdNotMet {
        /// Valid fragments/shares collected.
        collected: usize,
        /// Threshold required.
        needed: usize,
        /// Destinations contacted.
        attempted: usize,
    },

    /// The final combination/decryption step failed even though threshold
    /// fragments were collected (tampered ciphertext, wrong keys).
    #[error("decryption failed after reaching threshold: {0}")]
    Decryption(String),

    /// No conditions were attached, but the caller required the policy be
    /// conditioned (a misconfigured grant, not a network failure).
    #[error("policy is unconditioned but a condition was required")]
    NotConditioned,

    /// The treasure map's expiration has been reached or passed; the policy
    /// is no longer honored regardless of how many nodes are reachable.
    #[error("policy expired at {expiration}, request arrived at {now}")]
    Expired {
        /// The policy's expiration, unix seconds.
        expiration: u64,
        /// The time the retrieval was attempted, unix seconds.
        now: u64,
    },
}
