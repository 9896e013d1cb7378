//! Directory failure classes.

/// Failures learning or serving peer metadata.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DirectoryError {
    /// A node's self-signature did not verify against its own claimed key.
    #[error("self-signature invalid for node {node_id}")]
    SelfSignatureInvalid {
        /// Hex-encoded node id the bad record claimed.
        node_id: String,
    },

    /// The external operator registry rejected this node's bonding.
    #[error("node {node_id} is not bonded: {reason}")]
    NotBonded {
        /// Hex-encoded node id.
        node_id: String,
        /// Registry-supplied reason.
        reason: String,
    },

    /// A peer tried to teach us our own metadata under our own node id.
    #[error("refused to learn self metadata from a peer")]
    SelfMetadataRejected,

    /// A peer offered a record older than (or equal to) one we already
    /// hold for that node id; gossip only moves forward in time.
    #[error("stale metadata for node {node_id}: offered timestamp {offered} <= known {known}")]
    StaleMetadata {
        /// Hex-encoded node id.
        node_id: String,
        /// Timestamp on the rejected record.
        offered: u64,
        /// Timestamp already on file.
        known: u64,
    },

    /// The registry lookup itself failed (network error, etc).
    #[error("operator registry lookup failed: {0}")]
    RegistryUnavailable(String),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, DirectoryError>;
