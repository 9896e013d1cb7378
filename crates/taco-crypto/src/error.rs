//! Crypto-layer error types. Kept distinct from [`taco_core::TacoError`] so
//! this crate has no dependency on any particular error-to-status mapping;
//! `taco-node` converts these at its boundary.

/// Failures from the PRE (Umbral) layer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PreError {
    /// A key fragment failed verification against the expected
    /// delegating/receiving/signing keys.
    #[error("kfrag verification failed: {0}")]
    KfragVerification(String),

    /// A capsule fragment failed verification against the expected policy
    /// parameters.
    #[error("cfrag verification failed: {0}")]
    CfragVerification(String),

    /// Fewer verified capsule fragments were supplied than the policy's
    /// threshold requires.
    #[error("not enough cfrags: have {have}, need {need}")]
    NotEnoughCfrags {
        /// Capsule fragments actually supplied.
        have: usize,
        /// Threshold required.
        need: usize,
    },

    /// The final AEAD decryption step failed (wrong key, tampered
    /// ciphertext, or a genuinely invalid — not merely unverified — cfrag
    /// slipped through).
    #[error("AEAD decryption failed")]
    Aead,

    /// The underlying `umbral-pre` primitive rejected its inputs (e.g.
    /// `threshold` of `0`, or `threshold > shares`).
    #[error("invalid PRE parameters: {0}")]
    InvalidParameters(String),
}

/// Failures from the DKG (threshold-decryption) layer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DkgError {
    /// A decryption share failed verification against the ritual's public
    /// key material.
    #[error("decryption share verification failed: {0}")]
    ShareVerification(String),

    /// Fewer verified shares were supplied than the ritual's threshold
    /// requires.
    #[error("not enough shares: have {have}, need {need}")]
    NotEnoughShares {
        /// Shares actually supplied.
        have: usize,
        /// Threshold required.
        need: usize,
    },

    /// Shares were combined successfully but the resulting symmetric key
    /// failed to open the AEAD body (tampered ciphertext, or mismatched
    /// AAD).
    #[error("AEAD decryption failed")]
    Aead,

    /// The underlying `threshold_crypto` primitive rejected its inputs.
    #[error("invalid DKG parameters: {0}")]
    InvalidParameters(String),
}
