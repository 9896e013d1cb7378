//! # TACo Crypto — Layer 1: Crypto Primitives (C2)
//!
//! Thin semantic wrapper over two independent cryptosystems:
//!
//! - [`pre`]: Umbral-style proxy re-encryption (split-key re-encryption),
//!   via the `umbral-pre` crate — the same library the upstream
//!   `nucypher-core` uses.
//! - [`dkg`]: Ferveo-style threshold decryption over a pre-established
//!   ritual, via the `threshold_crypto` crate's pairing-based threshold
//!   encryption scheme.
//!
//! Plus the supporting primitives every node/publisher/recipient needs:
//!
//! - [`signing`]: long-term Schnorr-style signing keypairs (`ed25519-dalek`).
//! - [`session`]: the requester's ephemeral per-request session keypair and
//!   the node's deterministic per-ritual session key, together sealing a
//!   `/decrypt` request and response under a handshake neither side needs
//!   a prior round-trip to agree on (`x25519-dalek`).
//!
//! # Unforgeable verification witnesses
//!
//! [`pre::VerifiedKeyFrag`] and [`pre::VerifiedCapsuleFrag`] cannot be
//! constructed except by a successful verification call — the type itself
//! is the witness that verification happened. The same
//! discipline applies to [`dkg::VerifiedDecryptionShare`].

#![forbid(unsafe_code)]

pub mod dkg;
pub mod error;
pub mod pre;
pub mod session;
pub mod signing;

pub use error::{DkgError, PreError};
