//! # TACo Policy — Layer 4: Policy Protocol (C5)
//!
//! Orchestrates the three roles around a policy: [`publisher::Publisher`]
//! grants access by splitting a key across a cohort, [`recipient::Recipient`]
//! retrieves it by fanning a reencryption or threshold-decryption request
//! out to that cohort and collecting a threshold of responses, and
//! [`revocation`] lets a publisher certify that a node should stop serving
//! a policy.
//!
//! Everything below this layer — condition evaluation, PRE/DKG primitives,
//! peer directory lookups — is a dependency, not a reimplementation; this
//! crate's job is sequencing those calls correctly under partial failure.

#![forbid(unsafe_code)]

pub mod error;
pub mod publisher;
pub mod recipient;
pub mod revocation;
pub mod treasure_map;

pub use error::{GrantError, RetrieveError};
pub use publisher::Publisher;
pub use recipient::Recipient;
pub use treasure_map::TreasureMap;
