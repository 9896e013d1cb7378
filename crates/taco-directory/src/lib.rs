//! # TACo Directory — Layer 2: Peer Directory & Fleet State (C4)
//!
//! Tracks what this process knows about the rest of the network: which
//! nodes it has verified bonding for, which it has only just heard about
//! from a peer, and a checksum summarizing the verified set so two
//! directories can cheaply confirm they agree without comparing full node
//! lists.
//!
//! [`PeerDirectory`] follows a single-writer, many-reader-snapshot
//! discipline: readers call [`PeerDirectory::snapshot`] and get a cheap
//! `Arc` clone of the current [`DirectorySnapshot`] with no lock held
//! across their use of it; the only place that constructs a new snapshot
//! is [`PeerDirectory::learn`], serialized behind a single lock.
//!
//! Bonding verification — confirming an operator key actually authorized a
//! node's identity key for a given staking provider address — is an
//! external collaborator's job; see [`registry::OperatorRegistry`].

#![forbid(unsafe_code)]

pub mod directory;
pub mod error;
pub mod learning;
pub mod registry;

pub use directory::{DirectorySnapshot, LearnOutcome, PeerDirectory};
pub use error::DirectoryError;
pub use learning::LearningSchedule;
pub use registry::OperatorRegistry;
