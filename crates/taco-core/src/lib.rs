//! # TACo Core - Layer 1: Foundation
//!
//! **Purpose**: Single source of truth for the identifiers, error type, and
//! wire-envelope conventions shared by every other crate in this workspace.
//!
//! This crate has zero dependencies on other `taco-*` crates. It contains
//! only data types and the thin error taxonomy from the error handling
//! design — no cryptographic operations (`taco-crypto`), no condition
//! evaluation (`taco-conditions`), no network I/O (`taco-node`).
//!
//! # Contents
//!
//! - [`identifiers`]: `Hrac`, `NodeId`, `RitualId`, `PolicyId` and friends.
//! - [`error`]: `TacoError`, the unified error enum, and the per-kind status
//!   mapping used by `taco-node`'s HTTP layer.
//! - [`metadata`]: `NodeMetadata`, the signed record a node publishes about
//!   itself, and the fleet-state checksum it feeds into.
//! - [`envelope`]: version-prefixed binary encoding shared by every wire type.

#![forbid(unsafe_code)]

pub mod envelope;
pub mod error;
pub mod identifiers;
pub mod metadata;

pub use error::{ErrorKind, Result, TacoError};
pub use identifiers::{Hrac, NodeId, PolicyId, RitualId};
pub use metadata::{FleetStateChecksum, NodeMetadata};
