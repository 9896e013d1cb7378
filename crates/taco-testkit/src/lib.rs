//! # TACo Testkit
//!
//! In-memory fakes for every external collaborator this workspace defines a
//! trait for ([`fakes::FakeConditionBackend`], [`fakes::FakePaymentBackend`],
//! [`fakes::FakeStakingRegistry`]), plus [`cluster::NodeCluster`], a harness
//! that spawns real in-process node services on loopback for integration
//! tests that need an actual HTTP round-trip.
//!
//! Nothing here is reachable from non-test code in any other crate; this
//! crate exists purely to make `tests/` directories elsewhere in the
//! workspace short and free of hand-rolled fakes.

#![forbid(unsafe_code)]

pub mod cluster;
pub mod fakes;

pub use cluster::{NodeCluster, RunningNode};
pub use fakes::{AlwaysBondedRegistry, FakeConditionBackend, FakePaymentBackend, FakeStakingRegistry};
