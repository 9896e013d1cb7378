//! # TACo Node — Layer 3: Node Service (C3)
//!
//! The REST surface a running node (an "Ursula") exposes to publishers,
//! recipients, and other nodes: `/reencrypt` and `/decrypt` for the two
//! access paths, `/public_information` for this node's own signed
//! identity, `/node_metadata` for the pairwise gossip exchange with
//! another node, `/ping` for NAT self-detection, `/condition_chains` for
//! capability discovery, and `/status` for operational visibility.
//!
//! Payment confirmation and condition-leaf reads are both external
//! collaborators this crate only calls through: [`payment::PaymentBackend`]
//! and `taco_conditions::ConditionBackend` respectively. Bonding
//! verification lives one layer down in `taco_directory::OperatorRegistry`.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod learning;
pub mod payment;
pub mod rituals;
pub mod service;
pub mod state;

pub use config::NodeConfig;
pub use error::NodeError;
pub use payment::PaymentBackend;
pub use service::build_router;
pub use state::NodeState;
