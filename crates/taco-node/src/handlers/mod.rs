//! One module per REST endpoint, matching `service::build_router`'s route
//! table one-to-one.

pub mod chains;
pub mod decrypt;
pub mod metadata;
pub mod ping;
pub mod reencrypt;
pub mod revoke;
pub mod status;
