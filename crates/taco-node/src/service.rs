//! Builds the axum router exposing this node's REST surface.

use crate::handlers::{chains, decrypt, metadata, ping, reencrypt, revoke, status};
use crate::state::NodeState;
use axum::routing::{get, post};
use axum::Router;

/// Build the node's router, ready to be served with
/// `axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())`
/// so `/ping` can read the caller's observed address.
pub fn build_router(state: NodeState) -> Router {
    Router::new()
        .route("/reencrypt", post(reencrypt::reencrypt))
        .route("/decrypt", post(decrypt::decrypt))
        .route("/revoke", post(revoke::revoke))
        .route("/node_metadata", post(metadata::node_metadata))
        .route("/public_information", get(metadata::public_information))
        .route("/ping", get(ping::ping))
        .route("/condition_chains", get(chains::condition_chains))
        .route("/status", get(status::status))
        .with_state(state)
}
