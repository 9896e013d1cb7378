//! `GET /status` — a quick operational snapshot for monitoring and the
//! `taco-testkit` scenario harness.

use crate::state::NodeState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct StatusResponse {
    /// Network domain this node serves.
    pub domain: String,
    /// This node's fleet-state checksum, hex-encoded.
    pub fleet_state_checksum: String,
    /// Verified peers this node currently knows about.
    pub verified_peer_count: usize,
    /// Peers heard about but not yet bonding-confirmed.
    pub sprout_peer_count: usize,
}

pub async fn status(State(state): State<NodeState>) -> Json<StatusResponse> {
    let snapshot = state.directory.snapshot();
    Json(StatusResponse {
        domain: state.config.domain.clone(),
        fleet_state_checksum: snapshot.checksum.to_hex(),
        verified_peer_count: snapshot.verified.len(),
        sprout_peer_count: snapshot.sprout.len(),
    })
}
