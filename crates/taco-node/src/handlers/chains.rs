//! `GET /condition_chains` — this node's per-node chain allow-list.

use crate::state::NodeState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct ConditionChainsResponse {
    /// Chain ids this node will evaluate condition leaves against.
    pub allowed_chains: Vec<u64>,
}

pub async fn condition_chains(State(state): State<NodeState>) -> Json<ConditionChainsResponse> {
    Json(ConditionChainsResponse { allowed_chains: state.config.allowed_chains.clone() })
}
