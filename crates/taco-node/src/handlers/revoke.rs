//! `POST /revoke` — a publisher certifying this node should stop serving a
//! policy, independent of that policy's normal expiry.

use crate::error::NodeError;
use crate::state::NodeState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use taco_core::error::TacoError;
use taco_core::Hrac;
use taco_crypto::signing::verify_from_bytes;

/// Body of a revocation request, self-contained: the publisher proves
/// ownership of the policy by signing `hrac ‖ this node's id` directly,
/// rather than this node having to look up who granted `hrac` elsewhere.
#[derive(Debug, Deserialize)]
pub struct RevokeRequest {
    /// The policy being revoked at this node.
    pub hrac: Hrac,
    /// The publisher's verifying key, canonical bytes.
    pub publisher_verifying_key: Vec<u8>,
    /// Signature over `hrac ‖ node_id` by the publisher's signing identity.
    pub publisher_signature: Vec<u8>,
}

pub async fn revoke(
    State(state): State<NodeState>,
    Json(request): Json<RevokeRequest>,
) -> Result<StatusCode, NodeError> {
    let node_id = state.node_id();
    let mut payload = request.hrac.0.to_vec();
    payload.extend_from_slice(&node_id.0);

    if !verify_from_bytes(&request.publisher_verifying_key, &payload, &request.publisher_signature) {
        return Err(NodeError(TacoError::Signature { message: "revocation signature invalid".into() }));
    }

    state.revocations.write().insert(request.hrac);
    tracing::info!(hrac = %request.hrac, "policy revoked at this node");
    Ok(StatusCode::NO_CONTENT)
}
