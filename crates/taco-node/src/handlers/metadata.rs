//! `GET /public_information` and `POST /node_metadata`.
//!
//! `GET /public_information` serves this node's own signed record,
//! computed once when the node started and never recomputed per request —
//! a node's reachability and key material don't change within a process
//! lifetime. `POST /node_metadata` is the pairwise gossip exchange (spec
//! §4.3.3): a peer offers its checksum and any records it wants to teach
//! us, and we answer with our own verified set and checksum.

use crate::error::NodeError;
use crate::state::NodeState;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use taco_core::envelope::WireObject;
use taco_core::metadata::{FleetStateChecksum, NodeMetadata};
use taco_directory::LearnOutcome;

pub async fn public_information(State(state): State<NodeState>) -> Result<Response, NodeError> {
    let bytes = state.self_metadata.to_bytes().map_err(NodeError)?;
    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        bytes,
    )
        .into_response())
}

/// Body of a `POST /node_metadata` gossip exchange.
#[derive(Debug, Serialize, Deserialize)]
pub struct MetadataExchangeRequest {
    /// The peer's current fleet-state checksum.
    pub fleet_state_checksum: FleetStateChecksum,
    /// Records the peer is offering us.
    #[serde(default)]
    pub announce_nodes: Vec<NodeMetadata>,
}

/// Body of a `POST /node_metadata` reply.
#[derive(Debug, Serialize, Deserialize)]
pub struct MetadataExchangeResponse {
    /// Our verified set, empty when the peer's checksum already matched
    /// ours (spec §4.3.3 step 1 — nothing new to teach them).
    pub nodes: Vec<NodeMetadata>,
    /// Our fleet-state checksum after folding in whatever the peer
    /// offered.
    pub fleet_state_checksum: FleetStateChecksum,
    /// Unix timestamp (seconds) this reply was produced.
    pub timestamp: u64,
    /// This node's signature over `fleet_state_checksum ‖ timestamp`, so a
    /// peer can attribute the reply even if transport authentication is
    /// ever bypassed.
    pub node_signature: Vec<u8>,
}

pub async fn node_metadata(
    State(state): State<NodeState>,
    Json(request): Json<MetadataExchangeRequest>,
) -> Result<Json<MetadataExchangeResponse>, NodeError> {
    let local_checksum_before = state.directory.snapshot().checksum;

    if request.fleet_state_checksum != local_checksum_before {
        for candidate in request.announce_nodes {
            match state.directory.learn(candidate, state.operator_registry.as_ref()).await {
                Ok(LearnOutcome::Verified) | Ok(LearnOutcome::Sprouted) => {}
                Err(error) => {
                    tracing::debug!(%error, "ignored an offered node record during gossip");
                }
            }
        }
    }

    let snapshot = state.directory.snapshot();
    let nodes = if request.fleet_state_checksum == local_checksum_before {
        Vec::new()
    } else {
        snapshot.verified.values().cloned().collect()
    };

    let timestamp =
        std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
    let mut payload = snapshot.checksum.0.to_vec();
    payload.extend_from_slice(&timestamp.to_be_bytes());
    let node_signature = state.identity.sign(&payload).to_bytes().to_vec();

    Ok(Json(MetadataExchangeResponse {
        nodes,
        fleet_state_checksum: snapshot.checksum,
        timestamp,
        node_signature,
    }))
}
