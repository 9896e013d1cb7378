//! The background gossip loop: periodically pick a known peer, offer it
//! our checksum and newest records, fold whatever it teaches us back into
//! the directory, and adapt the wait between rounds to how much progress
//! the round made (spec §4.4's learning loop).
//!
//! One task per running node, spawned by the embedding binary (not this
//! crate's `lib.rs`, matching the "no process-startup orchestration
//! beyond the library" boundary every other ambient concern in this
//! workspace observes).

use crate::handlers::metadata::{MetadataExchangeRequest, MetadataExchangeResponse};
use crate::state::NodeState;
use rand::seq::SliceRandom;
use taco_core::metadata::NodeMetadata;
use taco_directory::{LearnOutcome, LearningSchedule, OperatorRegistry, PeerDirectory};
use std::sync::Arc;

/// Run learning rounds forever, sleeping [`LearningSchedule::interval`]
/// between each. Intended to be spawned as its own task; returns only if
/// cancelled (the task is aborted, not signalled to stop cooperatively,
/// matching how `taco-testkit`'s `NodeCluster` tears its nodes down).
pub async fn run(state: NodeState, http: reqwest::Client, scheme: &'static str) -> ! {
    let mut schedule = LearningSchedule::default();
    loop {
        tokio::time::sleep(schedule.interval()).await;
        match run_one_round(&state, &http, scheme).await {
            RoundOutcome::NoPeers => schedule.record_no_progress(),
            RoundOutcome::Progress => schedule.record_progress(),
            RoundOutcome::NoProgress => schedule.record_no_progress(),
        }
    }
}

enum RoundOutcome {
    NoPeers,
    Progress,
    NoProgress,
}

/// One gossip round: pick a peer uniformly at random from the verified
/// set, POST `/node_metadata`, and learn whatever it offers back.
async fn run_one_round(state: &NodeState, http: &reqwest::Client, scheme: &str) -> RoundOutcome {
    let snapshot = state.directory.snapshot();
    let Some(peer) = snapshot.verified.values().collect::<Vec<_>>().choose(&mut rand::thread_rng()).copied().cloned()
    else {
        return RoundOutcome::NoPeers;
    };

    let mut recent: Vec<NodeMetadata> = snapshot.verified.values().cloned().collect();
    recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    recent.truncate(8);

    let request = MetadataExchangeRequest { fleet_state_checksum: snapshot.checksum, announce_nodes: recent };

    let url = format!("{scheme}://{}:{}/node_metadata", peer.host, peer.port);
    let response = match http.post(&url).json(&request).send().await {
        Ok(response) if response.status().is_success() => response,
        _ => {
            tracing::debug!(peer = %peer.node_id(), "gossip round failed to reach peer");
            return RoundOutcome::NoProgress;
        }
    };

    let Ok(body) = response.json::<MetadataExchangeResponse>().await else {
        return RoundOutcome::NoProgress;
    };

    ingest(&state.directory, state.operator_registry.as_ref(), body.nodes).await
}

async fn ingest(
    directory: &Arc<PeerDirectory>,
    registry: &dyn OperatorRegistry,
    nodes: Vec<NodeMetadata>,
) -> RoundOutcome {
    let mut progressed = false;
    for candidate in nodes {
        match directory.learn(candidate, registry).await {
            Ok(LearnOutcome::Verified | LearnOutcome::Sprouted) => progressed = true,
            Err(error) => tracing::debug!(%error, "ignored a taught record"),
        }
    }
    if progressed {
        RoundOutcome::Progress
    } else {
        RoundOutcome::NoProgress
    }
}
