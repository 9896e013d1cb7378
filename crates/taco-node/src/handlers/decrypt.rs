//! `POST /decrypt` — the DKG threshold-decryption access path.
//!
//! Unlike `/reencrypt`, the request and response bodies here are sealed
//! under a session handshake (spec §4.2/§4.3.2): the requester's ephemeral
//! session public key travels in the clear alongside the sealed plaintext
//! body, and this node derives its own side of the handshake from its
//! long-term identity and the ritual id — no prior round-trip needed to
//! agree on a key, and a share never travels unsealed even over a channel
//! an attacker could record and later break the node's long-term key for.

use crate::error::NodeError;
use crate::state::NodeState;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use taco_conditions::{Acp, EvalContext};
use taco_core::error::TacoError;
use taco_core::{Hrac, RitualId};
use taco_crypto::dkg;
use taco_crypto::session::NodeSessionKey;
use threshold_crypto::Ciphertext;
use x25519_dalek::PublicKey as X25519PublicKey;

/// The plaintext decryption-share request, sealed inside an
/// [`EncryptedDecryptRequest`]'s `sealed_body`.
#[derive(Debug, Serialize, Deserialize)]
pub struct DecryptRequestBody {
    /// The policy this request is decrypting under.
    pub hrac: Hrac,
    /// Bincode-serialized `threshold_crypto::Ciphertext`.
    pub ciphertext: Vec<u8>,
    /// The access control policy: conditions plus the encryptor's
    /// signature over this ciphertext's header hash (spec §3's
    /// `ThresholdMessageKit`/ACP), verified before any share is derived.
    pub acp: Acp,
    /// Context values for condition evaluation other than `:ritualId` and
    /// `:userAddress`, which this node injects itself.
    pub context: EvalContext,
}

/// Body of an encrypted decryption-share request.
#[derive(Debug, Deserialize)]
pub struct EncryptedDecryptRequest {
    /// The ritual whose session key this request handshakes against. Sent
    /// in the clear — it names a key, it isn't one.
    pub ritual_id: RitualId,
    /// The requester's one-shot session public key.
    pub session_public: [u8; 32],
    /// A bincode-encoded [`DecryptRequestBody`], sealed under the
    /// handshake between `session_public` and this node's per-ritual
    /// session key.
    pub sealed_body: Vec<u8>,
}

/// The plaintext decryption-share response, sealed inside an
/// [`EncryptedDecryptResponse`]'s `sealed_body`.
#[derive(Debug, Serialize, Deserialize)]
pub struct DecryptResponseBody {
    /// This node's index within the ritual cohort, so the recipient knows
    /// which public key share to verify against.
    pub share_index: usize,
    /// Bincode-serialized `threshold_crypto::DecryptionShare`.
    pub share: Vec<u8>,
}

/// Body of a successful, sealed decryption-share response.
#[derive(Debug, Serialize)]
pub struct EncryptedDecryptResponse {
    /// A bincode-encoded [`DecryptResponseBody`], sealed under the same
    /// handshake the request was opened with.
    pub sealed_body: Vec<u8>,
}

pub async fn decrypt(
    State(state): State<NodeState>,
    Json(request): Json<EncryptedDecryptRequest>,
) -> Result<Json<EncryptedDecryptResponse>, NodeError> {
    let session_key = NodeSessionKey::derive(&state.identity.session_seed(), u64::from(request.ritual_id.0));
    let their_public = X25519PublicKey::from(request.session_public);
    let aad = request.ritual_id.0.to_be_bytes();
    let handshake = session_key.handshake(&their_public, &aad);

    let body_bytes = handshake.open_request(&request.sealed_body, &aad).map_err(NodeError::from)?;
    let body: DecryptRequestBody = bincode::deserialize(&body_bytes)
        .map_err(|e| NodeError(TacoError::MalformedRequest { message: e.to_string() }))?;

    if state.config.payment_required
        && !state
            .payment_backend
            .is_paid(&body.hrac)
            .await
            .map_err(|message| NodeError(TacoError::Network { message }))?
    {
        return Err(NodeError(TacoError::Unpaid { hrac: body.hrac.to_hex() }));
    }

    let material = state
        .rituals
        .get(request.ritual_id)
        .ok_or_else(|| NodeError(TacoError::UnknownRitual { ritual_id: request.ritual_id.0 }))?;

    // Spec §4.3.2 step 3: verify the ACP's encryptor signature covers this
    // ciphertext's header hash before trusting anything else it carries —
    // its conditions, and the encryptor identity `:userAddress` is derived
    // from below, are only as trustworthy as this signature.
    let header_hash = taco_conditions::hash_ciphertext_header(&body.ciphertext);
    if !body.acp.verify(&header_hash) {
        return Err(NodeError(TacoError::Signature {
            message: format!("ACP encryptor signature invalid for policy {}", body.hrac.to_hex()),
        }));
    }

    let mut context = body.context;
    context.set("ritualId", serde_json::Value::from(request.ritual_id.0));
    context.set(
        "userAddress",
        serde_json::Value::String(taco_crypto::signing::derive_user_address(body.acp.encryptor_verifying_key())),
    );

    if let Some(condition) = body.acp.conditions() {
        let satisfied = taco_conditions::evaluate(condition, &context, state.condition_backend.as_ref())
            .await
            .map_err(NodeError::from)?;
        if !satisfied {
            return Err(NodeError(TacoError::ConditionFalse {
                message: format!("conditions not satisfied for policy {}", body.hrac.to_hex()),
            }));
        }
    }

    let ciphertext: Ciphertext = bincode::deserialize(&body.ciphertext)
        .map_err(|e| NodeError(TacoError::MalformedRequest { message: e.to_string() }))?;

    let share = dkg::derive_decryption_share(&material.secret_share, &ciphertext)?;
    let share_bytes =
        bincode::serialize(&share).map_err(|e| NodeError(TacoError::Internal { message: e.to_string() }))?;
    let response_body = DecryptResponseBody { share_index: material.share_index, share: share_bytes };
    let response_bytes = bincode::serialize(&response_body)
        .map_err(|e| NodeError(TacoError::Internal { message: e.to_string() }))?;
    let sealed_body = handshake.seal_response(&response_bytes, &aad).map_err(NodeError::from)?;

    Ok(Json(EncryptedDecryptResponse { sealed_body }))
}
