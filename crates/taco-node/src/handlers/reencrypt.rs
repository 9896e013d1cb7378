//! `POST /reencrypt` — the PRE access path.

use crate::error::NodeError;
use crate::state::NodeState;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use taco_conditions::{Condition, EvalContext};
use taco_core::error::TacoError;
use taco_core::Hrac;
use taco_crypto::pre::{self, EncryptedKeyFrag};
use umbral_pre::{Capsule, DeserializableFromArray, PublicKey, SerializableToArray};

/// Body of a reencryption request. `capsules`/`conditions` are
/// parallel-ordered (spec §4.3.1 input): `conditions[i]` gates
/// `capsules[i]`, `None` meaning that capsule reencrypts unconditionally.
/// A request names at least one capsule.
#[derive(Debug, Deserialize)]
pub struct ReencryptRequest {
    /// The policy this kfrag belongs to.
    pub hrac: Hrac,
    /// Umbral-serialized `Capsule` bytes, one per capsule being
    /// reencrypted in this request.
    pub capsules: Vec<Vec<u8>>,
    /// This node's key fragment, encrypted to its decrypting key.
    pub encrypted_kfrag: EncryptedKeyFrag,
    /// The publisher's long-term verifying key, canonical bytes.
    pub publisher_verifying_key: Vec<u8>,
    /// The policy's delegating (encrypting) public key, canonical bytes.
    pub policy_encrypting_key: Vec<u8>,
    /// The recipient's encrypting public key, canonical bytes.
    pub recipient_encrypting_key: Vec<u8>,
    /// The requesting recipient's (Bob's) long-term verifying key,
    /// canonical bytes. Used by this node to derive `:userAddress` itself
    /// (spec §4.3.1 step 4) rather than trusting whatever the recipient
    /// put in `context` — a recipient controls its own request body, so an
    /// address taken from free-form `context` rather than this dedicated
    /// field would let it claim to be any address for an on-chain
    /// authorization check.
    pub bob_verifying_key: Vec<u8>,
    /// Access conditions to evaluate before reencrypting, one per capsule.
    pub conditions: Vec<Option<Condition>>,
    /// Values the recipient supplies to satisfy condition context
    /// variables other than `:userAddress`, which this node overwrites.
    pub context: EvalContext,
}

/// Body of a successful reencryption response. Spec §4.3.1 step 6:
/// `ReencryptionResponse = sign(node_signing_key, (capsules, cfrags))`.
#[derive(Debug, Serialize)]
pub struct ReencryptResponse {
    /// Umbral-serialized `CapsuleFrag` bytes, one per requested capsule, in
    /// the same order as the request's `capsules`.
    pub cfrags: Vec<Vec<u8>>,
    /// This node's signature over `capsules ‖ cfrags` (each concatenated
    /// in order), so a recipient can attribute a reply to the node that
    /// produced it even if the transport layer's own authentication is
    /// ever bypassed.
    pub node_signature: Vec<u8>,
}

pub async fn reencrypt(
    State(state): State<NodeState>,
    Json(request): Json<ReencryptRequest>,
) -> Result<Json<ReencryptResponse>, NodeError> {
    if state.config.payment_required
        && !state
            .payment_backend
            .is_paid(&request.hrac)
            .await
            .map_err(|message| NodeError(TacoError::Network { message }))?
    {
        return Err(NodeError(TacoError::Unpaid { hrac: request.hrac.to_hex() }));
    }

    if state.revocations.read().contains(&request.hrac) {
        return Err(NodeError(TacoError::Revoked {
            message: format!("policy {} revoked at this node", request.hrac.to_hex()),
        }));
    }

    if request.capsules.is_empty() || request.capsules.len() != request.conditions.len() {
        return Err(NodeError(TacoError::MalformedRequest {
            message: "capsules and conditions must be equal-length and nonempty".into(),
        }));
    }

    let publisher_verifying_key = parse_public_key(&request.publisher_verifying_key)?;
    let policy_encrypting_key = parse_public_key(&request.policy_encrypting_key)?;
    let recipient_encrypting_key = parse_public_key(&request.recipient_encrypting_key)?;

    let raw_kfrag =
        request
            .encrypted_kfrag
            .decrypt(&state.decrypting_key, &publisher_verifying_key, &request.hrac)?;
    let verified_kfrag = pre::verify_kfrag(
        raw_kfrag,
        &publisher_verifying_key,
        &policy_encrypting_key,
        &recipient_encrypting_key,
    )?;

    let mut context = request.context.clone();
    context.set(
        "userAddress",
        serde_json::Value::String(taco_crypto::signing::derive_user_address(&request.bob_verifying_key)),
    );

    // Spec §4.3.1 step 4: conditions are conceptually independent per
    // capsule, but the source implementation short-circuits the whole
    // request the moment any one of them fails or errors — no cfrag
    // material is produced for *any* capsule in that case. Preserved here
    // even though it is more conservative than it needs to be (spec §9).
    for condition in &request.conditions {
        let Some(condition) = condition else { continue };
        let satisfied = taco_conditions::evaluate(condition, &context, state.condition_backend.as_ref())
            .await
            .map_err(NodeError::from)?;
        if !satisfied {
            return Err(NodeError(TacoError::ConditionFalse {
                message: format!("conditions not satisfied for policy {}", request.hrac.to_hex()),
            }));
        }
    }

    let mut capsules = Vec::with_capacity(request.capsules.len());
    let mut cfrags_bytes = Vec::with_capacity(request.capsules.len());
    for capsule_bytes in &request.capsules {
        let capsule_array: [u8; 98] = capsule_bytes
            .as_slice()
            .try_into()
            .map_err(|_| NodeError(TacoError::MalformedRequest { message: "malformed capsule bytes".into() }))?;
        let capsule = Capsule::from_array(&capsule_array)
            .map_err(|e| NodeError(TacoError::MalformedRequest { message: format!("{e:?}") }))?;

        let cfrag = pre::reencrypt_capsule(&capsule, &verified_kfrag);
        cfrags_bytes.push(cfrag.inner().to_array().as_slice().to_vec());
        capsules.push(capsule_bytes.clone());
    }

    let mut signature_payload = Vec::new();
    for capsule_bytes in &capsules {
        signature_payload.extend_from_slice(capsule_bytes);
    }
    for cfrag_bytes in &cfrags_bytes {
        signature_payload.extend_from_slice(cfrag_bytes);
    }
    let node_signature = state.identity.sign(&signature_payload).to_bytes().to_vec();

    Ok(Json(ReencryptResponse { cfrags: cfrags_bytes, node_signature }))
}

fn parse_public_key(bytes: &[u8]) -> Result<PublicKey, NodeError> {
    let array: [u8; 33] = bytes
        .try_into()
        .map_err(|_| NodeError(TacoError::MalformedRequest { message: "malformed public key bytes".into() }))?;
    PublicKey::from_array(&array)
        .map_err(|e| NodeError(TacoError::MalformedRequest { message: format!("{e:?}") }))
}
