//! Maps every failure this crate can produce onto `taco_core::TacoError`
//! and then onto an HTTP status code. This is the one place that mapping
//! happens; handlers never construct a `StatusCode` directly.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use taco_conditions::ConditionError;
use taco_core::error::ErrorKind;
use taco_core::TacoError;
use taco_crypto::{DkgError, PreError};
use taco_directory::DirectoryError;

/// A request-handling failure, always reducible to a `TacoError`.
#[derive(Debug, Clone, thiserror::Error)]
#[error(transparent)]
pub struct NodeError(#[from] pub TacoError);

impl From<PreError> for NodeError {
    fn from(err: PreError) -> Self {
        let taco = match err {
            PreError::KfragVerification(m) => TacoError::KfragVerification { message: m },
            PreError::CfragVerification(m) => TacoError::CfragVerification { message: m },
            PreError::NotEnoughCfrags { have, need } => TacoError::NotEnoughFragments { have, need },
            PreError::Aead => TacoError::Aead { message: "PRE envelope decryption failed".into() },
            PreError::InvalidParameters(m) => TacoError::MalformedRequest { message: m },
        };
        Self(taco)
    }
}

impl From<DkgError> for NodeError {
    fn from(err: DkgError) -> Self {
        let taco = match err {
            DkgError::ShareVerification(m) => TacoError::ShareVerification { message: m },
            DkgError::NotEnoughShares { have, need } => TacoError::NotEnoughFragments { have, need },
            DkgError::Aead => TacoError::Aead { message: "DKG share combination failed".into() },
            DkgError::InvalidParameters(m) => TacoError::MalformedRequest { message: m },
        };
        Self(taco)
    }
}

impl From<ConditionError> for NodeError {
    fn from(err: ConditionError) -> Self {
        let taco = match err {
            ConditionError::UnauthorizedChain(chain) => TacoError::UnauthorizedChain { chain },
            ConditionError::ReturnValueMismatch(_) => {
                TacoError::ConditionFalse { message: err.to_string() }
            }
            other => TacoError::ConditionError { message: other.to_string() },
        };
        Self(taco)
    }
}

impl From<DirectoryError> for NodeError {
    fn from(err: DirectoryError) -> Self {
        let message = err.to_string();
        let taco = match err {
            DirectoryError::NotBonded { .. } => TacoError::NodeNotBonded { message },
            _ => TacoError::MalformedRequest { message },
        };
        Self(taco)
    }
}

fn status_for(error: &TacoError) -> StatusCode {
    match error {
        TacoError::Aead { .. } => StatusCode::FORBIDDEN,
        TacoError::Signature { .. }
        | TacoError::KfragVerification { .. }
        | TacoError::CfragVerification { .. }
        | TacoError::ShareVerification { .. } => StatusCode::UNAUTHORIZED,
        TacoError::NotEnoughFragments { .. } => StatusCode::CONFLICT,
        TacoError::MalformedRequest { .. } | TacoError::UnsupportedVersion { .. } => StatusCode::BAD_REQUEST,
        TacoError::UnknownPolicy { .. } | TacoError::UnknownRitual { .. } => StatusCode::NOT_FOUND,
        TacoError::Revoked { .. } | TacoError::UnauthorizedChain { .. } | TacoError::NodeNotBonded { .. } => {
            StatusCode::FORBIDDEN
        }
        // 428 Precondition Required: the condition simply hasn't opened
        // yet (e.g. a time-lock), distinct from the outright refusals
        // above — spec §6's status table maps this case to 428, not 403.
        TacoError::ConditionFalse { .. } => StatusCode::PRECONDITION_REQUIRED,
        TacoError::ConditionError { .. } => StatusCode::SERVICE_UNAVAILABLE,
        TacoError::Unpaid { .. } => StatusCode::PAYMENT_REQUIRED,
        TacoError::Network { .. } => StatusCode::BAD_GATEWAY,
        TacoError::KeystoreLocked => StatusCode::SERVICE_UNAVAILABLE,
        TacoError::RitualNotReady { .. } => StatusCode::CONFLICT,
        TacoError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: String,
}

impl IntoResponse for NodeError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if matches!(self.0.kind(), ErrorKind::Crypto) {
            tracing::warn!(error = %self.0, "request failed a cryptographic check");
        } else if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "internal error handling request");
        } else {
            tracing::debug!(error = %self.0, "request rejected");
        }
        let kind = match self.0.kind() {
            ErrorKind::Crypto => "crypto",
            ErrorKind::Protocol => "protocol",
            ErrorKind::Authorization => "authorization",
            ErrorKind::Network => "network",
            ErrorKind::State => "state",
        };
        let body = ErrorBody { kind, message: self.0.to_string() };
        (status, Json(body)).into_response()
    }
}
