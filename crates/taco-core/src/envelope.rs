//! Version-prefixed binary envelope shared by every wire type.
//!
//! # Invariants
//!
//! - `encode()` / `decode()` are symmetric (round-trip safe, bit for bit).
//! - Compatibility across versions requires an exact match on the major
//!   version: a decoder rejects a payload whose major version
//!   differs from its own, even if it could parse the bytes.
//!
//! # Wire format
//!
//! - `brand`: `[u8; 4]` ASCII tag identifying the payload type (`b"ReRq"`
//!   for a `ReencryptionRequest`, and so on) — a cheap sanity check before
//!   attempting to deserialize the body as the wrong type.
//! - `major`, `minor`: `u16` each.
//! - `body`: bincode-encoded payload bytes.
//!
//! # Safety
//!
//! This module is `#![forbid(unsafe_code)]`.

#![forbid(unsafe_code)]

use crate::error::TacoError;
use serde::{de::DeserializeOwned, Serialize};

/// Implemented by every type that travels on the wire between Publisher,
/// Node, and Recipient. Mirrors the brand+version pattern used by the
/// upstream `nucypher-core` crate's `ProtocolObject`.
pub trait WireObject: Serialize + DeserializeOwned + Sized {
    /// Four-byte ASCII tag identifying this payload type on the wire.
    fn brand() -> [u8; 4];

    /// `(major, minor)` version of this payload's encoding.
    fn version() -> (u16, u16) {
        (1, 0)
    }

    /// Encode `self` into a versioned, branded byte string.
    fn to_bytes(&self) -> Result<Vec<u8>, TacoError> {
        let (major, minor) = Self::version();
        let body = bincode::serialize(self)
            .map_err(|e| TacoError::MalformedRequest { message: format!("encode failed: {e}") })?;
        let mut out = Vec::with_capacity(8 + body.len());
        out.extend_from_slice(&Self::brand());
        out.extend_from_slice(&major.to_be_bytes());
        out.extend_from_slice(&minor.to_be_bytes());
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Decode a versioned, branded byte string produced by [`to_bytes`].
    ///
    /// [`to_bytes`]: WireObject::to_bytes
    fn from_bytes(bytes: &[u8]) -> Result<Self, TacoError> {
        if bytes.len() < 8 {
            return Err(TacoError::MalformedRequest {
                message: "envelope shorter than header".into(),
            });
        }
        let (header, body) = bytes.split_at(8);
        let brand: [u8; 4] = header[0..4].try_into().expect("slice is 4 bytes");
        if brand != Self::brand() {
            return Err(TacoError::MalformedRequest {
                message: format!(
                    "brand mismatch: expected {:?}, got {:?}",
                    Self::brand(),
                    brand
                ),
            });
        }
        let major = u16::from_be_bytes([header[4], header[5]]);
        let (expected_major, _) = Self::version();
        if major != expected_major {
            return Err(TacoError::UnsupportedVersion {
                message: format!("expected major version {expected_major}, got {major}"),
            });
        }
        bincode::deserialize(body)
            .map_err(|e| TacoError::MalformedRequest { message: format!("decode failed: {e}") })
    }
}
