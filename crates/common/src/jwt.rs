//! JWT utilities shared across session components.
//!
//! This module provides the unverified, structural half of token handling:
//! - Size limits for DoS prevention
//! - Key ID and algorithm extraction from JWT headers
//! - Strict `exp` comparison
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Nothing returned here is trusted; the signature MUST still be verified
//!   with the key selected by `kid`
//! - Error messages are intentionally generic
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{extract_key_header, validate_exp};
//!
//! let header = extract_key_header(token)?;
//! let key = resolver.resolve(&header.kid).await?;
//! // ... verify signature, then:
//! validate_exp(claims.exp)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// JWTs larger than this are rejected BEFORE any base64 decoding or
/// cryptographic work. Identity provider id tokens with a handful of group
/// claims are typically 1-2KB.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during structural JWT inspection.
///
/// Note: Display output is intentionally generic. Detailed information is
/// logged at debug level for troubleshooting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The token is invalid or expired")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("The token is invalid or expired")]
    MalformedToken,

    /// Token is missing required `kid` header.
    #[error("The token is invalid or expired")]
    MissingKid,

    /// Token is missing the `alg` header.
    #[error("The token is invalid or expired")]
    MissingAlgorithm,

    /// Token `exp` claim is not in the future.
    #[error("The token is invalid or expired")]
    Expired,
}

// =============================================================================
// Header Types
// =============================================================================

/// The key-selection fields of a JWT header, read without verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyHeader {
    /// Key ID used to select the verification key.
    pub kid: String,

    /// Signing algorithm name as it appears in the header (e.g. `RS256`).
    pub alg: String,
}

#[derive(Deserialize)]
struct RawHeader {
    #[serde(default)]
    kid: Option<serde_json::Value>,
    #[serde(default)]
    alg: Option<serde_json::Value>,
}

// =============================================================================
// Functions
// =============================================================================

/// Extract the `kid` and `alg` from a JWT header without verifying the signature.
///
/// # Security
///
/// - Token size is checked BEFORE any parsing
/// - This function does NOT validate the token signature
/// - The values should only be used to select a key from a trusted key set
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Wrong number of segments, bad base64, or invalid JSON
/// - `MissingKid` - `kid` absent, empty, or not a string
/// - `MissingAlgorithm` - `alg` absent, empty, or not a string
pub fn extract_key_header(token: &str) -> Result<KeyHeader, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let mut parts = token.split('.');
    let (Some(header_part), Some(_), Some(_), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        tracing::debug!(target: "common.jwt", "Token rejected: invalid JWT format");
        return Err(JwtValidationError::MalformedToken);
    };

    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedToken
    })?;

    let header: RawHeader = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    let kid = non_empty_string(header.kid).ok_or(JwtValidationError::MissingKid)?;
    let alg = non_empty_string(header.alg).ok_or(JwtValidationError::MissingAlgorithm)?;

    Ok(KeyHeader { kid, alg })
}

fn non_empty_string(value: Option<serde_json::Value>) -> Option<String> {
    match value {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// Validate the `exp` claim against the current time.
///
/// A token is only valid while `exp` is strictly greater than now. There is
/// no leeway: a token expiring this second is already expired.
///
/// # Errors
///
/// Returns `JwtValidationError::Expired` when `exp <= now`.
pub fn validate_exp(exp: i64) -> Result<(), JwtValidationError> {
    validate_exp_at(exp, chrono::Utc::now().timestamp())
}

/// Deterministic `exp` validation against an explicit `now` timestamp.
///
/// # Errors
///
/// Returns `JwtValidationError::Expired` when `exp <= now`.
pub fn validate_exp_at(exp: i64, now: i64) -> Result<(), JwtValidationError> {
    if exp > now {
        return Ok(());
    }

    tracing::debug!(
        target: "common.jwt",
        exp = exp,
        now = now,
        "Token rejected: expired"
    );
    Err(JwtValidationError::Expired)
}

// =============================================================================
// Tests
// =============================================================================
