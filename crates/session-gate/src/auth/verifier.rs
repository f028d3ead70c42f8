//! Id token verification.
//!
//! Validates id tokens using RSA public keys resolved through the
//! [`KeyResolver`].
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (via `common::jwt`)
//! - Only RS256 is accepted; any other header algorithm is rejected before a
//!   key is fetched
//! - `exp` must be strictly in the future, with no leeway
//!
//! Every failure except an unsupported algorithm yields `Ok(None)`: a bad
//! token means "not authenticated", never an error for the caller.

use crate::auth::claims::IdTokenClaims;
use crate::auth::identity::Identity;
use crate::auth::keys::{KeyResolver, SUPPORTED_ALGORITHM};
use crate::errors::SessionError;
use crate::observability::metrics;
use common::jwt::{extract_key_header, validate_exp};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::sync::Arc;
use tracing::instrument;

/// Id token verifier backed by a key resolver.
pub struct TokenVerifier {
    key_resolver: Arc<KeyResolver>,
}

impl TokenVerifier {
    pub fn new(key_resolver: Arc<KeyResolver>) -> Self {
        Self { key_resolver }
    }

    /// Verify an id token and return the identity it asserts.
    ///
    /// # Steps
    ///
    /// 1. Decode the header (size check, structure, `kid`, `alg`)
    /// 2. Reject any algorithm other than RS256
    /// 3. Resolve the verification key for `kid`
    /// 4. Verify the signature and decode the claims
    /// 5. Require `exp` strictly greater than now
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnsupportedAlgorithm` when the header names an
    /// algorithm other than RS256. All other failures return `Ok(None)`.
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &str) -> Result<Option<Identity>, SessionError> {
        let header = match extract_key_header(token) {
            Ok(header) => header,
            Err(e) => {
                tracing::debug!(target: "sg.auth.verifier", error = ?e, "Token header decoding failed");
                metrics::record_token_verification("malformed");
                return Ok(None);
            }
        };

        if header.alg != SUPPORTED_ALGORITHM {
            tracing::warn!(target: "sg.auth.verifier", alg = %header.alg, "Token signed with unsupported algorithm");
            metrics::record_token_verification("unsupported_algorithm");
            return Err(SessionError::UnsupportedAlgorithm(header.alg));
        }

        let key = match self.key_resolver.resolve(&header.kid).await {
            Ok(key) => key,
            Err(e) => {
                tracing::debug!(target: "sg.auth.verifier", kid = %header.kid, error = %e, "Verification key unavailable");
                metrics::record_token_verification("key_lookup_failed");
                return Ok(None);
            }
        };

        let Some(claims) = verify_signature(token, key.decoding_key()) else {
            metrics::record_token_verification("invalid_signature");
            return Ok(None);
        };

        if let Err(e) = validate_exp(claims.exp) {
            tracing::debug!(target: "sg.auth.verifier", error = ?e, "Token expired");
            metrics::record_token_verification("expired");
            return Ok(None);
        }

        tracing::debug!(target: "sg.auth.verifier", "Token verified successfully");
        metrics::record_token_verification("success");
        Ok(Some(Identity::from(claims)))
    }
}

/// Verify the RS256 signature and decode the claims.
///
/// Expiry is checked separately by the caller so that the comparison is
/// strict and leeway-free.
fn verify_signature(token: &str, decoding_key: &DecodingKey) -> Option<IdTokenClaims> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_exp = false;
    // Audience is the app client ID; any token the pool issued is accepted
    validation.validate_aud = false;

    match decode::<IdTokenClaims>(token, decoding_key, &validation) {
        Ok(token_data) => Some(token_data.claims),
        Err(e) => {
            tracing::debug!(target: "sg.auth.verifier", error = %e, "Token verification failed");
            None
        }
    }
}
