//! Id token claims structure.
//!
//! Contains the claims read from a verified id token. The username is
//! redacted in Debug output to prevent exposure in logs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Claims carried by an identity provider id token.
///
/// Only the claims the gate relies on are modelled; everything else in the
/// payload is ignored during deserialization.
#[derive(Clone, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Username of the authenticated user - redacted in Debug output.
    #[serde(rename = "cognito:username")]
    pub username: String,

    /// Group memberships. A user in no groups has no claim at all.
    #[serde(rename = "cognito:groups", default)]
    pub groups: Vec<String>,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,
}

impl fmt::Debug for IdTokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdTokenClaims")
            .field("username", &"[REDACTED]")
            .field("groups", &self.groups)
            .field("exp", &self.exp)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_debug_redacts_username() {
        let claims = IdTokenClaims {
            username: "secret-user".to_string(),
            groups: vec!["contributor".to_string()],
            exp: 1234567890,
        };

        let debug_str = format!("{:?}", claims);

        assert!(!debug_str.contains("secret-user"));
        assert!(debug_str.contains("[REDACTED]"));
        assert!(debug_str.contains("contributor"));
    }

    #[test]
    fn test_claims_deserialize_provider_payload() {
        let json = r#"{
            "sub": "aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee",
            "cognito:groups": ["contributor", "admin"],
            "email_verified": true,
            "cognito:username": "alice",
            "aud": "client-xyz",
            "token_use": "id",
            "exp": 1700000000,
            "iat": 1699996400
        }"#;

        let claims: IdTokenClaims = serde_json::from_str(json).unwrap();

        assert_eq!(claims.username, "alice");
        assert_eq!(claims.groups, vec!["contributor", "admin"]);
        assert_eq!(claims.exp, 1700000000);
    }

    #[test]
    fn test_claims_missing_groups_defaults_to_empty() {
        let json = r#"{"cognito:username": "bob", "exp": 1700000000}"#;

        let claims: IdTokenClaims = serde_json::from_str(json).unwrap();

        assert!(claims.groups.is_empty());
    }

    #[test]
    fn test_claims_missing_username_rejected() {
        let json = r#"{"cognito:groups": ["contributor"], "exp": 1700000000}"#;

        assert!(serde_json::from_str::<IdTokenClaims>(json).is_err());
    }
}
