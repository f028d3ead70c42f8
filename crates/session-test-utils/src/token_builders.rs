//! Builder patterns for test id tokens
//!
//! Provides a fluent API for creating signed id tokens shaped like the ones
//! the identity provider issues.

use crate::crypto_fixtures::{FixtureError, TestSigningKey};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::json;

/// Builder for creating test id tokens
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_user("alice")
///     .with_groups(&["contributor"])
///     .expires_in(3600)
///     .sign(&primary_key())?;
/// ```
pub struct TestTokenBuilder {
    username: Option<String>,
    groups: Option<Vec<String>>,
    exp: i64,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    pub fn new() -> Self {
        Self {
            username: Some("test-user".to_string()),
            groups: None,
            exp: (Utc::now() + Duration::seconds(3600)).timestamp(),
        }
    }

    /// Set the username claim
    pub fn for_user(mut self, username: &str) -> Self {
        self.username = Some(username.to_string());
        self
    }

    /// Omit the username claim entirely
    pub fn without_username(mut self) -> Self {
        self.username = None;
        self
    }

    /// Set the group membership claim
    pub fn with_groups(mut self, groups: &[&str]) -> Self {
        self.groups = Some(groups.iter().map(|g| g.to_string()).collect());
        self
    }

    /// Set expiration in seconds from now (negative for the past)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Set an absolute expiration timestamp
    pub fn expires_at(mut self, timestamp: i64) -> Self {
        self.exp = timestamp;
        self
    }

    /// Build the claims as a JSON value
    pub fn build(&self) -> serde_json::Value {
        let mut claims = json!({
            "token_use": "id",
            "aud": "test-client-id",
            "exp": self.exp,
        });
        if let Some(username) = &self.username {
            claims["cognito:username"] = json!(username);
        }
        if let Some(groups) = &self.groups {
            claims["cognito:groups"] = json!(groups);
        }
        claims
    }

    /// Sign with RS256 under `key`'s key ID
    pub fn sign(&self, key: &TestSigningKey) -> Result<String, FixtureError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(key.kid.to_string());
        encode(&header, &self.build(), &key.encoding_key()?)
            .map_err(|e| FixtureError::Crypto(format!("Failed to sign test token: {e}")))
    }

    /// Sign with HS256 and a shared secret, labelled with `kid`
    pub fn sign_hs256(&self, kid: &str, secret: &[u8]) -> Result<String, FixtureError> {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(kid.to_string());
        encode(&header, &self.build(), &EncodingKey::from_secret(secret))
            .map_err(|e| FixtureError::Crypto(format!("Failed to sign test token: {e}")))
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto_fixtures::primary_key;

    #[test]
    fn test_builder_creates_provider_shaped_claims() {
        let claims = TestTokenBuilder::new()
            .for_user("alice")
            .with_groups(&["contributor"])
            .build();

        assert_eq!(claims["cognito:username"], "alice");
        assert_eq!(claims["cognito:groups"][0], "contributor");
        assert!(claims["exp"].as_i64().unwrap() > Utc::now().timestamp());
    }

    #[test]
    fn test_builder_omits_absent_claims() {
        let claims = TestTokenBuilder::new().without_username().build();

        assert!(claims.get("cognito:username").is_none());
        assert!(claims.get("cognito:groups").is_none());
    }

    #[test]
    fn test_sign_produces_three_segments() {
        let token = TestTokenBuilder::default().sign(&primary_key()).unwrap();
        assert_eq!(token.split('.').count(), 3);
    }
}
