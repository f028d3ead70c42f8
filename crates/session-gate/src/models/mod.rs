//! Session Gate models.
//!
//! Contains data types shared between the identity provider client, the
//! credential coordinator and the HTTP handlers.

use common::secret::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Tokens issued by the identity provider for one user.
///
/// Either field may be absent: a refresh grant typically returns a new id
/// token but no new refresh token. Both values are bearer credentials and
/// are never printed.
#[derive(Clone, Default)]
pub struct TokenPair {
    id_token: Option<SecretString>,
    refresh_token: Option<SecretString>,
}

impl TokenPair {
    pub fn new(id_token: Option<String>, refresh_token: Option<String>) -> Self {
        Self {
            id_token: id_token.map(SecretString::from),
            refresh_token: refresh_token.map(SecretString::from),
        }
    }

    pub fn id_token(&self) -> Option<&str> {
        self.id_token.as_ref().map(|token| token.expose_secret())
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_ref().map(|token| token.expose_secret())
    }
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |present: bool| if present { "[REDACTED]" } else { "None" };
        f.debug_struct("TokenPair")
            .field("id_token", &redact(self.id_token.is_some()))
            .field("refresh_token", &redact(self.refresh_token.is_some()))
            .finish()
    }
}

// ============================================================================
// HTTP API Models
// ============================================================================

/// Form body of `POST /api/session`.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: SecretString,
}

/// Form body of `POST /api/session/confirm`.
///
/// Field names follow the browser form: `tempPassword`, `newPassword`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmForm {
    pub username: String,
    pub temp_password: SecretString,
    pub new_password: SecretString,
}

/// Response body of `GET /api/session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResponse {
    /// Username of the authenticated principal.
    pub principal: String,

    /// Roles in ascending order, upper-cased.
    pub roles: Vec<String>,
}
