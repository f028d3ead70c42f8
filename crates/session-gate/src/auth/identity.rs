//! Authenticated identity.
//!
//! An `Identity` is built once per successfully verified id token and lives
//! only for the request that produced it.

use crate::auth::claims::IdTokenClaims;
use std::collections::BTreeSet;
use std::fmt;

/// The caller an id token vouches for.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    authenticated: bool,
    principal: String,
    roles: BTreeSet<String>,
}

impl Identity {
    /// Create an authenticated identity. Group names are upper-cased into roles.
    pub fn authenticated<I, S>(principal: impl Into<String>, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            authenticated: true,
            principal: principal.into(),
            roles: groups
                .into_iter()
                .map(|group| group.as_ref().to_uppercase())
                .collect(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }

    /// Roles in sorted order.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(String::as_str)
    }

    /// Check role membership. The comparison is case-insensitive.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(&role.to_uppercase())
    }
}

impl From<IdTokenClaims> for Identity {
    fn from(claims: IdTokenClaims) -> Self {
        Identity::authenticated(claims.username, claims.groups)
    }
}

/// Custom Debug implementation that redacts the principal.
impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("authenticated", &self.authenticated)
            .field("principal", &"[REDACTED]")
            .field("roles", &self.roles)
            .finish()
    }
}
