//! Authentication module for Session Gate.
//!
//! Verifies identity provider id tokens against the provider's published
//! key set.
//!
//! # Components
//!
//! - `keys` - Key resolver fetching and caching RSA verification keys by key ID
//! - `verifier` - Id token verification (structure, signature, expiry)
//! - `claims` - Id token claims structure
//! - `identity` - The authenticated identity extracted from a verified token

pub mod claims;
pub mod identity;
pub mod keys;
pub mod verifier;

pub use claims::IdTokenClaims;
pub use identity::Identity;
pub use keys::{CachedKey, KeyResolver};
pub use verifier::TokenVerifier;
