//! Service layer for Session Gate.
//!
//! # Components
//!
//! - `cookies` - Session cookie parsing and `Set-Cookie` construction
//! - `idp_client` - Identity provider client (login, confirm, refresh)
//! - `credentials` - Per-request credential coordination

pub mod cookies;
pub mod credentials;
pub mod idp_client;

pub use cookies::{CookiePolicy, CookieWriter, RequestCookies};
pub use credentials::CredentialCoordinator;
pub use idp_client::{HttpIdentityProvider, IdentityProviderClient};
