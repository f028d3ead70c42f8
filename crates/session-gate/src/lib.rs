//! Session Gate Service Library
//!
//! Stateless cookie-based authentication in front of a Cognito-compatible
//! identity provider:
//!
//! - Id tokens are verified locally against the provider's published keys
//! - Expired or missing id tokens are renewed with the refresh token
//! - Login, password confirmation and logoff are exposed as HTTP endpoints
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/session.rs -> services/credentials.rs
//!                                            ├── auth/verifier.rs -> auth/keys.rs
//!                                            └── services/idp_client.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Key resolution, token verification, identities
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Request gate and HTTP metrics
//! - `models` - Token pair and request/response bodies
//! - `observability` - Prometheus metrics
//! - `routes` - Axum router setup
//! - `services` - Cookies, identity provider client, credential coordinator

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
