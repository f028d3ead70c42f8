//! # Session Gate Test Utilities
//!
//! Shared test utilities for the Session Gate service.
//!
//! This crate provides:
//! - RSA key fixtures and key set documents (`crypto_fixtures`)
//! - Id token builder (`TestTokenBuilder`)
//! - Wiremock builders for the key set and identity provider (`provider_fixtures`)
//! - Server test harness (`TestSessionServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use session_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<()> {
//!     let server = TestSessionServer::spawn().await?;
//!     let token = TestTokenBuilder::new().for_user("alice").sign(&primary_key())?;
//!
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/api/session", server.url()))
//!         .header("Cookie", format!("s={token}"))
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod provider_fixtures;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use provider_fixtures::*;
pub use server_harness::*;
pub use token_builders::*;
