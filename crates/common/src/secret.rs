//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] types used for passwords and refresh tokens.
//! `SecretString` implements `Debug` with redaction, so any struct that
//! derives `Debug` while holding one is safe to log via `{:?}` or tracing.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct LoginForm {
//!     username: String,
//!     password: SecretString,
//! }
//!
//! let form = LoginForm {
//!     username: "alice".to_string(),
//!     password: SecretString::from("hunter2"),
//! };
//!
//! assert!(!format!("{form:?}").contains("hunter2"));
//! assert_eq!(form.password.expose_secret(), "hunter2");
//! ```
//!
//! Use `SecretString` for:
//! - User passwords (current, temporary and new)
//! - Refresh tokens
//! - Provider challenge session handles

pub use secrecy::{ExposeSecret, SecretString};
