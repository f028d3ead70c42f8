//! Middleware for Session Gate.
//!
//! # Components
//!
//! - `session` - Request gate attaching the caller's identity to each request
//! - `http_metrics` - HTTP request metrics middleware

pub mod http_metrics;
pub mod session;

pub use http_metrics::http_metrics_middleware;
pub use session::{attach_identity, SecurityContext};
