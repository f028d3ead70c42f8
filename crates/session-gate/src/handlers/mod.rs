//! HTTP request handlers for Session Gate.

pub mod health;
pub mod metrics;
pub mod session;

pub use health::health_check;
pub use metrics::metrics_handler;
pub use session::{confirm, current_session, login, logoff};
