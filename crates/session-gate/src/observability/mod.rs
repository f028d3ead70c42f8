//! Observability module for Session Gate.
//!
//! Provides metrics definitions and recording helpers.

pub mod metrics;
