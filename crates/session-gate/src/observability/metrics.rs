//! Metrics definitions for Session Gate.
//!
//! All metrics follow Prometheus naming conventions:
//! - `sg_` prefix for Session Gate
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS)
//! - `endpoint`: known paths only, everything else is `/other`
//! - `status`: success, error, timeout (HTTP) or a small fixed set per metric
//! - `outcome`: bounded by the verification and refresh code paths
//! - `operation`: `initiate_auth`, `respond_to_auth_challenge`

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("sg_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Provider calls cross the public internet; sub-second granularity up to the client timeout
        .set_buckets_for_metric(
            Matcher::Prefix("sg_idp_request".to_string()),
            &[
                0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.000, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set IdP request buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `sg_http_requests_total`, `sg_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("sg_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("sg_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Map a request path onto a bounded label value.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/" => "/",
        "/health" => "/health",
        "/metrics" => "/metrics",
        "/api/session" => "/api/session",
        "/api/session/confirm" => "/api/session/confirm",
        _ => "/other",
    }
}

// ============================================================================
// Credential Metrics
// ============================================================================

/// Record a key set fetch.
///
/// Metric: `sg_key_fetches_total`
/// Labels: `status` ("success", "not_found", "invalid", "error")
pub fn record_key_fetch(status: &str) {
    counter!("sg_key_fetches_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record the outcome of an id token verification.
///
/// Metric: `sg_token_verifications_total`
/// Labels: `outcome` ("success", "malformed", "unsupported_algorithm",
/// "key_lookup_failed", "invalid_signature", "expired")
pub fn record_token_verification(outcome: &str) {
    counter!("sg_token_verifications_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a refresh attempt made while verifying a request.
///
/// Metric: `sg_token_refreshes_total`
/// Labels: `outcome` ("success", "rejected", "error")
pub fn record_token_refresh(outcome: &str) {
    counter!("sg_token_refreshes_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

// ============================================================================
// Identity Provider Metrics
// ============================================================================

/// Record identity provider request duration and outcome.
///
/// Metric: `sg_idp_request_duration_seconds`, `sg_idp_requests_total`
/// Labels: `operation`, `status`
///
/// Operations: "initiate_auth", "respond_to_auth_challenge"
/// Status: "success", "rejected", "error"
pub fn record_idp_request(operation: &str, status: &str, duration: Duration) {
    histogram!("sg_idp_request_duration_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("sg_idp_requests_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    // These execute the recording functions against the global no-op recorder.

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/health", 200, Duration::from_millis(5));
        record_http_request("POST", "/api/session", 204, Duration::from_millis(150));
        record_http_request("DELETE", "/api/session", 401, Duration::from_millis(3));
        record_http_request("GET", "/nope", 404, Duration::from_millis(1));
    }

    #[test]
    fn test_categorize_status_code() {
        assert_eq!(categorize_status_code(200), "success");
        assert_eq!(categorize_status_code(204), "success");
        assert_eq!(categorize_status_code(401), "error");
        assert_eq!(categorize_status_code(503), "error");
        assert_eq!(categorize_status_code(408), "timeout");
        assert_eq!(categorize_status_code(504), "timeout");
    }

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(normalize_endpoint("/api/session"), "/api/session");
        assert_eq!(
            normalize_endpoint("/api/session/confirm"),
            "/api/session/confirm"
        );
        assert_eq!(normalize_endpoint("/health"), "/health");
        assert_eq!(normalize_endpoint("/api/session/../../etc"), "/other");
        assert_eq!(normalize_endpoint("/users/alice"), "/other");
    }

    #[test]
    fn test_record_credential_metrics() {
        record_key_fetch("success");
        record_key_fetch("not_found");
        record_token_verification("success");
        record_token_verification("expired");
        record_token_refresh("success");
        record_token_refresh("rejected");
    }

    #[test]
    fn test_record_idp_request() {
        record_idp_request("initiate_auth", "success", Duration::from_millis(80));
        record_idp_request(
            "respond_to_auth_challenge",
            "rejected",
            Duration::from_millis(120),
        );
        record_idp_request("initiate_auth", "error", Duration::from_secs(10));
    }
}
