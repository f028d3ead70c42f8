//! Liveness probe.

use tracing::instrument;

/// Handler for GET /health
///
/// The service holds no connections that need checking; being able to
/// answer is the whole signal.
#[instrument(skip_all, name = "sg.health.check")]
pub async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check_returns_ok() {
        assert_eq!(health_check().await, "OK");
    }
}
