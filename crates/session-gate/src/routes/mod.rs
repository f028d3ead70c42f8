//! HTTP routes for Session Gate.
//!
//! Defines the Axum router and application state.

use crate::auth::{KeyResolver, TokenVerifier};
use crate::config::Config;
use crate::errors::SessionError;
use crate::handlers;
use crate::middleware::{attach_identity, http_metrics_middleware};
use crate::services::{
    CookiePolicy, CredentialCoordinator, HttpIdentityProvider, IdentityProviderClient,
};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Credential coordinator shared by the request gate and the handlers.
    pub coordinator: Arc<CredentialCoordinator>,
}

impl AppState {
    /// Build state talking to the configured key set and identity provider.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Internal` if an HTTP client cannot be built.
    pub fn from_config(config: Config) -> Result<Self, SessionError> {
        let identity_provider = Arc::new(HttpIdentityProvider::from_config(&config)?);
        Ok(Self::with_identity_provider(config, identity_provider))
    }

    /// Build state with a caller-supplied identity provider client.
    pub fn with_identity_provider(
        config: Config,
        identity_provider: Arc<dyn IdentityProviderClient>,
    ) -> Self {
        let key_resolver = Arc::new(KeyResolver::with_timeout(
            config.jwks_url.clone(),
            Duration::from_secs(config.http_client_timeout_seconds),
        ));
        let coordinator = Arc::new(CredentialCoordinator::new(
            TokenVerifier::new(key_resolver),
            identity_provider,
            CookiePolicy::from_config(&config),
        ));

        Self {
            config,
            coordinator,
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe (simple "OK")
/// - `/metrics` - Prometheus metrics endpoint
/// - `POST /api/session` - Login
/// - `POST /api/session/confirm` - Replace temporary password and login
/// - `GET /api/session` - Current identity (authenticated)
/// - `DELETE /api/session` - Logoff (authenticated)
/// - Request gate attaching the caller's identity to every request
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let coordinator = state.coordinator.clone();

    let app_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/api/session",
            post(handlers::login)
                .get(handlers::current_session)
                .delete(handlers::logoff),
        )
        .route("/api/session/confirm", post(handlers::confirm))
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Layer order (bottom-to-top execution):
    // 1. attach_identity - Resolve the caller from session cookies (innermost)
    // 2. TimeoutLayer - Timeout the request, including provider calls
    // 3. TraceLayer - Log request details
    // 4. http_metrics_middleware - Record ALL responses (outermost)
    app_routes
        .merge(metrics_routes)
        .layer(middleware::from_fn_with_state(coordinator, attach_identity))
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(http_metrics_middleware))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn test_config_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<Config>();
    }
}
