//! Test server harness for E2E testing
//!
//! Provides `TestSessionServer` for spawning real Session Gate instances in
//! tests. Every server gets its own wiremock server that publishes the
//! primary test key and stands in for the identity provider.

use crate::crypto_fixtures::primary_key;
use crate::provider_fixtures::{jwks_mock, JWKS_PATH};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use session_gate::config::Config;
use session_gate::observability::metrics::init_metrics_recorder;
use session_gate::routes::{self, AppState};
use session_gate::services::IdentityProviderClient;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;
use wiremock::MockServer;

/// Global metrics handle for test servers
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning Session Gate in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_login_flow() -> Result<()> {
///     let server = TestSessionServer::spawn().await?;
///     login_mock(tokens_response(&id_token, Some("rt"))).mount(server.provider()).await;
///
///     let response = reqwest::Client::new()
///         .post(format!("{}/api/session", server.url()))
///         .form(&[("username", "alice"), ("password", "pw")])
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 204);
///     Ok(())
/// }
/// ```
pub struct TestSessionServer {
    addr: SocketAddr,
    config: Config,
    provider: MockServer,
    _handle: JoinHandle<()>,
}

impl TestSessionServer {
    /// Spawn a server whose identity provider client talks to the mock
    /// provider over HTTP.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_inner(None).await
    }

    /// Spawn a server using `identity_provider` instead of the HTTP client.
    /// The key set is still served by the mock provider.
    pub async fn spawn_with_identity_provider(
        identity_provider: Arc<dyn IdentityProviderClient>,
    ) -> Result<Self, anyhow::Error> {
        Self::spawn_inner(Some(identity_provider)).await
    }

    async fn spawn_inner(
        identity_provider: Option<Arc<dyn IdentityProviderClient>>,
    ) -> Result<Self, anyhow::Error> {
        let provider = MockServer::start().await;
        jwks_mock(&[primary_key()]).mount(&provider).await;

        let vars = HashMap::from([
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            (
                "JWKS_URL".to_string(),
                format!("{}{}", provider.uri(), JWKS_PATH),
            ),
            ("USER_POOL_ID".to_string(), "us-east-1_TestPool".to_string()),
            (
                "USER_POOL_CLIENT_ID".to_string(),
                "test-client-id".to_string(),
            ),
            ("IDP_ENDPOINT".to_string(), provider.uri()),
            ("AUTH_COOKIE_SECURE".to_string(), "false".to_string()),
            ("HTTP_CLIENT_TIMEOUT_SECONDS".to_string(), "5".to_string()),
        ]);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let state = match identity_provider {
            Some(identity_provider) => {
                AppState::with_identity_provider(config.clone(), identity_provider)
            }
            None => AppState::from_config(config.clone())
                .map_err(|e| anyhow::anyhow!("Failed to create app state: {}", e))?,
        };

        let app = routes::build_routes(Arc::new(state), test_metrics_handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            provider,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mock server acting as key set endpoint and identity provider.
    pub fn provider(&self) -> &MockServer {
        &self.provider
    }
}

impl Drop for TestSessionServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_spawns_successfully() -> Result<(), anyhow::Error> {
        let server = TestSessionServer::spawn().await?;

        assert!(server.url().starts_with("http://127.0.0.1:"));

        let response = reqwest::get(format!("{}/health", server.url())).await?;
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await?, "OK");

        Ok(())
    }

    #[tokio::test]
    async fn test_server_points_at_mock_provider() -> Result<(), anyhow::Error> {
        let server = TestSessionServer::spawn().await?;

        assert_eq!(server.config().idp_endpoint, server.provider().uri());
        assert!(server.config().jwks_url.ends_with(JWKS_PATH));
        assert!(!server.config().cookie_secure);

        Ok(())
    }

    #[tokio::test]
    async fn test_multiple_servers_different_ports() -> Result<(), anyhow::Error> {
        let server1 = TestSessionServer::spawn().await?;
        let server2 = TestSessionServer::spawn().await?;

        assert_ne!(server1.addr(), server2.addr());
        Ok(())
    }
}
