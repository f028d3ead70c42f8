//! Request gate.
//!
//! Runs the credential coordinator once per inbound request, stores the
//! outcome as a [`SecurityContext`] request extension, and always forwards
//! the request. Handlers decide whether anonymous access is allowed.
//!
//! Cookie writes made during verification (stale id token cleanup, refreshed
//! tokens, refused refresh token) are appended to the handler's response.

use crate::auth::Identity;
use crate::errors::SessionError;
use crate::services::{CookieWriter, CredentialCoordinator, RequestCookies};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::instrument;

/// Per-request authentication outcome.
///
/// Present on every request that passed through [`attach_identity`]. An
/// empty context means the request is anonymous.
#[derive(Debug, Clone, Default)]
pub struct SecurityContext {
    identity: Option<Identity>,
}

impl SecurityContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity
            .as_ref()
            .is_some_and(Identity::is_authenticated)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.identity
            .as_ref()
            .is_some_and(|identity| identity.has_role(role))
    }

    /// The authenticated identity, or `Unauthenticated`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Unauthenticated` for anonymous requests.
    pub fn require_authenticated(&self) -> Result<&Identity, SessionError> {
        self.identity
            .as_ref()
            .filter(|identity| identity.is_authenticated())
            .ok_or(SessionError::Unauthenticated)
    }

    /// The authenticated identity if it holds `role`.
    ///
    /// # Errors
    ///
    /// - `SessionError::Unauthenticated` for anonymous requests
    /// - `SessionError::Forbidden` when the role is missing
    pub fn require_role(&self, role: &str) -> Result<&Identity, SessionError> {
        let identity = self.require_authenticated()?;
        if identity.has_role(role) {
            Ok(identity)
        } else {
            tracing::debug!(target: "sg.middleware.session", role = role, "Missing required role");
            Err(SessionError::Forbidden(format!("Requires role {role}")))
        }
    }
}

/// Middleware that attaches a [`SecurityContext`] to every request.
#[instrument(skip_all, name = "sg.middleware.session")]
pub async fn attach_identity(
    State(coordinator): State<Arc<CredentialCoordinator>>,
    mut req: Request,
    next: Next,
) -> Response {
    let cookies = RequestCookies::from_headers(req.headers());
    let mut writer = CookieWriter::new();

    let identity = coordinator.verify_request(&cookies, &mut writer).await;
    tracing::debug!(
        target: "sg.middleware.session",
        authenticated = identity.is_some(),
        cookie_writes = writer.cookies().len(),
        "Request identity resolved"
    );

    req.extensions_mut().insert(SecurityContext { identity });

    let mut response = next.run(req).await;
    writer.append_to(response.headers_mut());
    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::{KeyResolver, TokenVerifier};
    use crate::services::cookies::CookiePolicy;
    use crate::services::idp_client::mock::MockIdentityProvider;
    use axum::{
        body::Body,
        http::{header, Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Extension, Router,
    };
    use tower::ServiceExt;

    fn coordinator(provider: MockIdentityProvider) -> Arc<CredentialCoordinator> {
        let resolver = KeyResolver::new("http://127.0.0.1:9/.well-known/jwks.json".to_string());
        Arc::new(CredentialCoordinator::new(
            TokenVerifier::new(Arc::new(resolver)),
            Arc::new(provider),
            CookiePolicy {
                secure: false,
                refresh_max_age_seconds: 60,
            },
        ))
    }

    async fn whoami(Extension(context): Extension<SecurityContext>) -> String {
        if context.is_authenticated() {
            "authenticated".to_string()
        } else {
            "anonymous".to_string()
        }
    }

    fn app(provider: MockIdentityProvider) -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .layer(middleware::from_fn_with_state(
                coordinator(provider),
                attach_identity,
            ))
    }

    fn request(cookie: Option<&str>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().uri("/whoami");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn set_cookies(response: &Response) -> Vec<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|c| c.to_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_anonymous_request_is_forwarded() {
        let response = app(MockIdentityProvider::new())
            .oneshot(request(None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookies(&response).is_empty());
    }

    #[tokio::test]
    async fn test_invalid_id_cookie_is_cleared_and_forwarded() {
        let response = app(MockIdentityProvider::new())
            .oneshot(request(Some("s=not-a-jwt")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            set_cookies(&response),
            vec!["s=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"]
        );
    }

    #[tokio::test]
    async fn test_refused_refresh_clears_refresh_cookie() {
        let response = app(MockIdentityProvider::rejecting_refresh())
            .oneshot(request(Some("rt=revoked")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            set_cookies(&response),
            vec!["rt=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"]
        );
    }

    #[test]
    fn test_security_context_requirements() {
        let anonymous = SecurityContext::anonymous();
        assert!(!anonymous.is_authenticated());
        assert!(matches!(
            anonymous.require_authenticated(),
            Err(SessionError::Unauthenticated)
        ));
        assert!(matches!(
            anonymous.require_role("CONTRIBUTOR"),
            Err(SessionError::Unauthenticated)
        ));

        let context =
            SecurityContext::authenticated(Identity::authenticated("alice", ["contributor"]));
        assert!(context.is_authenticated());
        assert!(context.has_role("CONTRIBUTOR"));
        assert_eq!(context.require_authenticated().unwrap().principal(), "alice");
        assert!(context.require_role("contributor").is_ok());
        assert!(matches!(
            context.require_role("ADMIN"),
            Err(SessionError::Forbidden(_))
        ));
    }
}
