//! Credential coordinator.
//!
//! Turns the session cookies on a request into an [`Identity`], falling back
//! to a single refresh grant when the id token is missing or no longer
//! valid. All state lives in the two cookies; nothing is stored server-side.

use crate::auth::{Identity, TokenVerifier};
use crate::models::TokenPair;
use crate::observability::metrics;
use crate::services::cookies::{
    CookiePolicy, CookieWriter, RequestCookies, ID_COOKIE_NAME, REFRESH_COOKIE_NAME,
};
use crate::services::idp_client::IdentityProviderClient;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

pub struct CredentialCoordinator {
    verifier: TokenVerifier,
    identity_provider: Arc<dyn IdentityProviderClient>,
    policy: CookiePolicy,
}

impl CredentialCoordinator {
    pub fn new(
        verifier: TokenVerifier,
        identity_provider: Arc<dyn IdentityProviderClient>,
        policy: CookiePolicy,
    ) -> Self {
        Self {
            verifier,
            identity_provider,
            policy,
        }
    }

    /// Resolve the identity carried by a request's session cookies.
    ///
    /// 1. A verifiable id token wins outright; no refresh is attempted.
    /// 2. A present but unverifiable id token is cleared.
    /// 3. With a refresh token, one refresh grant is attempted. Refused
    ///    refresh clears the refresh cookie; fresh tokens are saved and the
    ///    new id token is verified.
    ///
    /// Cookie writes go to `writer`. Every failure yields `None`.
    #[instrument(skip_all, name = "sg.services.credentials.verify_request")]
    pub async fn verify_request(
        &self,
        cookies: &RequestCookies,
        writer: &mut CookieWriter,
    ) -> Option<Identity> {
        if let Some(id_token) = cookies.id_token() {
            if let Some(identity) = self.verify_token(id_token).await {
                return Some(identity);
            }
            debug!(target: "sg.services.credentials", "Id token not valid, clearing id cookie");
            self.clear_cookie(ID_COOKIE_NAME, writer);
        }

        let refresh_token = cookies.refresh_token()?;

        match self.identity_provider.refresh_tokens(refresh_token).await {
            Ok(Some(tokens)) => {
                metrics::record_token_refresh("success");
                let identity = match tokens.id_token() {
                    Some(id_token) => self.verify_token(id_token).await,
                    None => None,
                };
                if identity.is_none() {
                    warn!(target: "sg.services.credentials", "Refreshed id token failed verification");
                }
                self.save(&tokens, writer);
                identity
            }
            Ok(None) => {
                metrics::record_token_refresh("rejected");
                debug!(target: "sg.services.credentials", "Refresh refused, clearing refresh cookie");
                self.clear_cookie(REFRESH_COOKIE_NAME, writer);
                None
            }
            Err(e) => {
                // Provider outage: keep the refresh cookie for the next request
                metrics::record_token_refresh("error");
                warn!(target: "sg.services.credentials", error = %e, "Token refresh failed");
                None
            }
        }
    }

    /// Write cookies for whichever tokens are present. Absent tokens leave
    /// their cookie untouched.
    pub fn save(&self, tokens: &TokenPair, writer: &mut CookieWriter) {
        if let Some(cookie) = tokens.id_token().and_then(|t| self.policy.id_cookie(t)) {
            writer.push(cookie);
        }
        if let Some(cookie) = tokens
            .refresh_token()
            .and_then(|t| self.policy.refresh_cookie(t))
        {
            writer.push(cookie);
        }
    }

    /// Clear both session cookies.
    pub fn clear(&self, writer: &mut CookieWriter) {
        self.clear_cookie(ID_COOKIE_NAME, writer);
        self.clear_cookie(REFRESH_COOKIE_NAME, writer);
    }

    pub fn identity_provider(&self) -> &dyn IdentityProviderClient {
        self.identity_provider.as_ref()
    }

    fn clear_cookie(&self, name: &str, writer: &mut CookieWriter) {
        if let Some(cookie) = self.policy.cleared(name) {
            writer.push(cookie);
        }
    }

    /// Verify one id token. An unsupported algorithm counts as a failed
    /// verification for this request.
    async fn verify_token(&self, token: &str) -> Option<Identity> {
        match self.verifier.verify(token).await {
            Ok(identity) => identity,
            Err(e) => {
                warn!(target: "sg.services.credentials", error = %e, "Id token rejected");
                None
            }
        }
    }
}
