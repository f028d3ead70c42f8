//! Identity provider client.
//!
//! Talks to a Cognito-compatible user pool over its JSON 1.1 API using the
//! public app-client operations `InitiateAuth` and `RespondToAuthChallenge`.
//! Login, confirm and refresh all share one request shape
//! ([`ChallengeRequest`]) and differ only in the flow they select and how a
//! returned challenge is interpreted.
//!
//! # Error Mapping
//!
//! - `NotAuthorizedException` / `UserNotFoundException` → `AuthenticationFailed` (401)
//! - Any other 4xx provider error → `Provider` (400)
//! - 5xx or transport failure → `ServiceUnavailable` (503)
//!
//! The provider's message text is relayed for 4xx errors.

use crate::config::Config;
use crate::errors::SessionError;
use crate::models::TokenPair;
use crate::observability::metrics;
use common::secret::{ExposeSecret, SecretString};
use reqwest::{header::CONTENT_TYPE, Client};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{error, instrument, trace, warn};

/// Content type of the provider's JSON protocol.
const AMZ_JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Header selecting the provider operation.
const AMZ_TARGET_HEADER: &str = "X-Amz-Target";

/// Challenge issued for users created with a temporary password.
pub const NEW_PASSWORD_REQUIRED: &str = "NEW_PASSWORD_REQUIRED";

const USER_PASSWORD_AUTH: &str = "USER_PASSWORD_AUTH";
const REFRESH_TOKEN_AUTH: &str = "REFRESH_TOKEN_AUTH";

pub const MSG_USER_NOT_CONFIRMED: &str = "User not confirmed. Complete confirm flow.";
pub const MSG_UNSUPPORTED_CHALLENGE: &str =
    "User contains unsupported challenge name. Contact your administrator.";
pub const MSG_CONFIRM_REJECTED: &str = "Unable to confirm user. Contact your administrator.";
pub const MSG_INCORRECT_STATE: &str =
    "User is not in the correct state. Contact your administrator.";

const PROVIDER_UNAVAILABLE: &str = "Identity provider is unavailable";

/// Operations against the identity provider.
#[async_trait::async_trait]
pub trait IdentityProviderClient: Send + Sync {
    /// Authenticate with username and password.
    ///
    /// # Errors
    ///
    /// - `UserNotConfirmed` if the user must still set a permanent password
    /// - `UnsupportedState` for any other challenge
    /// - `AuthenticationFailed` if the credentials are rejected
    async fn login(&self, username: &str, password: &SecretString)
        -> Result<TokenPair, SessionError>;

    /// Replace a temporary password and authenticate.
    ///
    /// # Errors
    ///
    /// - `UnsupportedState` if the user is not awaiting a new password
    /// - `UserNotConfirmed` if the new password is not accepted
    async fn confirm_registration(
        &self,
        username: &str,
        temp_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<TokenPair, SessionError>;

    /// Exchange a refresh token for fresh tokens.
    ///
    /// Returns `Ok(None)` when the provider refuses the refresh token or
    /// answers with a challenge.
    ///
    /// # Errors
    ///
    /// Returns an error only when the provider could not be reached or
    /// answered with something other than a refusal.
    async fn refresh_tokens(&self, refresh_token: &str)
        -> Result<Option<TokenPair>, SessionError>;
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    InitiateAuth,
    RespondToAuthChallenge,
}

impl Operation {
    fn target(self) -> &'static str {
        match self {
            Operation::InitiateAuth => "AWSCognitoIdentityProviderService.InitiateAuth",
            Operation::RespondToAuthChallenge => {
                "AWSCognitoIdentityProviderService.RespondToAuthChallenge"
            }
        }
    }

    fn label(self) -> &'static str {
        match self {
            Operation::InitiateAuth => "initiate_auth",
            Operation::RespondToAuthChallenge => "respond_to_auth_challenge",
        }
    }
}

/// One challenge/response exchange with the provider.
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ChallengeRequest<'a> {
    #[serde(skip)]
    operation: Operation,

    client_id: &'a str,

    #[serde(skip_serializing_if = "Option::is_none")]
    auth_flow: Option<&'static str>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    auth_parameters: BTreeMap<&'static str, &'a str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    challenge_name: Option<&'a str>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    challenge_responses: BTreeMap<&'static str, &'a str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<&'a str>,
}

impl<'a> ChallengeRequest<'a> {
    fn initiate<const N: usize>(
        client_id: &'a str,
        flow: &'static str,
        parameters: [(&'static str, &'a str); N],
    ) -> Self {
        Self {
            operation: Operation::InitiateAuth,
            client_id,
            auth_flow: Some(flow),
            auth_parameters: BTreeMap::from(parameters),
            challenge_name: None,
            challenge_responses: BTreeMap::new(),
            session: None,
        }
    }

    fn password(client_id: &'a str, username: &'a str, password: &'a str) -> Self {
        Self::initiate(
            client_id,
            USER_PASSWORD_AUTH,
            [("USERNAME", username), ("PASSWORD", password)],
        )
    }

    fn refresh(client_id: &'a str, refresh_token: &'a str) -> Self {
        Self::initiate(
            client_id,
            REFRESH_TOKEN_AUTH,
            [("REFRESH_TOKEN", refresh_token)],
        )
    }

    fn new_password(
        client_id: &'a str,
        session: &'a str,
        username: &'a str,
        new_password: &'a str,
    ) -> Self {
        Self {
            operation: Operation::RespondToAuthChallenge,
            client_id,
            auth_flow: None,
            auth_parameters: BTreeMap::new(),
            challenge_name: Some(NEW_PASSWORD_REQUIRED),
            challenge_responses: BTreeMap::from([
                ("USERNAME", username),
                ("NEW_PASSWORD", new_password),
            ]),
            session: Some(session),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ProviderResponse {
    #[serde(default)]
    challenge_name: Option<String>,
    #[serde(default)]
    session: Option<String>,
    #[serde(default)]
    authentication_result: Option<AuthenticationResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl std::fmt::Debug for AuthenticationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationResult")
            .field("id_token", &self.id_token.as_ref().map(|_| "[REDACTED]"))
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
struct ProviderErrorBody {
    #[serde(rename = "__type", default)]
    error_type: String,
    #[serde(default, alias = "Message")]
    message: String,
}

impl ProviderErrorBody {
    /// Exception name without any namespace prefix.
    fn kind(&self) -> &str {
        self.error_type
            .rsplit_once('#')
            .map_or(self.error_type.as_str(), |(_, kind)| kind)
    }

    fn into_error(self) -> SessionError {
        let message = if self.message.is_empty() {
            "Identity provider rejected the request".to_string()
        } else {
            self.message.clone()
        };

        match self.kind() {
            "NotAuthorizedException" | "UserNotFoundException" => {
                SessionError::AuthenticationFailed(message)
            }
            _ => SessionError::Provider(message),
        }
    }
}

/// What one exchange produced.
#[derive(Debug)]
enum AuthOutcome {
    Authenticated(TokenPair),
    Challenge {
        name: String,
        session: Option<SecretString>,
    },
}

impl ProviderResponse {
    fn into_outcome(self) -> Result<AuthOutcome, SessionError> {
        if let Some(name) = self.challenge_name.filter(|name| !name.is_empty()) {
            return Ok(AuthOutcome::Challenge {
                name,
                session: self.session.map(SecretString::from),
            });
        }

        match self.authentication_result {
            Some(result) => Ok(AuthOutcome::Authenticated(TokenPair::new(
                result.id_token,
                result.refresh_token,
            ))),
            None => {
                error!(target: "sg.services.idp", "Provider response had neither tokens nor a challenge");
                Err(SessionError::Internal)
            }
        }
    }
}

// ============================================================================
// Outcome Interpretation
// ============================================================================

fn login_result(outcome: AuthOutcome) -> Result<TokenPair, SessionError> {
    match outcome {
        AuthOutcome::Authenticated(tokens) => Ok(tokens),
        AuthOutcome::Challenge { name, .. } if name == NEW_PASSWORD_REQUIRED => Err(
            SessionError::UserNotConfirmed(MSG_USER_NOT_CONFIRMED.to_string()),
        ),
        AuthOutcome::Challenge { name, .. } => {
            warn!(target: "sg.services.idp", challenge = %name, "Unsupported login challenge");
            Err(SessionError::UnsupportedState(
                MSG_UNSUPPORTED_CHALLENGE.to_string(),
            ))
        }
    }
}

fn confirm_result(outcome: AuthOutcome) -> Result<TokenPair, SessionError> {
    match outcome {
        AuthOutcome::Authenticated(tokens) => Ok(tokens),
        AuthOutcome::Challenge { name, .. } => {
            warn!(target: "sg.services.idp", challenge = %name, "New password challenge answered with another challenge");
            Err(SessionError::UserNotConfirmed(
                MSG_CONFIRM_REJECTED.to_string(),
            ))
        }
    }
}

fn refresh_result(
    outcome: Result<AuthOutcome, SessionError>,
) -> Result<Option<TokenPair>, SessionError> {
    match outcome {
        Ok(AuthOutcome::Authenticated(tokens)) => Ok(Some(tokens)),
        Ok(AuthOutcome::Challenge { name, .. }) => {
            trace!(target: "sg.services.idp", challenge = %name, "Unable to refresh tokens, provider returned a challenge");
            Ok(None)
        }
        Err(SessionError::AuthenticationFailed(message)) => {
            trace!(target: "sg.services.idp", reason = %message, "Refresh token rejected");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

// ============================================================================
// HTTP Client
// ============================================================================

/// Identity provider client over HTTP.
pub struct HttpIdentityProvider {
    client: Client,
    endpoint: String,
    client_id: String,
}

impl HttpIdentityProvider {
    /// Create a client for the given provider endpoint and app client.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Internal` if the HTTP client cannot be built.
    pub fn new(
        endpoint: String,
        client_id: String,
        timeout: Duration,
    ) -> Result<Self, SessionError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| {
                error!(target: "sg.services.idp", error = %e, "Failed to build HTTP client");
                SessionError::Internal
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client_id,
        })
    }

    /// Create a client from service configuration.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Internal` if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, SessionError> {
        Self::new(
            config.idp_endpoint.clone(),
            config.user_pool_client_id.clone(),
            Duration::from_secs(config.http_client_timeout_seconds),
        )
    }

    /// Send one exchange and record its duration and outcome.
    async fn exchange(&self, request: &ChallengeRequest<'_>) -> Result<AuthOutcome, SessionError> {
        let start = Instant::now();
        let result = self.send(request).await;

        let status = match &result {
            Ok(_) => "success",
            Err(SessionError::ServiceUnavailable(_) | SessionError::Internal) => "error",
            Err(_) => "rejected",
        };
        metrics::record_idp_request(request.operation.label(), status, start.elapsed());

        result
    }

    async fn send(&self, request: &ChallengeRequest<'_>) -> Result<AuthOutcome, SessionError> {
        let body = serde_json::to_vec(request).map_err(|e| {
            error!(target: "sg.services.idp", error = %e, "Failed to encode provider request");
            SessionError::Internal
        })?;

        let response = self
            .client
            .post(format!("{}/", self.endpoint))
            .header(CONTENT_TYPE, AMZ_JSON_CONTENT_TYPE)
            .header(AMZ_TARGET_HEADER, request.operation.target())
            .body(body)
            .send()
            .await
            .map_err(|e| {
                warn!(target: "sg.services.idp", error = %e, "Identity provider request failed");
                SessionError::ServiceUnavailable(PROVIDER_UNAVAILABLE.to_string())
            })?;

        self.handle_response(response).await
    }

    /// Map the provider's status and body onto an outcome or error.
    async fn handle_response(
        &self,
        response: reqwest::Response,
    ) -> Result<AuthOutcome, SessionError> {
        let status = response.status();

        if status.is_success() {
            let body: ProviderResponse = response.json().await.map_err(|e| {
                error!(target: "sg.services.idp", error = %e, "Failed to parse provider response");
                SessionError::Internal
            })?;
            body.into_outcome()
        } else if status.is_server_error() {
            warn!(target: "sg.services.idp", status = %status, "Identity provider returned server error");
            Err(SessionError::ServiceUnavailable(
                PROVIDER_UNAVAILABLE.to_string(),
            ))
        } else {
            let body: ProviderErrorBody = response.json().await.unwrap_or_default();
            warn!(
                target: "sg.services.idp",
                status = %status,
                error_type = %body.kind(),
                "Identity provider rejected request"
            );
            Err(body.into_error())
        }
    }
}

#[async_trait::async_trait]
impl IdentityProviderClient for HttpIdentityProvider {
    #[instrument(skip_all, name = "sg.services.idp.login")]
    async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<TokenPair, SessionError> {
        let request =
            ChallengeRequest::password(&self.client_id, username, password.expose_secret());
        login_result(self.exchange(&request).await?)
    }

    #[instrument(skip_all, name = "sg.services.idp.confirm_registration")]
    async fn confirm_registration(
        &self,
        username: &str,
        temp_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<TokenPair, SessionError> {
        let initial =
            ChallengeRequest::password(&self.client_id, username, temp_password.expose_secret());

        let session = match self.exchange(&initial).await? {
            AuthOutcome::Challenge {
                name,
                session: Some(session),
            } if name == NEW_PASSWORD_REQUIRED => session,
            outcome => {
                warn!(target: "sg.services.idp", outcome = ?outcome, "User is not awaiting a new password");
                return Err(SessionError::UnsupportedState(
                    MSG_INCORRECT_STATE.to_string(),
                ));
            }
        };

        let response = ChallengeRequest::new_password(
            &self.client_id,
            session.expose_secret(),
            username,
            new_password.expose_secret(),
        );
        confirm_result(self.exchange(&response).await?)
    }

    #[instrument(skip_all, name = "sg.services.idp.refresh_tokens")]
    async fn refresh_tokens(
        &self,
        refresh_token: &str,
    ) -> Result<Option<TokenPair>, SessionError> {
        let request = ChallengeRequest::refresh(&self.client_id, refresh_token);
        refresh_result(self.exchange(&request).await)
    }
}

/// Mock identity provider for testing.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted provider answer for one operation.
    #[derive(Debug, Clone)]
    pub enum MockOutcome {
        /// Provider returns tokens.
        Tokens(TokenPair),
        /// Provider returns the named challenge.
        Challenge(String),
        /// Provider refuses with `NotAuthorizedException` and this message.
        Rejected(String),
        /// Provider cannot be reached.
        Unavailable,
    }

    impl MockOutcome {
        fn into_auth_outcome(self) -> Result<AuthOutcome, SessionError> {
            match self {
                MockOutcome::Tokens(tokens) => Ok(AuthOutcome::Authenticated(tokens)),
                MockOutcome::Challenge(name) => Ok(AuthOutcome::Challenge {
                    name,
                    session: Some(SecretString::from("mock-session")),
                }),
                MockOutcome::Rejected(message) => Err(SessionError::AuthenticationFailed(message)),
                MockOutcome::Unavailable => Err(SessionError::ServiceUnavailable(
                    "Mock identity provider unavailable".to_string(),
                )),
            }
        }
    }

    /// Mock identity provider with one scripted outcome per operation.
    ///
    /// Confirm scripts the answer to the new-password response; the user is
    /// assumed to be awaiting a new password.
    pub struct MockIdentityProvider {
        login: MockOutcome,
        confirm: MockOutcome,
        refresh: MockOutcome,
        login_calls: AtomicUsize,
        confirm_calls: AtomicUsize,
        refresh_calls: AtomicUsize,
    }

    impl MockIdentityProvider {
        /// Create a mock that rejects every operation.
        pub fn new() -> Self {
            let rejected = MockOutcome::Rejected("Incorrect username or password.".to_string());
            Self {
                login: rejected.clone(),
                confirm: rejected.clone(),
                refresh: rejected,
                login_calls: AtomicUsize::new(0),
                confirm_calls: AtomicUsize::new(0),
                refresh_calls: AtomicUsize::new(0),
            }
        }

        /// Create a mock whose refresh always returns `tokens`.
        pub fn refreshing(tokens: TokenPair) -> Self {
            Self::new().with_refresh(MockOutcome::Tokens(tokens))
        }

        /// Create a mock whose refresh is answered with a challenge.
        pub fn rejecting_refresh() -> Self {
            Self::new().with_refresh(MockOutcome::Challenge("SMS_MFA".to_string()))
        }

        pub fn with_login(mut self, outcome: MockOutcome) -> Self {
            self.login = outcome;
            self
        }

        pub fn with_confirm(mut self, outcome: MockOutcome) -> Self {
            self.confirm = outcome;
            self
        }

        pub fn with_refresh(mut self, outcome: MockOutcome) -> Self {
            self.refresh = outcome;
            self
        }

        pub fn login_calls(&self) -> usize {
            self.login_calls.load(Ordering::SeqCst)
        }

        pub fn confirm_calls(&self) -> usize {
            self.confirm_calls.load(Ordering::SeqCst)
        }

        pub fn refresh_calls(&self) -> usize {
            self.refresh_calls.load(Ordering::SeqCst)
        }
    }

    impl Default for MockIdentityProvider {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait::async_trait]
    impl IdentityProviderClient for MockIdentityProvider {
        async fn login(
            &self,
            _username: &str,
            _password: &SecretString,
        ) -> Result<TokenPair, SessionError> {
            self.login_calls.fetch_add(1, Ordering::SeqCst);
            login_result(self.login.clone().into_auth_outcome()?)
        }

        async fn confirm_registration(
            &self,
            _username: &str,
            _temp_password: &SecretString,
            _new_password: &SecretString,
        ) -> Result<TokenPair, SessionError> {
            self.confirm_calls.fetch_add(1, Ordering::SeqCst);
            confirm_result(self.confirm.clone().into_auth_outcome()?)
        }

        async fn refresh_tokens(
            &self,
            _refresh_token: &str,
        ) -> Result<Option<TokenPair>, SessionError> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            refresh_result(self.refresh.clone().into_auth_outcome())
        }
    }
}
