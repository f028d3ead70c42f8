//! Session endpoints.
//!
//! Login, confirm and logoff are stateless: every outcome is expressed as
//! `Set-Cookie` headers on a `204 No Content` response.

use crate::errors::SessionError;
use crate::middleware::SecurityContext;
use crate::models::{ConfirmForm, LoginForm, SessionResponse};
use crate::routes::AppState;
use crate::services::CookieWriter;
use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Form, Json,
};
use std::sync::Arc;
use tracing::instrument;

fn form_body<T>(form: Result<Form<T>, FormRejection>) -> Result<T, SessionError> {
    form.map(|Form(body)| body).map_err(|e| {
        tracing::debug!(target: "sg.handlers.session", error = %e, "Rejected session form");
        SessionError::BadRequest(e.body_text())
    })
}

fn require_username(username: &str) -> Result<(), SessionError> {
    if username.trim().is_empty() {
        return Err(SessionError::BadRequest("username is required".to_string()));
    }
    Ok(())
}

/// Handler for POST /api/session
///
/// Authenticates with username and password and stores the issued tokens
/// in the session cookies.
///
/// # Response
///
/// - 204 with `Set-Cookie: s=...` and `Set-Cookie: rt=...`
/// - 401 if the provider rejects the credentials (provider message relayed)
/// - 400 `USER_NOT_CONFIRMED` if the user must first set a new password
#[instrument(skip_all, name = "sg.handlers.session.login")]
pub async fn login(
    State(state): State<Arc<AppState>>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<impl IntoResponse, SessionError> {
    let form = form_body(form)?;
    require_username(&form.username)?;

    let tokens = state
        .coordinator
        .identity_provider()
        .login(&form.username, &form.password)
        .await?;

    let mut writer = CookieWriter::new();
    state.coordinator.save(&tokens, &mut writer);

    tracing::info!(target: "sg.handlers.session", "User logged in");
    Ok((StatusCode::NO_CONTENT, writer, ()))
}

/// Handler for POST /api/session/confirm
///
/// Replaces a temporary password with a permanent one and logs the user in.
#[instrument(skip_all, name = "sg.handlers.session.confirm")]
pub async fn confirm(
    State(state): State<Arc<AppState>>,
    form: Result<Form<ConfirmForm>, FormRejection>,
) -> Result<impl IntoResponse, SessionError> {
    let form = form_body(form)?;
    require_username(&form.username)?;

    let tokens = state
        .coordinator
        .identity_provider()
        .confirm_registration(&form.username, &form.temp_password, &form.new_password)
        .await?;

    let mut writer = CookieWriter::new();
    state.coordinator.save(&tokens, &mut writer);

    tracing::info!(target: "sg.handlers.session", "User confirmed registration");
    Ok((StatusCode::NO_CONTENT, writer, ()))
}

/// Handler for DELETE /api/session
///
/// Clears both session cookies. Requires an authenticated caller.
#[instrument(skip_all, name = "sg.handlers.session.logoff")]
pub async fn logoff(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<SecurityContext>,
) -> Result<impl IntoResponse, SessionError> {
    context.require_authenticated()?;

    let mut writer = CookieWriter::new();
    state.coordinator.clear(&mut writer);

    tracing::info!(target: "sg.handlers.session", "User logged off");
    Ok((StatusCode::NO_CONTENT, writer, ()))
}

/// Handler for GET /api/session
///
/// ## Response
///
/// ```json
/// {"principal": "alice", "roles": ["CONTRIBUTOR"]}
/// ```
#[instrument(skip_all, name = "sg.handlers.session.current")]
pub async fn current_session(
    Extension(context): Extension<SecurityContext>,
) -> Result<Json<SessionResponse>, SessionError> {
    let identity = context.require_authenticated()?;

    Ok(Json(SessionResponse {
        principal: identity.principal().to_string(),
        roles: identity.roles().map(str::to_string).collect(),
    }))
}
