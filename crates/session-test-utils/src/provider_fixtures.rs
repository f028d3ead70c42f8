//! Wiremock builders for the key set endpoint and the identity provider
//!
//! Each function returns an unmounted [`Mock`] so tests can add
//! `.expect(n)` before mounting.

use crate::crypto_fixtures::{jwks_body, TestSigningKey};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

/// Path the mock key set is served from.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

pub const INITIATE_AUTH_TARGET: &str = "AWSCognitoIdentityProviderService.InitiateAuth";
pub const RESPOND_TO_CHALLENGE_TARGET: &str =
    "AWSCognitoIdentityProviderService.RespondToAuthChallenge";

/// Key set endpoint publishing `keys`.
pub fn jwks_mock(keys: &[TestSigningKey]) -> Mock {
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body(keys)))
}

/// Password login (`USER_PASSWORD_AUTH`) answered with `response`.
pub fn login_mock(response: ResponseTemplate) -> Mock {
    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("X-Amz-Target", INITIATE_AUTH_TARGET))
        .and(body_partial_json(json!({"AuthFlow": "USER_PASSWORD_AUTH"})))
        .respond_with(response)
}

/// Refresh grant (`REFRESH_TOKEN_AUTH`) answered with `response`.
pub fn refresh_mock(response: ResponseTemplate) -> Mock {
    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("X-Amz-Target", INITIATE_AUTH_TARGET))
        .and(body_partial_json(json!({"AuthFlow": "REFRESH_TOKEN_AUTH"})))
        .respond_with(response)
}

/// New password challenge response answered with `response`.
pub fn new_password_mock(response: ResponseTemplate) -> Mock {
    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("X-Amz-Target", RESPOND_TO_CHALLENGE_TARGET))
        .and(body_partial_json(
            json!({"ChallengeName": "NEW_PASSWORD_REQUIRED"}),
        ))
        .respond_with(response)
}

/// Successful authentication result.
pub fn tokens_response(id_token: &str, refresh_token: Option<&str>) -> ResponseTemplate {
    let mut result = json!({
        "IdToken": id_token,
        "AccessToken": "test-access-token",
        "ExpiresIn": 3600,
        "TokenType": "Bearer"
    });
    if let Some(refresh_token) = refresh_token {
        result["RefreshToken"] = json!(refresh_token);
    }
    ResponseTemplate::new(200).set_body_json(json!({
        "AuthenticationResult": result,
        "ChallengeParameters": {}
    }))
}

/// Challenge instead of tokens.
pub fn challenge_response(challenge_name: &str, session: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "ChallengeName": challenge_name,
        "Session": session,
        "ChallengeParameters": {}
    }))
}

/// Provider-reported error, e.g. `NotAuthorizedException`.
pub fn error_response(error_type: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_json(json!({
        "__type": error_type,
        "message": message
    }))
}
