//! Integration tests for id token verification with real RSA signatures.
//!
//! The key set is served by wiremock from the shared RSA test fixtures.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use session_gate::auth::{KeyResolver, TokenVerifier};
use session_gate::errors::SessionError;
use session_test_utils::*;
use std::sync::Arc;
use wiremock::MockServer;

async fn verifier_for(keys: &[TestSigningKey]) -> (TokenVerifier, MockServer) {
    let provider = MockServer::start().await;
    jwks_mock(keys).mount(&provider).await;
    let resolver = KeyResolver::new(format!("{}{}", provider.uri(), JWKS_PATH));
    (TokenVerifier::new(Arc::new(resolver)), provider)
}

#[tokio::test]
async fn test_signed_token_yields_identity() {
    let (verifier, _provider) = verifier_for(&[primary_key()]).await;
    let token = TestTokenBuilder::new()
        .for_user("alice")
        .with_groups(&["contributor", "admin"])
        .sign(&primary_key())
        .unwrap();

    let identity = verifier.verify(&token).await.unwrap().unwrap();

    assert!(identity.is_authenticated());
    assert_eq!(identity.principal(), "alice");
    assert_eq!(identity.roles().collect::<Vec<_>>(), vec!["ADMIN", "CONTRIBUTOR"]);
    assert!(identity.has_role("contributor"));
}

#[tokio::test]
async fn test_token_without_groups_has_no_roles() {
    let (verifier, _provider) = verifier_for(&[primary_key()]).await;
    let token = TestTokenBuilder::new()
        .for_user("bob")
        .sign(&primary_key())
        .unwrap();

    let identity = verifier.verify(&token).await.unwrap().unwrap();

    assert_eq!(identity.principal(), "bob");
    assert_eq!(identity.roles().count(), 0);
}

#[tokio::test]
async fn test_expired_token_is_none() {
    let (verifier, _provider) = verifier_for(&[primary_key()]).await;
    let token = TestTokenBuilder::new()
        .expires_in(-1)
        .sign(&primary_key())
        .unwrap();

    assert!(verifier.verify(&token).await.unwrap().is_none());
}

#[tokio::test]
async fn test_token_signed_by_other_key_is_none() {
    let (verifier, _provider) = verifier_for(&[primary_key()]).await;
    // Claims the primary key's kid but is signed with the secondary key
    let forged = secondary_key().with_kid(primary_key().kid);
    let token = TestTokenBuilder::new().sign(&forged).unwrap();

    assert!(verifier.verify(&token).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unknown_kid_is_none() {
    let (verifier, _provider) = verifier_for(&[primary_key()]).await;
    let token = TestTokenBuilder::new().sign(&secondary_key()).unwrap();

    assert!(verifier.verify(&token).await.unwrap().is_none());
}

#[tokio::test]
async fn test_second_published_key_verifies() {
    let (verifier, _provider) = verifier_for(&[primary_key(), secondary_key()]).await;
    let token = TestTokenBuilder::new()
        .for_user("carol")
        .sign(&secondary_key())
        .unwrap();

    let identity = verifier.verify(&token).await.unwrap().unwrap();
    assert_eq!(identity.principal(), "carol");
}

#[tokio::test]
async fn test_token_without_username_is_none() {
    let (verifier, _provider) = verifier_for(&[primary_key()]).await;
    let token = TestTokenBuilder::new()
        .without_username()
        .sign(&primary_key())
        .unwrap();

    assert!(verifier.verify(&token).await.unwrap().is_none());
}

#[tokio::test]
async fn test_hs256_token_is_unsupported_algorithm() {
    let (verifier, _provider) = verifier_for(&[primary_key()]).await;
    let token = TestTokenBuilder::new()
        .sign_hs256(primary_key().kid, b"shared-secret")
        .unwrap();

    let result = verifier.verify(&token).await;

    assert!(
        matches!(&result, Err(SessionError::UnsupportedAlgorithm(alg)) if alg == "HS256"),
        "Expected UnsupportedAlgorithm, got {:?}",
        result
    );
}

#[tokio::test]
async fn test_key_is_fetched_once_for_repeated_verification() {
    let provider = MockServer::start().await;
    jwks_mock(&[primary_key()])
        .expect(1)
        .mount(&provider)
        .await;
    let resolver = Arc::new(KeyResolver::new(format!("{}{}", provider.uri(), JWKS_PATH)));
    let verifier = TokenVerifier::new(Arc::clone(&resolver));
    let token = TestTokenBuilder::new().sign(&primary_key()).unwrap();

    for _ in 0..3 {
        assert!(verifier.verify(&token).await.unwrap().is_some());
    }
    assert_eq!(resolver.cached_key_count().await, 1);
}
