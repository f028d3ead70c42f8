//! Fixed RSA key fixtures for testing
//!
//! Two 2048-bit RSA keys checked in under `fixtures/`. Each fixture knows its
//! private key (for signing test id tokens) and its public modulus and
//! exponent (for publishing in a mock key set).

use jsonwebtoken::EncodingKey;
use serde_json::json;
use thiserror::Error;

/// Test fixture error type
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),
}

/// Public exponent shared by both fixtures (65537).
pub const TEST_EXPONENT: &str = "AQAB";

/// An RSA signing key published under a fixed key ID.
#[derive(Debug, Clone, Copy)]
pub struct TestSigningKey {
    /// Key ID written into token headers and the key set.
    pub kid: &'static str,
    /// Base64url modulus of the public key.
    pub modulus: &'static str,
    private_pem: &'static str,
}

impl TestSigningKey {
    /// Private key for signing tokens with RS256.
    pub fn encoding_key(&self) -> Result<EncodingKey, FixtureError> {
        EncodingKey::from_rsa_pem(self.private_pem.as_bytes())
            .map_err(|e| FixtureError::Crypto(format!("Failed to load test key: {e}")))
    }

    /// The same key published under a different key ID.
    pub fn with_kid(self, kid: &'static str) -> Self {
        Self { kid, ..self }
    }

    /// JWK entry as the provider's key set publishes it.
    pub fn jwk(&self) -> serde_json::Value {
        json!({
            "kty": "RSA",
            "kid": self.kid,
            "n": self.modulus,
            "e": TEST_EXPONENT,
            "alg": "RS256",
            "use": "sig"
        })
    }
}

/// The key the mock identity provider signs with by default.
pub fn primary_key() -> TestSigningKey {
    TestSigningKey {
        kid: "test-key-1",
        modulus: "rbKTllvlk8zU2aiIcNtxrngijzgDyRnx6bOQ44GRnQgpyUKSvWeqO2de63xRwX29JGbz-ioxnFeKi26X4t7QLLZ9TvfvmesfO_WnROtj5p2ALioneX_0BaOwDhirxjiIsU3oEOmWenqOF-9DmRZzNYb-OGSdKSiQcT5nbe4gobsZ0sF4zRsXhnvbznhYxyWqKnWb0pQlQYhhlrxsxXSUhHRPrSqTBqZUkJS5AtBZDVQmbfgjSyKy2KtFlrHYESyhzslpCQdkd0yLRxIXVejFirw-7Yi6pK7s0kLYkXfw4jWC3K4AP91AJSPQJJ7S0Vr66NNwuQ8f8EWF79XZYUU01w",
        private_pem: include_str!("../fixtures/test_rsa_key_1.pem"),
    }
}

/// A second, unrelated key.
pub fn secondary_key() -> TestSigningKey {
    TestSigningKey {
        kid: "test-key-2",
        modulus: "lhAmAsJ0n7A1BSlClGEAK4TL3MTyNQv-9u0Jv9qU0bnzq6wFMPUmlhW4w6-d8Fe7Jrs1hdCjkxBKnM4UbB5UaXk_H3PZLt9iy-eRiS0K5jDpiXKZEmmGK2qiT3OgH0HNRY8bepuwBml3GXVjRJ3TG_3zunK0Fzks82e3ZYtioXe9RrJA9Yrk5PQAEqpsWAfgQE3PVv8Af1MRJGl7KUmn0tZn-R6m5jCbF2sdKKbQUcrDZwDgRGR1ePuODYGcYhjCMv4h3xG964EvCUi9UMimypusvRk1DUnHkeMHf_JLUKRaGXyaMYjGFckorV7zNRvV_5LRVf3ttOOLHEt_sKCZMQ",
        private_pem: include_str!("../fixtures/test_rsa_key_2.pem"),
    }
}

/// Key set document publishing `keys`.
pub fn jwks_body(keys: &[TestSigningKey]) -> serde_json::Value {
    json!({ "keys": keys.iter().map(TestSigningKey::jwk).collect::<Vec<_>>() })
}
