//! Key resolver for id token verification keys.
//!
//! Fetches RSA public keys from the identity provider's key set
//! (`/.well-known/jwks.json`) and caches one decoding key per key ID for the
//! lifetime of the process.
//!
//! # Caching
//!
//! - A key ID is fetched on first use and never evicted. Providers rotate by
//!   publishing new key IDs, never by changing the key behind an old one.
//! - Concurrent misses on the same key ID may fetch twice; the second insert
//!   overwrites the first with an identical key.

use crate::errors::SessionError;
use crate::observability::metrics;
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::instrument;

/// The only token signing algorithm accepted.
pub const SUPPORTED_ALGORITHM: &str = "RS256";

/// Default timeout for key set requests in seconds.
const DEFAULT_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// JSON Web Key from the key set endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type (expected "RSA").
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    pub kid: String,

    /// RSA modulus (base64url encoded).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url encoded).
    #[serde(default)]
    pub e: Option<String>,

    /// Algorithm (should be "RS256").
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use (should be "sig" for signing).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
}

/// Key set response body.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    /// List of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

/// A verification key bound to its key ID.
#[derive(Clone)]
pub struct CachedKey {
    key_id: String,
    decoding_key: DecodingKey,
}

impl CachedKey {
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

impl fmt::Debug for CachedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedKey")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

/// Resolves key IDs to verification keys, caching them for the process lifetime.
pub struct KeyResolver {
    /// URL to the key set endpoint.
    jwks_url: String,

    /// HTTP client for fetching the key set.
    http_client: reqwest::Client,

    /// Resolved keys by key ID.
    cache: Arc<RwLock<HashMap<String, Arc<CachedKey>>>>,
}

impl KeyResolver {
    /// Create a new key resolver with the default fetch timeout.
    pub fn new(jwks_url: String) -> Self {
        Self::with_timeout(jwks_url, Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECONDS))
    }

    /// Create a new key resolver with a custom fetch timeout.
    pub fn with_timeout(jwks_url: String, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "sg.auth.keys", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Resolve a key ID to its verification key.
    ///
    /// Returns the cached key without I/O when present; otherwise fetches the
    /// key set, builds the key and caches it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::KeyLookup` if the key set cannot be fetched or
    /// does not contain a usable key for `kid`.
    #[instrument(skip(self), fields(kid = %kid))]
    pub async fn resolve(&self, kid: &str) -> Result<Arc<CachedKey>, SessionError> {
        // Check cache first
        {
            let cache = self.cache.read().await;
            if let Some(key) = cache.get(kid) {
                tracing::debug!(target: "sg.auth.keys", kid = %kid, "Key cache hit");
                return Ok(Arc::clone(key));
            }
        }

        let key = Arc::new(self.fetch_key(kid).await?);

        {
            let mut cache = self.cache.write().await;
            cache.insert(kid.to_string(), Arc::clone(&key));
        }

        tracing::info!(target: "sg.auth.keys", kid = %kid, "Verification key cached");
        Ok(key)
    }

    /// Number of key IDs currently cached.
    pub async fn cached_key_count(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Fetch the key set and build the key for `kid`.
    async fn fetch_key(&self, kid: &str) -> Result<CachedKey, SessionError> {
        tracing::debug!(target: "sg.auth.keys", url = %self.jwks_url, "Fetching key set");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "sg.auth.keys", error = %e, "Failed to fetch key set");
                metrics::record_key_fetch("error");
                SessionError::KeyLookup("Key set endpoint unreachable".to_string())
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "sg.auth.keys",
                status = %response.status(),
                "Key set endpoint returned error"
            );
            metrics::record_key_fetch("error");
            return Err(SessionError::KeyLookup(format!(
                "Key set endpoint returned {}",
                response.status()
            )));
        }

        let jwks: JwksResponse = response.json().await.map_err(|e| {
            tracing::error!(target: "sg.auth.keys", error = %e, "Failed to parse key set response");
            metrics::record_key_fetch("error");
            SessionError::KeyLookup("Key set response is not valid JSON".to_string())
        })?;

        let Some(jwk) = jwks.keys.iter().find(|key| key.kid == kid) else {
            tracing::warn!(target: "sg.auth.keys", kid = %kid, key_count = jwks.keys.len(), "Key ID not found in key set");
            metrics::record_key_fetch("not_found");
            return Err(SessionError::KeyLookup(format!("Key ID {} not found", kid)));
        };

        let key = build_key(jwk).inspect_err(|_| metrics::record_key_fetch("invalid"))?;
        metrics::record_key_fetch("success");
        Ok(key)
    }
}

/// Build an RS256 verification key from a JWK.
fn build_key(jwk: &Jwk) -> Result<CachedKey, SessionError> {
    if jwk.kty != "RSA" {
        tracing::warn!(target: "sg.auth.keys", kty = %jwk.kty, "Unexpected JWK key type");
        return Err(SessionError::KeyLookup(format!(
            "Key {} has unsupported key type {}",
            jwk.kid, jwk.kty
        )));
    }
    if let Some(alg) = &jwk.alg {
        if alg != SUPPORTED_ALGORITHM {
            tracing::warn!(target: "sg.auth.keys", alg = %alg, "Unexpected JWK algorithm");
            return Err(SessionError::KeyLookup(format!(
                "Key {} has unsupported algorithm {}",
                jwk.kid, alg
            )));
        }
    }

    let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
        tracing::error!(target: "sg.auth.keys", kid = %jwk.kid, "JWK missing n or e field");
        return Err(SessionError::KeyLookup(format!(
            "Key {} is missing RSA components",
            jwk.kid
        )));
    };

    let decoding_key = DecodingKey::from_rsa_components(n, e).map_err(|err| {
        tracing::error!(target: "sg.auth.keys", kid = %jwk.kid, error = %err, "Invalid RSA components");
        SessionError::KeyLookup(format!("Key {} has invalid RSA components", jwk.kid))
    })?;

    Ok(CachedKey {
        key_id: jwk.kid.clone(),
        decoding_key,
    })
}
