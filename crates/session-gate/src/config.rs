//! Session Gate configuration.
//!
//! Configuration is loaded from environment variables. The user pool client
//! ID is redacted in Debug output.

use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default refresh cookie lifetime in seconds (30 days).
pub const DEFAULT_REFRESH_COOKIE_MAX_AGE_SECONDS: i64 = 2_592_000;

/// Default bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default timeout for outbound HTTP calls (key set and identity provider).
pub const DEFAULT_HTTP_CLIENT_TIMEOUT_SECONDS: u64 = 10;

/// Upper bound for the outbound HTTP timeout.
pub const MAX_HTTP_CLIENT_TIMEOUT_SECONDS: u64 = 60;

/// Session Gate configuration.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// URL of the key set (JWKS) endpoint publishing token verification keys.
    pub jwks_url: String,

    /// Identity provider user pool identifier, `<region>_<id>`.
    pub user_pool_id: String,

    /// Identity provider app client identifier - redacted in Debug output.
    pub user_pool_client_id: String,

    /// Identity provider API endpoint. Derived from the pool region unless
    /// `IDP_ENDPOINT` is set.
    pub idp_endpoint: String,

    /// Whether session cookies carry the `Secure` attribute (default: true).
    pub cookie_secure: bool,

    /// `Max-Age` of the refresh token cookie in seconds.
    pub refresh_cookie_max_age_seconds: i64,

    /// Timeout applied to key set and identity provider requests.
    pub http_client_timeout_seconds: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("jwks_url", &self.jwks_url)
            .field("user_pool_id", &self.user_pool_id)
            .field("user_pool_client_id", &"[REDACTED]")
            .field("idp_endpoint", &self.idp_endpoint)
            .field("cookie_secure", &self.cookie_secure)
            .field(
                "refresh_cookie_max_age_seconds",
                &self.refresh_cookie_max_age_seconds,
            )
            .field(
                "http_client_timeout_seconds",
                &self.http_client_timeout_seconds,
            )
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid user pool configuration: {0}")]
    InvalidUserPool(String),

    #[error("Invalid cookie configuration: {0}")]
    InvalidCookie(String),

    #[error("Invalid HTTP client timeout configuration: {0}")]
    InvalidHttpTimeout(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let jwks_url = required(vars, "JWKS_URL")?;
        let user_pool_id = required(vars, "USER_POOL_ID")?;
        let user_pool_client_id = required(vars, "USER_POOL_CLIENT_ID")?;

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let idp_endpoint = match vars.get("IDP_ENDPOINT") {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => {
                let region = pool_region(&user_pool_id)?;
                format!("https://cognito-idp.{}.amazonaws.com", region)
            }
        };

        let cookie_secure = match vars.get("AUTH_COOKIE_SECURE") {
            Some(value) => parse_bool(value).ok_or_else(|| {
                ConfigError::InvalidCookie(format!(
                    "AUTH_COOKIE_SECURE must be true or false, got '{}'",
                    value
                ))
            })?,
            None => true,
        };

        // Parse refresh cookie lifetime with validation
        let refresh_cookie_max_age_seconds =
            if let Some(value_str) = vars.get("REFRESH_COOKIE_MAX_AGE_SECONDS") {
                let value: i64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidCookie(format!(
                        "REFRESH_COOKIE_MAX_AGE_SECONDS must be a valid integer, got '{}': {}",
                        value_str, e
                    ))
                })?;

                if value <= 0 {
                    return Err(ConfigError::InvalidCookie(format!(
                        "REFRESH_COOKIE_MAX_AGE_SECONDS must be positive, got {}",
                        value
                    )));
                }

                value
            } else {
                DEFAULT_REFRESH_COOKIE_MAX_AGE_SECONDS
            };

        let http_client_timeout_seconds =
            if let Some(value_str) = vars.get("HTTP_CLIENT_TIMEOUT_SECONDS") {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidHttpTimeout(format!(
                        "HTTP_CLIENT_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                        value_str, e
                    ))
                })?;

                if value == 0 || value > MAX_HTTP_CLIENT_TIMEOUT_SECONDS {
                    return Err(ConfigError::InvalidHttpTimeout(format!(
                        "HTTP_CLIENT_TIMEOUT_SECONDS must be between 1 and {}, got {}",
                        MAX_HTTP_CLIENT_TIMEOUT_SECONDS, value
                    )));
                }

                value
            } else {
                DEFAULT_HTTP_CLIENT_TIMEOUT_SECONDS
            };

        Ok(Config {
            bind_address,
            jwks_url,
            user_pool_id,
            user_pool_client_id,
            idp_endpoint,
            cookie_secure,
            refresh_cookie_max_age_seconds,
            http_client_timeout_seconds,
        })
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

/// Region prefix of a user pool ID (`us-east-1_AbCdEf` -> `us-east-1`).
fn pool_region(user_pool_id: &str) -> Result<&str, ConfigError> {
    match user_pool_id.split_once('_') {
        Some((region, id)) if !region.is_empty() && !id.is_empty() => Ok(region),
        _ => Err(ConfigError::InvalidUserPool(format!(
            "USER_POOL_ID must have the form <region>_<id>, got '{}'",
            user_pool_id
        ))),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            (
                "JWKS_URL".to_string(),
                "https://keys.example.com/.well-known/jwks.json".to_string(),
            ),
            ("USER_POOL_ID".to_string(), "ca-central-1_Abc123".to_string()),
            ("USER_POOL_CLIENT_ID".to_string(), "client-xyz".to_string()),
        ])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(
            config.jwks_url,
            "https://keys.example.com/.well-known/jwks.json"
        );
        assert_eq!(config.user_pool_id, "ca-central-1_Abc123");
        assert_eq!(config.user_pool_client_id, "client-xyz");
        assert_eq!(
            config.idp_endpoint,
            "https://cognito-idp.ca-central-1.amazonaws.com"
        );
        assert!(config.cookie_secure);
        assert_eq!(config.refresh_cookie_max_age_seconds, 2_592_000);
        assert_eq!(
            config.http_client_timeout_seconds,
            DEFAULT_HTTP_CLIENT_TIMEOUT_SECONDS
        );
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let mut vars = base_vars();
        vars.insert("BIND_ADDRESS".to_string(), "127.0.0.1:9000".to_string());
        vars.insert(
            "IDP_ENDPOINT".to_string(),
            "http://localhost:9229/".to_string(),
        );
        vars.insert("AUTH_COOKIE_SECURE".to_string(), "false".to_string());
        vars.insert(
            "REFRESH_COOKIE_MAX_AGE_SECONDS".to_string(),
            "3600".to_string(),
        );
        vars.insert("HTTP_CLIENT_TIMEOUT_SECONDS".to_string(), "5".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.idp_endpoint, "http://localhost:9229");
        assert!(!config.cookie_secure);
        assert_eq!(config.refresh_cookie_max_age_seconds, 3600);
        assert_eq!(config.http_client_timeout_seconds, 5);
    }

    #[test]
    fn test_from_vars_missing_jwks_url() {
        let mut vars = base_vars();
        vars.remove("JWKS_URL");

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "JWKS_URL"));
    }

    #[test]
    fn test_from_vars_missing_client_id() {
        let mut vars = base_vars();
        vars.insert("USER_POOL_CLIENT_ID".to_string(), "  ".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "USER_POOL_CLIENT_ID")
        );
    }

    #[test]
    fn test_user_pool_without_region_rejected() {
        let mut vars = base_vars();
        vars.insert("USER_POOL_ID".to_string(), "nounderscore".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidUserPool(msg)) if msg.contains("<region>_<id>"))
        );
    }

    #[test]
    fn test_user_pool_without_region_allowed_with_explicit_endpoint() {
        let mut vars = base_vars();
        vars.insert("USER_POOL_ID".to_string(), "local-pool".to_string());
        vars.insert(
            "IDP_ENDPOINT".to_string(),
            "http://localhost:9229".to_string(),
        );

        let config = Config::from_vars(&vars).expect("Config should load successfully");
        assert_eq!(config.idp_endpoint, "http://localhost:9229");
    }

    #[test]
    fn test_cookie_secure_rejects_garbage() {
        let mut vars = base_vars();
        vars.insert("AUTH_COOKIE_SECURE".to_string(), "maybe".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidCookie(msg)) if msg.contains("true or false")));
    }

    #[test]
    fn test_refresh_max_age_rejects_zero() {
        let mut vars = base_vars();
        vars.insert(
            "REFRESH_COOKIE_MAX_AGE_SECONDS".to_string(),
            "0".to_string(),
        );

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidCookie(msg)) if msg.contains("must be positive"))
        );
    }

    #[test]
    fn test_refresh_max_age_rejects_non_numeric() {
        let mut vars = base_vars();
        vars.insert(
            "REFRESH_COOKIE_MAX_AGE_SECONDS".to_string(),
            "thirty-days".to_string(),
        );

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidCookie(msg)) if msg.contains("must be a valid integer"))
        );
    }

    #[test]
    fn test_http_timeout_bounds() {
        let mut vars = base_vars();
        vars.insert("HTTP_CLIENT_TIMEOUT_SECONDS".to_string(), "0".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidHttpTimeout(_))
        ));

        vars.insert("HTTP_CLIENT_TIMEOUT_SECONDS".to_string(), "61".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidHttpTimeout(_))
        ));

        vars.insert("HTTP_CLIENT_TIMEOUT_SECONDS".to_string(), "60".to_string());
        assert!(Config::from_vars(&vars).is_ok());
    }

    #[test]
    fn test_debug_redacts_client_id() {
        let config = Config::from_vars(&base_vars()).unwrap();
        let debug_str = format!("{:?}", config);

        assert!(!debug_str.contains("client-xyz"));
        assert!(debug_str.contains("[REDACTED]"));
        assert!(debug_str.contains("ca-central-1_Abc123"));
    }
}
