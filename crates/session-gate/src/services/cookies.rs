//! Session cookie reading and writing.
//!
//! Two cookies carry the whole session:
//! - `s`: the id token, a browser-session cookie (no `Max-Age`)
//! - `rt`: the refresh token, kept for the configured `Max-Age`
//!
//! Both are `HttpOnly`, `SameSite=Lax`, `Path=/`, and `Secure` when
//! configured. Clearing re-issues the cookie with an empty value and
//! `Max-Age=0`.

use axum::http::{
    header::{COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};
use axum::response::{IntoResponseParts, ResponseParts};
use common::secret::{ExposeSecret, SecretString};
use std::convert::Infallible;

use crate::config::Config;

/// Cookie holding the id token.
pub const ID_COOKIE_NAME: &str = "s";

/// Cookie holding the refresh token.
pub const REFRESH_COOKIE_NAME: &str = "rt";

// ============================================================================
// Reading
// ============================================================================

/// Session tokens presented on an inbound request.
///
/// Empty cookie values count as absent.
#[derive(Clone, Default)]
pub struct RequestCookies {
    id_token: Option<String>,
    refresh_token: Option<SecretString>,
}

impl RequestCookies {
    pub fn new(id_token: Option<String>, refresh_token: Option<String>) -> Self {
        Self {
            id_token: id_token.filter(|v| !v.is_empty()),
            refresh_token: refresh_token
                .filter(|v| !v.is_empty())
                .map(SecretString::from),
        }
    }

    /// Read the session cookies from every `Cookie` header on the request.
    ///
    /// The first occurrence of each name wins.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut id_token = None;
        let mut refresh_token = None;

        let pairs = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|header| header.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='));

        for (name, value) in pairs {
            let slot = match name.trim() {
                ID_COOKIE_NAME => &mut id_token,
                REFRESH_COOKIE_NAME => &mut refresh_token,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.trim().trim_matches('"').to_string());
            }
        }

        Self::new(id_token, refresh_token)
    }

    pub fn id_token(&self) -> Option<&str> {
        self.id_token.as_deref()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_ref().map(|token| token.expose_secret())
    }
}

impl std::fmt::Debug for RequestCookies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCookies")
            .field("id_token", &self.id_token.as_ref().map(|_| "[REDACTED]"))
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

// ============================================================================
// Writing
// ============================================================================

/// Attributes applied to every session cookie this service writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    pub secure: bool,
    pub refresh_max_age_seconds: i64,
}

impl CookiePolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            secure: config.cookie_secure,
            refresh_max_age_seconds: config.refresh_cookie_max_age_seconds,
        }
    }

    /// `Set-Cookie` value carrying an id token. Returns `None` if the token
    /// contains characters not allowed in a cookie value.
    pub fn id_cookie(&self, token: &str) -> Option<HeaderValue> {
        self.build(ID_COOKIE_NAME, token, None)
    }

    /// `Set-Cookie` value carrying a refresh token.
    pub fn refresh_cookie(&self, token: &str) -> Option<HeaderValue> {
        self.build(REFRESH_COOKIE_NAME, token, Some(self.refresh_max_age_seconds))
    }

    /// `Set-Cookie` value that removes the named cookie.
    pub fn cleared(&self, name: &str) -> Option<HeaderValue> {
        self.build(name, "", Some(0))
    }

    fn build(&self, name: &str, value: &str, max_age: Option<i64>) -> Option<HeaderValue> {
        if !value.bytes().all(is_cookie_octet) {
            tracing::warn!(
                target: "sg.services.credentials",
                cookie = name,
                "Refusing to write cookie with invalid characters"
            );
            return None;
        }

        let mut cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax");
        if let Some(max_age) = max_age {
            cookie.push_str(&format!("; Max-Age={max_age}"));
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie).ok()
    }
}

/// RFC 6265 `cookie-octet`.
fn is_cookie_octet(b: u8) -> bool {
    matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E)
}

/// Accumulates `Set-Cookie` headers for the response of the current request.
///
/// Cookie writes made while verifying a request are carried here and
/// appended to whatever response the downstream handler produces. A later
/// write for the same cookie name replaces the earlier one.
#[derive(Debug, Default, Clone)]
pub struct CookieWriter {
    cookies: Vec<HeaderValue>,
}

impl CookieWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cookie: HeaderValue) {
        let existing = self
            .cookies
            .iter_mut()
            .find(|pending| cookie_name(pending) == cookie_name(&cookie));
        match existing {
            Some(slot) => *slot = cookie,
            None => self.cookies.push(cookie),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn cookies(&self) -> &[HeaderValue] {
        &self.cookies
    }

    /// Append pending cookies to `headers`. A cookie the headers already set
    /// takes precedence over a pending write with the same name.
    pub fn append_to(self, headers: &mut HeaderMap) {
        let already_set: Vec<Vec<u8>> = headers
            .get_all(SET_COOKIE)
            .iter()
            .map(|existing| cookie_name(existing).to_vec())
            .collect();

        for cookie in self.cookies {
            if !already_set.iter().any(|name| name.as_slice() == cookie_name(&cookie)) {
                headers.append(SET_COOKIE, cookie);
            }
        }
    }
}

fn cookie_name(cookie: &HeaderValue) -> &[u8] {
    let bytes = cookie.as_bytes();
    bytes.split(|&b| b == b'=').next().unwrap_or(bytes)
}

impl IntoResponseParts for CookieWriter {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        self.append_to(res.headers_mut());
        Ok(res)
    }
}
