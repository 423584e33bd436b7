//! Session credential management.
//!
//! The credential is a signed, caller-opaque token binding a request to a
//! user identifier and nothing else - no permissions, no expiry logic beyond
//! the cookie's own max-age. It travels as an http-only cookie valid for a
//! year, scoped to the whole site.
//!
//! There is no server-side revocation list: signout clears the cookie, but a
//! token that leaks stays cryptographically valid until it expires. That is
//! a documented limitation of this design, not an oversight.

use axum::http::{HeaderValue, header::HeaderMap};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use threadline_core::UserId;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "tl_session";

/// Credential lifetime in seconds (365 days), matching the cookie max-age.
const SESSION_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;

/// Errors issuing a credential.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Token signing failed.
    #[error("failed to sign session credential: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    /// Signed token produced an invalid cookie value.
    #[error("invalid cookie value")]
    InvalidCookie,
}

/// Claims carried by the credential. Only the user id matters; `iat`/`exp`
/// exist to bound the token to the cookie's lifetime.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: i32,
    iat: i64,
    exp: i64,
}

/// Issues and verifies signed session credentials.
///
/// The signing key is injected at construction from configuration; nothing
/// here reads the environment.
pub struct SessionTokenManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl SessionTokenManager {
    /// Create a manager from the configured signing secret.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Issue a credential for a user.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Signing` if token signing fails.
    pub fn issue(&self, user_id: UserId) -> Result<String, SessionError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.as_i32(),
            iat: now,
            exp: now + SESSION_TTL_SECONDS,
        };
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding,
        )?)
    }

    /// Verify a credential and extract the user id.
    ///
    /// Returns `None` on any invalid, tampered, or expired token. Absence of
    /// identity is a normal state for public routes, not a fault.
    #[must_use]
    pub fn verify(&self, credential: &str) -> Option<UserId> {
        jsonwebtoken::decode::<Claims>(credential, &self.decoding, &self.validation)
            .ok()
            .map(|data| UserId::new(data.claims.sub))
    }

    /// Extract and verify the credential from request headers.
    ///
    /// Returns `None` when the cookie is missing or does not verify.
    #[must_use]
    pub fn verify_from_headers(&self, headers: &HeaderMap) -> Option<UserId> {
        let credential = parse_cookie(headers, SESSION_COOKIE_NAME)?;
        self.verify(&credential)
    }

    /// Build the `Set-Cookie` value that attaches a credential to the caller.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidCookie` if the value cannot be encoded
    /// as a header (cannot happen for well-formed tokens).
    pub fn login_cookie(&self, credential: &str) -> Result<HeaderValue, SessionError> {
        HeaderValue::from_str(&format!(
            "{SESSION_COOKIE_NAME}={credential}; HttpOnly; SameSite=Lax; Path=/; Max-Age={SESSION_TTL_SECONDS}"
        ))
        .map_err(|_| SessionError::InvalidCookie)
    }

    /// Build the `Set-Cookie` value that removes the credential (signout).
    #[must_use]
    pub fn clear_cookie() -> HeaderValue {
        HeaderValue::from_static(concat!(
            "tl_session=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; ",
            "HttpOnly; SameSite=Lax; Path=/; Max-Age=0"
        ))
    }
}

/// Pull a named cookie out of the `Cookie` header.
fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get(axum::http::header::COOKIE)?;
    let cookie = cookie.to_str().ok()?;
    cookie.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_owned())
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn manager() -> SessionTokenManager {
        SessionTokenManager::new(&SecretString::from(
            "0123456789abcdef0123456789abcdef".to_owned(),
        ))
    }

    #[test]
    fn test_issue_verify_roundtrip() {
        let manager = manager();
        let token = manager.issue(UserId::new(42)).unwrap();
        assert_eq!(manager.verify(&token), Some(UserId::new(42)));
    }

    #[test]
    fn test_verify_rejects_tampered_token() {
        let manager = manager();
        let token = manager.issue(UserId::new(42)).unwrap();
        let tampered = format!("{token}x");
        assert_eq!(manager.verify(&tampered), None);
    }

    #[test]
    fn test_verify_rejects_token_from_other_key() {
        let manager = manager();
        let other = SessionTokenManager::new(&SecretString::from(
            "fedcba9876543210fedcba9876543210".to_owned(),
        ));
        let token = other.issue(UserId::new(42)).unwrap();
        assert_eq!(manager.verify(&token), None);
    }

    #[test]
    fn test_verify_from_headers() {
        let manager = manager();
        let token = manager.issue(UserId::new(7)).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_str(&format!("other=1; {SESSION_COOKIE_NAME}={token}")).unwrap(),
        );
        assert_eq!(manager.verify_from_headers(&headers), Some(UserId::new(7)));

        // Missing cookie is a normal no-identity state
        assert_eq!(manager.verify_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn test_login_cookie_shape() {
        let manager = manager();
        let token = manager.issue(UserId::new(1)).unwrap();
        let cookie = manager.login_cookie(&token).unwrap();
        let value = cookie.to_str().unwrap();
        assert!(value.starts_with("tl_session="));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("Max-Age=31536000"));
    }
}
