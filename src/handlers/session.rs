//! Session cookie plumbing and the request extractors built on it.
//!
//! The browser holds only a signed token; everything sensitive stays
//! server-side. Extraction verifies the token signature and resolves it
//! against the session store, so a handler that receives a [`SessionAuth`]
//! has a complete, consistent credential snapshot for the request.

use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};
use std::convert::Infallible;

use crate::errors::AppError;
use crate::models::credential::StoredCredential;
use crate::services::storage_service::StorageService;

/// Cookie carrying the signed session token.
pub const SESSION_COOKIE: &str = "s3_console_session";

/// Extract the session token from the Cookie header, if present.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

/// Set-Cookie value binding the token to the browser.
pub fn session_cookie(token: &str) -> String {
    format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax",
        SESSION_COOKIE, token
    )
}

/// Set-Cookie value that clears the session cookie.
pub fn clear_session_cookie() -> String {
    format!(
        "{}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0",
        SESSION_COOKIE
    )
}

/// An authenticated request context: the session id plus a snapshot of the
/// credential bound to it.
///
/// Rejects with `Unauthenticated` (401). Page handlers that should redirect
/// to the login view instead use [`MaybeAuth`].
pub struct SessionAuth {
    pub session_id: String,
    pub credential: StoredCredential,
}

impl FromRequestParts<StorageService> for SessionAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &StorageService,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers);
        let (session_id, credential) = state.credential_for_token(token.as_deref()).await?;
        Ok(SessionAuth {
            session_id,
            credential,
        })
    }
}

/// Like [`SessionAuth`] but never rejects.
pub struct MaybeAuth(pub Option<SessionAuth>);

impl FromRequestParts<StorageService> for MaybeAuth {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &StorageService,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuth(
            SessionAuth::from_request_parts(parts, state).await.ok(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn token_is_found_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; s3_console_session=abc.123; lang=en"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc.123"));
    }

    #[test]
    fn missing_cookie_yields_none() {
        assert_eq!(session_token(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }
}
