// src/cookie_middleware.rs
//! Bridges the `jwt` cookie into the Authorization header.
//!
//! Browsers transmit the session token as a cookie; API clients send a
//! bearer header. Rewriting the cookie into the header here means every
//! downstream consumer reads a single credential convention.

use axum::{
    extract::Request,
    http::{
        header::{AUTHORIZATION, COOKIE},
        HeaderValue,
    },
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::auth::cookies::SESSION_COOKIE;

pub async fn extract_jwt_from_cookie(mut request: Request, next: Next) -> Response {
    // An explicit Authorization header always wins over the cookie.
    if request.headers().get(AUTHORIZATION).is_none() {
        let token = request
            .headers()
            .get(COOKIE)
            .and_then(|h| h.to_str().ok())
            .and_then(|cookies| cookie_value(cookies, SESSION_COOKIE))
            .map(|t| t.to_string());

        if let Some(token) = token {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                debug!("Synthesized Authorization header from session cookie");
                request.headers_mut().insert(AUTHORIZATION, value);
            }
        }
    }

    next.run(request).await
}

/// Pull a single cookie value out of a `Cookie` header.
fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').map(str::trim).find_map(|pair| {
        pair.strip_prefix(name)
            .and_then(|rest| rest.strip_prefix('='))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_value_extracts_named_cookie() {
        assert_eq!(cookie_value("jwt=abc123", "jwt"), Some("abc123"));
        assert_eq!(
            cookie_value("theme=dark; jwt=abc123; lang=en", "jwt"),
            Some("abc123")
        );
    }

    #[test]
    fn test_cookie_value_ignores_prefix_collisions() {
        // "jwt_backup" must not match a lookup for "jwt"
        assert_eq!(cookie_value("jwt_backup=zzz", "jwt"), None);
        assert_eq!(
            cookie_value("jwt_backup=zzz; jwt=abc", "jwt"),
            Some("abc")
        );
    }

    #[test]
    fn test_cookie_value_missing() {
        assert_eq!(cookie_value("theme=dark", "jwt"), None);
        assert_eq!(cookie_value("", "jwt"), None);
    }
}
