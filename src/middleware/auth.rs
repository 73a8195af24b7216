// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava credential middleware.
//!
//! The session is the Strava refresh token itself, kept in an HttpOnly
//! cookie. Non-browser clients may send it as a bearer token instead.

use crate::error::AppError;
use axum::{extract::Request, http::header, middleware::Next, response::Response};
use axum_extra::extract::cookie::CookieJar;

/// Cookie holding the short-lived access token (informational only).
pub const ACCESS_TOKEN_COOKIE: &str = "strava_access_token";
/// Cookie holding the refresh token that identifies the session.
pub const REFRESH_TOKEN_COOKIE: &str = "strava_refresh_token";

/// Credential extracted from the request.
#[derive(Clone)]
pub struct StravaCredential {
    pub refresh_token: String,
}

impl std::fmt::Debug for StravaCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StravaCredential")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Middleware that requires a Strava refresh token.
pub async fn require_auth(
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Try cookie first, then header
    let token = match jar.get(REFRESH_TOKEN_COOKIE) {
        Some(cookie) if !cookie.value().is_empty() => cookie.value().to_string(),
        _ => {
            let auth_header = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok());

            match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
                Some(t) if !t.trim().is_empty() => t.trim().to_string(),
                _ => {
                    tracing::debug!("No refresh token on request");
                    return Err(AppError::Unauthorized);
                }
            }
        }
    };

    request.extensions_mut().insert(StravaCredential {
        refresh_token: token,
    });

    Ok(next.run(request).await)
}
