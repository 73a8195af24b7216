// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava OAuth authentication routes.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::get,
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use ring::rand::{SecureRandom, SystemRandom};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};
use crate::middleware::auth::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// How long a signed OAuth state stays valid.
const OAUTH_STATE_MAX_AGE_MILLIS: u128 = 10 * 60 * 1000;

/// Binds an OAuth `state` to the browser that started the flow.
const OAUTH_NONCE_COOKIE: &str = "oauth_nonce";
const OAUTH_NONCE_MAX_AGE: time::Duration = time::Duration::minutes(10);

const ACCESS_TOKEN_MAX_AGE: time::Duration = time::Duration::hours(1);
const REFRESH_TOKEN_MAX_AGE: time::Duration = time::Duration::days(30);

const STRAVA_SCOPES: &str = "read,activity:read_all";
const LOGIN_PAGE: &str = "/login.html";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/strava", get(auth_start))
        .route("/auth/strava/callback", get(auth_callback))
        .route("/auth/logout", get(logout).post(logout))
}

/// Start OAuth flow - redirect to Strava authorization.
///
/// The state's nonce is also set as a cookie; the callback only accepts a
/// state whose nonce matches it.
async fn auth_start(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect)> {
    let (oauth_state, nonce) = sign_state(&state.config.oauth_state_key, now_millis()?)?;

    let auth_url = format!(
        "{}/authorize?\
         client_id={}&\
         redirect_uri={}&\
         response_type=code&\
         approval_prompt=auto&\
         scope={}&\
         state={}",
        state.config.strava_oauth_url,
        state.config.strava_client_id,
        urlencoding::encode(&state.config.oauth_callback_url()),
        STRAVA_SCOPES,
        oauth_state
    );

    tracing::info!(
        client_id = %state.config.strava_client_id,
        "Starting OAuth flow, redirecting to Strava"
    );

    let jar = jar.add(session_cookie(
        OAUTH_NONCE_COOKIE,
        nonce,
        OAUTH_NONCE_MAX_AGE,
        state.config.is_production(),
    ));

    Ok((jar, Redirect::temporary(&auth_url)))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange code for tokens, set session cookies.
///
/// Every failure lands back on the login page with an `error` message.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> (CookieJar, Redirect) {
    // Single use: the nonce cookie goes away whatever the outcome.
    let expected_nonce = jar
        .get(OAUTH_NONCE_COOKIE)
        .map(|cookie| cookie.value().to_string());
    let jar = jar.remove(Cookie::build(OAUTH_NONCE_COOKIE).path("/"));

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Strava");
        return (jar, login_redirect(&error));
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        tracing::warn!("OAuth callback without authorization code");
        return (jar, login_redirect("No authorization code received"));
    };

    let state_ok = params
        .state
        .as_deref()
        .zip(expected_nonce.as_deref())
        .and_then(|(oauth_state, expected)| {
            let nonce =
                verify_state(oauth_state, &state.config.oauth_state_key, now_millis().ok()?)?;
            Some(bool::from(nonce.as_bytes().ct_eq(expected.as_bytes())))
        })
        .unwrap_or(false);
    if !state_ok {
        tracing::warn!(
            has_nonce_cookie = expected_nonce.is_some(),
            "OAuth state invalid, expired or not issued to this browser"
        );
        return (jar, login_redirect("Invalid OAuth state"));
    }

    tracing::info!("Exchanging authorization code for tokens");

    let tokens = match state.strava_service.handle_oauth_callback(&code).await {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::error!(error = %e, "OAuth code exchange failed");
            return (jar, login_redirect("Failed to authenticate with Strava"));
        }
    };

    let secure = state.config.is_production();
    let jar = jar
        .add(session_cookie(
            ACCESS_TOKEN_COOKIE,
            tokens.access_token,
            ACCESS_TOKEN_MAX_AGE,
            secure,
        ))
        .add(session_cookie(
            REFRESH_TOKEN_COOKIE,
            tokens.refresh_token,
            REFRESH_TOKEN_MAX_AGE,
            secure,
        ));

    tracing::info!("OAuth successful, session cookies set");
    (jar, Redirect::to("/"))
}

/// Logout - clear session cookies and go back to the login page.
async fn logout(jar: CookieJar) -> (CookieJar, Redirect) {
    let jar = jar
        .remove(Cookie::build(ACCESS_TOKEN_COOKIE).path("/"))
        .remove(Cookie::build(REFRESH_TOKEN_COOKIE).path("/"));
    (jar, Redirect::to(LOGIN_PAGE))
}

fn session_cookie(
    name: &'static str,
    value: String,
    max_age: time::Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(max_age)
        .build()
}

fn login_redirect(error: &str) -> Redirect {
    Redirect::to(&format!("{}?error={}", LOGIN_PAGE, urlencoding::encode(error)))
}

fn now_millis() -> Result<u128> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis())
}

fn mac_hex(payload: &str, secret: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Build the OAuth `state`: base64url of `"nonce|timestamp_hex|signature_hex"`.
/// Returns the state and its nonce.
fn sign_state(secret: &[u8], now_millis: u128) -> Result<(String, String)> {
    let mut nonce = [0u8; 16];
    SystemRandom::new()
        .fill(&mut nonce)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Failed to generate OAuth nonce")))?;

    let nonce = hex::encode(nonce);
    let payload = format!("{}|{:x}", nonce, now_millis);
    let signature = mac_hex(&payload, secret)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("HMAC init failed")))?;

    Ok((URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature)), nonce))
}

/// Verify signature and age of an OAuth `state`. Returns the nonce.
fn verify_state(state: &str, secret: &[u8], now_millis: u128) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    if parts.len() != 3 {
        return None;
    }
    let (nonce, timestamp_hex, signature_hex) = (parts[0], parts[1], parts[2]);

    let expected = mac_hex(&format!("{}|{}", nonce, timestamp_hex), secret)?;
    if !bool::from(expected.as_bytes().ct_eq(signature_hex.as_bytes())) {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    let issued_at = u128::from_str_radix(timestamp_hex, 16).ok()?;
    if now_millis.saturating_sub(issued_at) > OAUTH_STATE_MAX_AGE_MILLIS {
        tracing::warn!("OAuth state expired");
        return None;
    }

    Some(nonce.to_string())
}
