// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client for the kudos dashboard.
//!
//! Handles:
//! - OAuth code exchange and token refresh
//! - Activity and kudoer fetching
//! - Access token caching per credential
//! - One retry with a fresh token when Strava rejects an access token

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use futures_util::{stream, StreamExt};
use serde::Deserialize;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{Activity, ActivityWithKudoers, Athlete, Kudoer, TokenResponse};
use crate::services::token_cache::{credential_fingerprint, CachedToken, TokenCache};
use crate::time_utils::{format_utc_rfc3339, from_unix_seconds};

/// Kudoer lookups in flight at once while building the dashboard.
const KUDOER_FETCH_CONCURRENCY: usize = 4;

/// Strava caps `per_page` on list endpoints.
const MAX_PER_PAGE: usize = 200;

/// Strava API client.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    api_url: String,
    oauth_url: String,
    client_id: String,
    client_secret: String,
}

impl StravaClient {
    /// Create a new Strava client with OAuth credentials.
    pub fn new(
        client_id: String,
        client_secret: String,
        api_url: String,
        oauth_url: String,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            oauth_url: oauth_url.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
        }
    }

    /// List the authenticated athlete's newest activities.
    pub async fn list_activities(
        &self,
        access_token: &str,
        per_page: usize,
    ) -> Result<Vec<Activity>, AppError> {
        let url = format!("{}/athlete/activities", self.api_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[("per_page", per_page.min(MAX_PER_PAGE).to_string())])
            .send()
            .await
            .map_err(|e| AppError::StravaApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Get an activity by ID.
    pub async fn get_activity(
        &self,
        access_token: &str,
        activity_id: u64,
    ) -> Result<Activity, AppError> {
        let url = format!("{}/activities/{}", self.api_url, activity_id);
        self.get_json(&url, access_token).await
    }

    /// List the athletes who gave kudos on an activity.
    pub async fn get_activity_kudoers(
        &self,
        access_token: &str,
        activity_id: u64,
    ) -> Result<Vec<Kudoer>, AppError> {
        let url = format!("{}/activities/{}/kudos", self.api_url, activity_id);
        self.get_json(&url, access_token).await
    }

    /// Get authenticated athlete profile.
    pub async fn get_athlete(&self, access_token: &str) -> Result<Athlete, AppError> {
        let url = format!("{}/athlete", self.api_url);
        self.get_json(&url, access_token).await
    }

    /// List athletes the authenticated athlete follows.
    pub async fn list_followed_athletes(
        &self,
        access_token: &str,
    ) -> Result<Vec<Athlete>, AppError> {
        let url = format!("{}/athletes/following", self.api_url);
        self.get_json(&url, access_token).await
    }

    /// Refresh an expired access token.
    ///
    /// A 400/401 from Strava means the refresh token itself is no good.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, AppError> {
        let response = self
            .http
            .post(format!("{}/token", self.oauth_url))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| AppError::StravaApi(format!("Token refresh request failed: {}", e)))?;

        self.check_token_response(response, "Token refresh").await
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AppError> {
        let response = self
            .http
            .post(format!("{}/token", self.oauth_url))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::StravaApi(format!("Token exchange failed: {}", e)))?;

        self.check_token_response(response, "Token exchange").await
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<T, AppError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::StravaApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    async fn check_token_response(
        &self,
        response: reqwest::Response,
        operation: &str,
    ) -> Result<TokenResponse, AppError> {
        let status = response.status();
        if status.as_u16() == 400 || status.as_u16() == 401 {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "{} rejected by Strava", operation);
            return Err(AppError::InvalidToken);
        }

        self.check_response_json(response).await
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                tracing::warn!("Strava rate limit hit (429)");
                return Err(AppError::StravaApi(AppError::STRAVA_RATE_LIMIT.to_string()));
            }

            if status.as_u16() == 401 {
                return Err(AppError::StravaApi(
                    AppError::STRAVA_TOKEN_ERROR.to_string(),
                ));
            }

            if status.as_u16() == 404 {
                return Err(AppError::NotFound(format!("Strava: {}", body)));
            }

            return Err(AppError::StravaApi(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::StravaApi(format!("JSON parse error: {}", e)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// StravaService - token lifecycle on top of the raw client
// ─────────────────────────────────────────────────────────────────────────────

/// High-level Strava service shared by all requests.
///
/// Owns the client and the token cache. Handlers open a [`StravaSession`]
/// per request for the caller's credential.
#[derive(Clone)]
pub struct StravaService {
    client: StravaClient,
    token_cache: Arc<TokenCache>,
}

impl StravaService {
    pub fn new(client: StravaClient, token_cache: Arc<TokenCache>) -> Self {
        Self {
            client,
            token_cache,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            StravaClient::new(
                config.strava_client_id.clone(),
                config.strava_client_secret.clone(),
                config.strava_api_url.clone(),
                config.strava_oauth_url.clone(),
            ),
            Arc::new(TokenCache::new()),
        )
    }

    pub fn token_cache(&self) -> &TokenCache {
        &self.token_cache
    }

    /// Open a session for one request's refresh token.
    pub fn session(&self, refresh_token: impl Into<String>) -> StravaSession<'_> {
        let refresh_token = refresh_token.into();
        StravaSession {
            fingerprint: credential_fingerprint(&refresh_token),
            refresh_token,
            service: self,
        }
    }

    /// Handle OAuth callback: exchange code and seed the token cache.
    pub async fn handle_oauth_callback(&self, code: &str) -> Result<TokenResponse, AppError> {
        let tokens = self.client.exchange_code(code).await?;

        if let Some(expires_at) = from_unix_seconds(tokens.expires_at) {
            self.token_cache.insert(
                &credential_fingerprint(&tokens.refresh_token),
                CachedToken::new(tokens.access_token.clone(), expires_at),
            );
        }

        tracing::info!(
            athlete_id = tokens.athlete.as_ref().map(|a| a.id),
            "OAuth code exchanged, access token cached"
        );

        Ok(tokens)
    }
}

/// Strava access on behalf of one credential, scoped to a request.
pub struct StravaSession<'a> {
    service: &'a StravaService,
    refresh_token: String,
    fingerprint: String,
}

impl StravaSession<'_> {
    /// Get a valid (non-expired) access token for this credential.
    ///
    /// Cache hit is the fast path. Otherwise the per-credential lock is
    /// taken, the cache re-checked, and only then is Strava asked for a new
    /// token.
    pub async fn access_token(&self) -> Result<String, AppError> {
        let cache = &self.service.token_cache;

        if let Some(token) = cache.get_fresh(&self.fingerprint, Utc::now()) {
            return Ok(token);
        }

        let lock = cache.refresh_lock(&self.fingerprint);
        let result = {
            let _guard = lock.lock().await;
            self.refresh_access_token().await
        };
        drop(lock);
        cache.release_refresh_lock(&self.fingerprint);

        result
    }

    /// Refresh and cache the access token. Caller holds the refresh lock.
    async fn refresh_access_token(&self) -> Result<String, AppError> {
        let cache = &self.service.token_cache;

        // Another request may have refreshed while we were waiting.
        if let Some(token) = cache.get_fresh(&self.fingerprint, Utc::now()) {
            return Ok(token);
        }

        tracing::info!(
            credential = self.credential_id(),
            "Access token missing or expiring, refreshing"
        );

        let tokens = self.service.client.refresh_token(&self.refresh_token).await?;
        let expires_at = from_unix_seconds(tokens.expires_at).ok_or_else(|| {
            AppError::StravaApi(format!("Invalid token expiry: {}", tokens.expires_at))
        })?;

        cache.insert(
            &self.fingerprint,
            CachedToken::new(tokens.access_token.clone(), expires_at),
        );

        tracing::info!(
            credential = self.credential_id(),
            expires_at = %format_utc_rfc3339(expires_at),
            "Token refreshed and cached"
        );
        Ok(tokens.access_token)
    }

    /// Run `call` with an access token, retrying once with a fresh token if
    /// Strava rejects the cached one.
    async fn with_token<T, F, Fut>(&self, call: F) -> Result<T, AppError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let token = self.access_token().await?;
        match call(token).await {
            Err(e) if e.is_strava_token_error() => {
                tracing::info!(
                    credential = self.credential_id(),
                    "Strava rejected cached token, refreshing and retrying"
                );
                self.service.token_cache.invalidate(&self.fingerprint);
                let token = self.access_token().await?;
                call(token).await
            }
            other => other,
        }
    }

    pub async fn athlete(&self) -> Result<Athlete, AppError> {
        let client = &self.service.client;
        self.with_token(move |token| async move { client.get_athlete(&token).await })
            .await
    }

    /// Followed athletes; an upstream failure yields an empty list.
    pub async fn followed_athletes(&self) -> Vec<Athlete> {
        let client = &self.service.client;
        match self
            .with_token(move |token| async move { client.list_followed_athletes(&token).await })
            .await
        {
            Ok(athletes) => athletes,
            Err(e) => {
                tracing::warn!(error = %e, "Could not fetch followed athletes, returning none");
                Vec::new()
            }
        }
    }

    pub async fn activity(&self, activity_id: u64) -> Result<Activity, AppError> {
        let client = &self.service.client;
        self.with_token(move |token| async move { client.get_activity(&token, activity_id).await })
            .await
    }

    pub async fn activity_kudoers(&self, activity_id: u64) -> Result<Vec<Kudoer>, AppError> {
        let client = &self.service.client;
        self.with_token(move |token| async move {
            client.get_activity_kudoers(&token, activity_id).await
        })
        .await
    }

    /// Newest activities first, at most `limit`.
    pub async fn recent_activities(&self, limit: usize) -> Result<Vec<Activity>, AppError> {
        let client = &self.service.client;
        let mut activities = self
            .with_token(move |token| async move { client.list_activities(&token, limit).await })
            .await?;
        activities.truncate(limit);
        Ok(activities)
    }

    /// Fetch the newest `total_window` activities joined with their kudoers.
    ///
    /// Failing to list activities fails the whole call. A failed kudoer
    /// lookup only empties that activity's kudoer list. Output keeps the
    /// newest-first order of the activity list regardless of which kudoer
    /// lookup finishes first.
    pub async fn fetch_dashboard_activities(
        &self,
        total_window: usize,
    ) -> Result<Vec<ActivityWithKudoers>, AppError> {
        let activities = self.recent_activities(total_window).await?;
        tracing::info!(count = activities.len(), "Fetched activities for dashboard");

        let joined = stream::iter(activities)
            .map(move |activity| self.join_kudoers(activity))
            .buffered(KUDOER_FETCH_CONCURRENCY)
            .collect::<Vec<_>>()
            .await;

        Ok(joined)
    }

    async fn join_kudoers(&self, activity: Activity) -> ActivityWithKudoers {
        match self.activity_kudoers(activity.id).await {
            Ok(kudoers) => {
                tracing::debug!(
                    activity_id = activity.id,
                    count = kudoers.len(),
                    "Fetched kudoers"
                );
                ActivityWithKudoers::new(activity, kudoers)
            }
            Err(e) => {
                tracing::warn!(
                    activity_id = activity.id,
                    error = %e,
                    "Failed to fetch kudoers, continuing without them"
                );
                ActivityWithKudoers::new(activity, Vec::new())
            }
        }
    }

    /// Short, log-safe identifier for this credential.
    fn credential_id(&self) -> &str {
        &self.fingerprint[..8]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Service whose Strava endpoints refuse connections.
    fn unreachable_service() -> StravaService {
        StravaService::new(
            StravaClient::new(
                "client".to_string(),
                "secret".to_string(),
                "http://127.0.0.1:9/api/v3".to_string(),
                "http://127.0.0.1:9/oauth".to_string(),
            ),
            Arc::new(TokenCache::new()),
        )
    }

    #[tokio::test]
    async fn test_failed_refresh_leaves_no_refresh_lock() {
        let service = unreachable_service();

        for i in 0..50 {
            let session = service.session(format!("bogus-{}", i));
            assert!(session.access_token().await.is_err());
        }

        assert_eq!(service.token_cache().refresh_lock_count(), 0);
        assert!(service.token_cache().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_failed_refreshes_release_lock() {
        let service = unreachable_service();
        let sessions: Vec<_> = (0..8).map(|_| service.session("bogus")).collect();

        let results =
            futures_util::future::join_all(sessions.iter().map(|s| s.access_token())).await;

        assert!(results.iter().all(|r| r.is_err()));
        assert_eq!(service.token_cache().refresh_lock_count(), 0);
    }

    #[test]
    fn test_credential_id_is_fingerprint_prefix() {
        let service = unreachable_service();
        let session = service.session("refresh-a");
        assert_eq!(session.credential_id(), &credential_fingerprint("refresh-a")[..8]);
    }
}
