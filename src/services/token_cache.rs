// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory access token cache, keyed per credential.
//!
//! Entries are keyed by a SHA-256 fingerprint of the refresh token, so
//! concurrent requests from different athletes never share or overwrite
//! each other's access tokens and the raw refresh token is never a map key.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Margin before token expiration when we proactively refresh (5 minutes).
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Cached access token with expiry information.
#[derive(Debug, Clone)]
pub struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    pub fn new(access_token: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token,
            expires_at,
        }
    }

    /// Still usable at `now`, with the refresh margin applied.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) < self.expires_at
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Stable, non-reversible cache key for a refresh token.
pub fn credential_fingerprint(refresh_token: &str) -> String {
    hex::encode(Sha256::digest(refresh_token.as_bytes()))
}

/// Access tokens plus per-credential refresh locks.
///
/// Stale tokens are dropped on lookup and expired ones on insert. A refresh
/// lock lives only while some refresh holds or waits on it.
#[derive(Default)]
pub struct TokenCache {
    tokens: DashMap<String, CachedToken>,
    refresh_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached access token for `fingerprint`, if it has not expired.
    ///
    /// A stale entry is removed; the caller is about to refresh it anyway.
    pub fn get_fresh(&self, fingerprint: &str, now: DateTime<Utc>) -> Option<String> {
        let fresh = self
            .tokens
            .get(fingerprint)
            .filter(|cached| cached.is_fresh(now))
            .map(|cached| cached.access_token.clone());

        if fresh.is_none() {
            self.tokens
                .remove_if(fingerprint, |_, cached| !cached.is_fresh(now));
        }
        fresh
    }

    /// Cache `token`, pruning every entry that has already expired.
    pub fn insert(&self, fingerprint: &str, token: CachedToken) {
        let now = Utc::now();
        self.tokens.retain(|_, cached| !cached.is_expired(now));
        self.tokens.insert(fingerprint.to_string(), token);
    }

    /// Drop the cached access token, e.g. after Strava rejected it.
    pub fn invalidate(&self, fingerprint: &str) {
        self.tokens.remove(fingerprint);
    }

    /// Mutex that serializes refreshes for one credential.
    ///
    /// Pair with [`TokenCache::release_refresh_lock`] once the returned
    /// handle is dropped.
    pub fn refresh_lock(&self, fingerprint: &str) -> Arc<Mutex<()>> {
        self.refresh_locks
            .entry(fingerprint.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Forget the refresh lock for `fingerprint` if no one else holds it.
    ///
    /// Runs under the shard lock that `refresh_lock` also takes, so a
    /// waiter can never end up on a mutex that was already removed.
    pub fn release_refresh_lock(&self, fingerprint: &str) {
        self.refresh_locks
            .remove_if(fingerprint, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Refresh locks currently tracked.
    pub fn refresh_lock_count(&self) -> usize {
        self.refresh_locks.len()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
