// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Kudos Dashboard: who keeps cheering for your Strava activities
//!
//! This crate provides the backend for a small personal dashboard. It signs
//! the athlete in with Strava OAuth, fetches their recent activities and the
//! kudos on each, and aggregates who gave kudos most often and what kind of
//! activities those people seem to like.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use services::StravaService;
use std::time::Instant;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub strava_service: StravaService,
    /// Process start, for the health endpoint's uptime.
    pub started_at: Instant,
}

impl AppState {
    /// Build state with a fresh token cache.
    pub fn new(config: Config) -> Self {
        let strava_service = StravaService::from_config(&config);
        Self {
            config,
            strava_service,
            started_at: Instant::now(),
        }
    }
}
