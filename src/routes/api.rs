// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for signed-in athletes.

use crate::error::{AppError, Result};
use crate::middleware::auth::StravaCredential;
use crate::models::{Activity, Athlete, DashboardSummary, Kudoer};
use crate::services::aggregator::{
    aggregate, AggregationWindows, DEFAULT_RECENT_WINDOW, DEFAULT_TOTAL_WINDOW,
};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

/// API routes (require a Strava credential).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/strava/kudoers-dashboard", get(get_dashboard))
        .route("/strava/athlete", get(get_athlete))
        .route("/strava/following", get(get_following))
        .route("/strava/activities/{id}", get(get_activity))
        .route("/strava/activities/{id}/kudos", get(get_activity_kudos))
}

// ─── Dashboard ───────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
struct DashboardQuery {
    /// Newest activities that decide who is ranked
    #[serde(default = "default_recent_window")]
    #[validate(range(min = 1, max = 50))]
    recent_window: usize,
    /// Activities fetched and counted
    #[serde(default = "default_total_window")]
    #[validate(range(min = 1, max = 100))]
    total_window: usize,
}

fn default_recent_window() -> usize {
    DEFAULT_RECENT_WINDOW
}
fn default_total_window() -> usize {
    DEFAULT_TOTAL_WINDOW
}

impl DashboardQuery {
    fn windows(&self) -> Result<AggregationWindows> {
        self.validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        if self.recent_window > self.total_window {
            return Err(AppError::BadRequest(
                "recent_window must not exceed total_window".to_string(),
            ));
        }

        Ok(AggregationWindows {
            recent: self.recent_window,
            total: self.total_window,
        })
    }
}

/// Recent activities with their kudoers, plus the kudoer ranking.
async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(credential): Extension<StravaCredential>,
    Query(params): Query<DashboardQuery>,
) -> Result<Json<DashboardSummary>> {
    let windows = params.windows()?;
    tracing::debug!(
        recent_window = windows.recent,
        total_window = windows.total,
        "Dashboard request"
    );

    let session = state.strava_service.session(credential.refresh_token);
    let activities = session.fetch_dashboard_activities(windows.total).await?;

    let summary = aggregate(activities, windows);

    tracing::info!(
        activities = summary.activities.len(),
        total_kudoers = summary.total_kudoers,
        unique_people = summary.unique_people,
        ranked = summary.patterns.len(),
        "Dashboard aggregated"
    );

    Ok(Json(summary))
}

// ─── Pass-through ────────────────────────────────────────────

async fn get_athlete(
    State(state): State<Arc<AppState>>,
    Extension(credential): Extension<StravaCredential>,
) -> Result<Json<Athlete>> {
    let session = state.strava_service.session(credential.refresh_token);
    Ok(Json(session.athlete().await?))
}

async fn get_following(
    State(state): State<Arc<AppState>>,
    Extension(credential): Extension<StravaCredential>,
) -> Json<Vec<Athlete>> {
    let session = state.strava_service.session(credential.refresh_token);
    Json(session.followed_athletes().await)
}

async fn get_activity(
    State(state): State<Arc<AppState>>,
    Extension(credential): Extension<StravaCredential>,
    Path(id): Path<u64>,
) -> Result<Json<Activity>> {
    let session = state.strava_service.session(credential.refresh_token);
    Ok(Json(session.activity(id).await?))
}

async fn get_activity_kudos(
    State(state): State<Arc<AppState>>,
    Extension(credential): Extension<StravaCredential>,
    Path(id): Path<u64>,
) -> Result<Json<Vec<Kudoer>>> {
    let session = state.strava_service.session(credential.refresh_token);
    Ok(Json(session.activity_kudoers(id).await?))
}
