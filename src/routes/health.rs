// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Health check routes.

use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/detailed", get(health_detailed))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "public/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub uptime_seconds: u64,
    pub environment: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "public/generated/")
)]
pub struct DetailedHealthResponse {
    #[serde(flatten)]
    pub health: HealthResponse,
    pub version: String,
    pub build_id: String,
}

fn health(state: &AppState) -> HealthResponse {
    HealthResponse {
        status: "ok".to_string(),
        timestamp: format_utc_rfc3339(chrono::Utc::now()),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        environment: state.config.environment.to_string(),
    }
}

/// Health check response
async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(health(&state))
}

async fn health_detailed(State(state): State<Arc<AppState>>) -> Json<DetailedHealthResponse> {
    Json(DetailedHealthResponse {
        health: health(&state),
        version: env!("CARGO_PKG_VERSION").to_string(),
        build_id: option_env!("BUILD_ID").unwrap_or("unknown").to_string(),
    })
}
