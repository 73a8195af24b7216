// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Strava API error: {0}")]
    StravaApi(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Message carried by `StravaApi` when Strava rejects an access token.
    pub const STRAVA_TOKEN_ERROR: &'static str = "Strava access token rejected (401)";
    /// Message carried by `StravaApi` when Strava rate limits us.
    pub const STRAVA_RATE_LIMIT: &'static str = "Strava rate limit exceeded (429)";

    /// True if Strava rejected the access token and a fresh one may succeed.
    pub fn is_strava_token_error(&self) -> bool {
        matches!(self, AppError::StravaApi(msg) if msg == Self::STRAVA_TOKEN_ERROR)
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AppError::StravaApi(msg) if msg == Self::STRAVA_RATE_LIMIT)
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::StravaApi(_) if self.is_rate_limited() => {
                tracing::warn!("Strava rate limit reached");
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    "rate_limited",
                    Some(Self::STRAVA_RATE_LIMIT.to_string()),
                )
            }
            AppError::StravaApi(msg) => {
                tracing::warn!(error = %msg, "Strava API error");
                (StatusCode::BAD_GATEWAY, "strava_error", Some(msg.clone()))
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
