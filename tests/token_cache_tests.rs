// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access token caching, refresh, and retry-on-401 tests.

use axum::http::StatusCode;
use kudos_dashboard::error::AppError;
use kudos_dashboard::services::token_cache::credential_fingerprint;
use std::sync::atomic::Ordering;
use tower::ServiceExt;

mod common;

#[tokio::test]
async fn test_access_token_is_cached_across_requests() {
    let (app, state, fake) = common::create_test_app().await;
    fake.add_activity(1, "Run", "Run", 5000.0, &["Alice Smith"]);

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(common::get_with_refresh_cookie(
                "/strava/kudoers-dashboard",
                "refresh-a",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(fake.refresh_count(), 1);
    assert_eq!(state.strava_service.token_cache().len(), 1);
}

#[tokio::test]
async fn test_credentials_do_not_share_tokens() {
    let (_app, state, fake) = common::create_test_app().await;

    let a = state.strava_service.session("refresh-a");
    let b = state.strava_service.session("refresh-b");
    let token_a = a.access_token().await.unwrap();
    let token_b = b.access_token().await.unwrap();

    assert_ne!(token_a, token_b);
    assert_eq!(fake.refresh_count(), 2);
    assert_eq!(state.strava_service.token_cache().len(), 2);
}

#[tokio::test]
async fn test_concurrent_requests_refresh_once() {
    let (_app, state, fake) = common::create_test_app().await;

    let sessions: Vec<_> = (0..8)
        .map(|_| state.strava_service.session("refresh-a"))
        .collect();
    let tokens =
        futures_util::future::join_all(sessions.iter().map(|s| s.access_token())).await;

    let first = tokens[0].as_ref().unwrap().clone();
    assert!(tokens.iter().all(|t| t.as_ref().unwrap() == &first));
    assert_eq!(fake.refresh_count(), 1);
}

#[tokio::test]
async fn test_rejected_token_is_refreshed_and_retried() {
    let (app, state, fake) = common::create_test_app().await;
    fake.add_activity(1, "Run", "Run", 5000.0, &["Alice Smith"]);

    let stale = state
        .strava_service
        .session("refresh-a")
        .access_token()
        .await
        .unwrap();
    assert_eq!(fake.refresh_count(), 1);

    // Strava revokes the token before it expires
    fake.reject_token(&stale);

    let response = app
        .oneshot(common::get_with_refresh_cookie(
            "/strava/kudoers-dashboard",
            "refresh-a",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["totalKudoers"], 1);

    assert_eq!(fake.refresh_count(), 2);
    let fresh = state
        .strava_service
        .token_cache()
        .get_fresh(&credential_fingerprint("refresh-a"), chrono::Utc::now())
        .unwrap();
    assert_ne!(fresh, stale);
}

#[tokio::test]
async fn test_invalid_refresh_token_is_not_cached() {
    let (_app, state, fake) = common::create_test_app().await;

    let session = state.strava_service.session(common::BAD_REFRESH_TOKEN);
    let err = session.access_token().await.unwrap_err();

    assert!(matches!(err, AppError::InvalidToken));
    assert!(state.strava_service.token_cache().is_empty());
    assert_eq!(state.strava_service.token_cache().refresh_lock_count(), 0);
    assert_eq!(fake.refresh_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_arbitrary_bearer_credentials_leave_no_state() {
    let (app, state, _fake) = common::create_test_app().await;

    for i in 0..20 {
        let response = app
            .clone()
            .oneshot(
                axum::http::Request::builder()
                    .uri("/strava/athlete")
                    .header(
                        axum::http::header::AUTHORIZATION,
                        format!("Bearer {}-{}", common::BAD_REFRESH_TOKEN, i),
                    )
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let cache = state.strava_service.token_cache();
    assert!(cache.is_empty());
    assert_eq!(cache.refresh_lock_count(), 0);
}

#[tokio::test]
async fn test_successful_refresh_releases_lock() {
    let (_app, state, _fake) = common::create_test_app().await;

    let session = state.strava_service.session("refresh-a");
    session.access_token().await.unwrap();

    let cache = state.strava_service.token_cache();
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.refresh_lock_count(), 0);
}
