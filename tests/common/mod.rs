// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared test helpers: an in-process fake Strava and app builders.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use kudos_dashboard::config::Config;
use kudos_dashboard::routes::create_router;
use kudos_dashboard::AppState;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// The fake Strava rejects every refresh token starting with this.
#[allow(dead_code)]
pub const BAD_REFRESH_TOKEN: &str = "bad-refresh";
/// Authorization code the fake Strava accepts.
#[allow(dead_code)]
pub const GOOD_CODE: &str = "good-code";

/// Scriptable stand-in for the Strava API.
#[derive(Default)]
pub struct FakeStrava {
    pub activities: Mutex<Vec<Value>>,
    pub kudoers: Mutex<HashMap<u64, Vec<Value>>>,
    pub failing_kudos: Mutex<HashSet<u64>>,
    pub fail_activity_list: AtomicBool,
    pub rate_limit_activity_list: AtomicBool,
    pub rejected_tokens: Mutex<HashSet<String>>,
    pub refresh_calls: AtomicUsize,
    pub exchange_calls: AtomicUsize,
    pub kudos_calls: AtomicUsize,
}

#[allow(dead_code)]
impl FakeStrava {
    pub fn add_activity(&self, id: u64, name: &str, kind: &str, meters: f64, kudoers: &[&str]) {
        self.activities.lock().unwrap().push(json!({
            "id": id,
            "name": name,
            "type": kind,
            "sport_type": kind,
            "distance": meters,
            "moving_time": 1800,
            "start_date": "2024-01-15T10:00:00Z",
            "kudos_count": kudoers.len(),
        }));
        let people = kudoers
            .iter()
            .map(|&name| {
                let (first, last) = name.split_once(' ').unwrap_or((name, ""));
                json!({ "firstname": first, "lastname": last, "resource_state": 2 })
            })
            .collect();
        self.kudoers.lock().unwrap().insert(id, people);
    }

    pub fn fail_kudos_for(&self, activity_id: u64) {
        self.failing_kudos.lock().unwrap().insert(activity_id);
    }

    pub fn reject_token(&self, access_token: &str) {
        self.rejected_tokens
            .lock()
            .unwrap()
            .insert(access_token.to_string());
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "));
        match token {
            Some(t) => t.starts_with("access-") && !self.rejected_tokens.lock().unwrap().contains(t),
            None => false,
        }
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Authorization Error" })),
    )
        .into_response()
}

fn token_body(fake: &FakeStrava, refresh_token: &str) -> Value {
    let n = fake.refresh_calls.load(Ordering::SeqCst) + fake.exchange_calls.load(Ordering::SeqCst);
    json!({
        "token_type": "Bearer",
        "access_token": format!("access-{}", n),
        "refresh_token": refresh_token,
        "expires_at": chrono::Utc::now().timestamp() + 6 * 3600,
        "expires_in": 6 * 3600,
    })
}

async fn oauth_token(
    State(fake): State<Arc<FakeStrava>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    match form.get("grant_type").map(String::as_str) {
        Some("refresh_token") => {
            let refresh = form.get("refresh_token").cloned().unwrap_or_default();
            if refresh.starts_with(BAD_REFRESH_TOKEN) {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "message": "Bad Request", "errors": [{ "code": "invalid" }] })),
                )
                    .into_response();
            }
            fake.refresh_calls.fetch_add(1, Ordering::SeqCst);
            Json(token_body(&fake, &refresh)).into_response()
        }
        Some("authorization_code") => {
            if form.get("code").map(String::as_str) != Some(GOOD_CODE) {
                return StatusCode::BAD_REQUEST.into_response();
            }
            fake.exchange_calls.fetch_add(1, Ordering::SeqCst);
            let mut body = token_body(&fake, "refresh-from-code");
            body["athlete"] = json!({ "id": 42, "firstname": "Test", "lastname": "Athlete" });
            Json(body).into_response()
        }
        _ => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn list_activities(
    State(fake): State<Arc<FakeStrava>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !fake.authorized(&headers) {
        return unauthorized();
    }
    if fake.fail_activity_list.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    if fake.rate_limit_activity_list.load(Ordering::SeqCst) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "message": "Rate Limit Exceeded" })),
        )
            .into_response();
    }
    let per_page: usize = params
        .get("per_page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(30);
    let activities: Vec<Value> = fake
        .activities
        .lock()
        .unwrap()
        .iter()
        .take(per_page)
        .cloned()
        .collect();
    Json(activities).into_response()
}

async fn activity_kudos(
    State(fake): State<Arc<FakeStrava>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response {
    if !fake.authorized(&headers) {
        return unauthorized();
    }
    fake.kudos_calls.fetch_add(1, Ordering::SeqCst);
    if fake.failing_kudos.lock().unwrap().contains(&id) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let kudoers = fake.kudoers.lock().unwrap().get(&id).cloned();
    match kudoers {
        Some(k) => Json(k).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn get_activity(
    State(fake): State<Arc<FakeStrava>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response {
    if !fake.authorized(&headers) {
        return unauthorized();
    }
    let found = fake
        .activities
        .lock()
        .unwrap()
        .iter()
        .find(|a| a["id"] == id)
        .cloned();
    match found {
        Some(a) => Json(a).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Record Not Found" })),
        )
            .into_response(),
    }
}

async fn get_athlete(State(fake): State<Arc<FakeStrava>>, headers: HeaderMap) -> Response {
    if !fake.authorized(&headers) {
        return unauthorized();
    }
    Json(json!({ "id": 42, "firstname": "Test", "lastname": "Athlete", "profile": null }))
        .into_response()
}

/// Start the fake Strava on an ephemeral port. Returns it and its base URL.
#[allow(dead_code)]
pub async fn spawn_fake_strava() -> (Arc<FakeStrava>, String) {
    let fake = Arc::new(FakeStrava::default());

    let app = Router::new()
        .route("/oauth/token", post(oauth_token))
        .route("/api/v3/athlete", get(get_athlete))
        .route("/api/v3/athlete/activities", get(list_activities))
        .route("/api/v3/activities/{id}", get(get_activity))
        .route("/api/v3/activities/{id}/kudos", get(activity_kudos))
        .with_state(fake.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fake Strava");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (fake, format!("http://{}", addr))
}

/// Test config pointing at `strava_base`.
#[allow(dead_code)]
pub fn test_config(strava_base: &str) -> Config {
    Config {
        strava_api_url: format!("{}/api/v3", strava_base),
        strava_oauth_url: format!("{}/oauth", strava_base),
        ..Config::test_default()
    }
}

/// Create a test app talking to a fresh fake Strava.
#[allow(dead_code)]
pub async fn create_test_app() -> (axum::Router, Arc<AppState>, Arc<FakeStrava>) {
    let (fake, base) = spawn_fake_strava().await;
    let state = Arc::new(AppState::new(test_config(&base)));
    (create_router(state.clone()), state, fake)
}

/// Create a test app with a custom config (no fake Strava).
#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> axum::Router {
    create_router(Arc::new(AppState::new(config)))
}

#[allow(dead_code)]
pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[allow(dead_code)]
pub fn get_with_refresh_cookie(uri: &str, refresh_token: &str) -> axum::http::Request<Body> {
    axum::http::Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::COOKIE, format!("strava_refresh_token={}", refresh_token))
        .body(Body::empty())
        .unwrap()
}
