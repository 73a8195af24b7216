// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honored for local development.

use std::env;
use std::fmt;
use std::str::FromStr;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_STATIC_DIR: &str = "public";
const DEFAULT_STRAVA_API_URL: &str = "https://www.strava.com/api/v3";
const DEFAULT_STRAVA_OAUTH_URL: &str = "https://www.strava.com/oauth";

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppEnv {
    #[default]
    Development,
    Production,
    Test,
}

impl AppEnv {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppEnv::Development => "development",
            AppEnv::Production => "production",
            AppEnv::Test => "test",
        }
    }
}

impl fmt::Display for AppEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppEnv {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" => Ok(AppEnv::Development),
            "production" => Ok(AppEnv::Production),
            "test" => Ok(AppEnv::Test),
            _ => Err(ConfigError::Invalid("APP_ENV", s.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Strava OAuth client ID (public)
    pub strava_client_id: String,
    /// Strava OAuth client secret
    pub strava_client_secret: String,
    /// Server port
    pub port: u16,
    pub environment: AppEnv,
    /// Externally visible base URL, used for the OAuth redirect and CORS.
    pub public_url: String,
    /// Directory holding the dashboard's static assets.
    pub static_dir: String,
    /// HMAC key for the OAuth `state` parameter (raw bytes)
    pub oauth_state_key: Vec<u8>,
    /// Strava REST API base URL
    pub strava_api_url: String,
    /// Strava OAuth base URL (`/authorize`, `/token` live under it)
    pub strava_oauth_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let port = match env::var("PORT") {
            Ok(raw) => parse_port(&raw)?,
            Err(_) => DEFAULT_PORT,
        };

        let environment = match env::var("APP_ENV") {
            Ok(raw) => raw.parse()?,
            Err(_) => AppEnv::default(),
        };

        let strava_client_secret = env::var("STRAVA_CLIENT_SECRET")
            .map(|v| v.trim().to_string())
            .map_err(|_| ConfigError::Missing("STRAVA_CLIENT_SECRET"))?;
        if strava_client_secret.is_empty() {
            return Err(ConfigError::Missing("STRAVA_CLIENT_SECRET"));
        }

        let oauth_state_key = env::var("OAUTH_STATE_KEY")
            .map(|v| v.trim().as_bytes().to_vec())
            .unwrap_or_else(|_| strava_client_secret.as_bytes().to_vec());

        Ok(Self {
            strava_client_id: env::var("STRAVA_CLIENT_ID")
                .map(|v| v.trim().to_string())
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing("STRAVA_CLIENT_ID"))?,
            strava_client_secret,
            port,
            environment,
            public_url: env::var("PUBLIC_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| format!("http://localhost:{}", port)),
            static_dir: env::var("STATIC_DIR").unwrap_or_else(|_| DEFAULT_STATIC_DIR.to_string()),
            oauth_state_key,
            strava_api_url: env::var("STRAVA_API_URL")
                .unwrap_or_else(|_| DEFAULT_STRAVA_API_URL.to_string()),
            strava_oauth_url: env::var("STRAVA_OAUTH_URL")
                .unwrap_or_else(|_| DEFAULT_STRAVA_OAUTH_URL.to_string()),
        })
    }

    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            strava_client_id: "test_client_id".to_string(),
            strava_client_secret: "test_secret".to_string(),
            port: DEFAULT_PORT,
            environment: AppEnv::Test,
            public_url: "http://localhost:8080".to_string(),
            static_dir: DEFAULT_STATIC_DIR.to_string(),
            oauth_state_key: b"test_oauth_state_key".to_vec(),
            strava_api_url: DEFAULT_STRAVA_API_URL.to_string(),
            strava_oauth_url: DEFAULT_STRAVA_OAUTH_URL.to_string(),
        }
    }

    /// Whether cookies should carry the `Secure` attribute.
    pub fn is_production(&self) -> bool {
        self.environment == AppEnv::Production
    }

    /// OAuth redirect target registered with Strava.
    pub fn oauth_callback_url(&self) -> String {
        format!("{}/auth/strava/callback", self.public_url)
    }
}

fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    match raw.trim().parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ConfigError::Invalid("PORT", raw.to_string())),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
