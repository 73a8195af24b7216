//! Athlete profile and OAuth token models.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Athlete profile as returned by Strava.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "public/generated/")
)]
pub struct Athlete {
    /// Strava athlete ID
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: u64,
    /// First name
    #[serde(default)]
    pub firstname: String,
    /// Last name
    #[serde(default)]
    pub lastname: String,
    /// Profile picture URL
    #[serde(default)]
    pub profile: Option<String>,
}

/// Token response from `POST /oauth/token` (both grant types).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token expiry (Unix timestamp)
    pub expires_at: i64,
    /// Only present on the authorization-code exchange.
    #[serde(default)]
    pub athlete: Option<Athlete>,
}
