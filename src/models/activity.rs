// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava activity and kudoer models as fetched for the dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Summary activity as returned by `GET /athlete/activities`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "public/generated/")
)]
pub struct Activity {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: u64,
    pub name: String,
    /// Activity category (Run, Ride, Hike, ...). Open set.
    #[serde(rename = "type")]
    pub activity_type: String,
    /// Distance in meters
    #[serde(default)]
    pub distance: f64,
    /// Moving time in seconds
    #[serde(default)]
    pub moving_time: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub start_date: DateTime<Utc>,
}

impl Activity {
    pub fn distance_km(&self) -> f64 {
        self.distance / 1000.0
    }
}

/// A person who gave kudos on an activity.
///
/// The kudos endpoint only returns display names for most athletes; the
/// numeric id is carried when Strava provides one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "public/generated/")
)]
pub struct Kudoer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "binding-generation", ts(type = "number | null"))]
    pub id: Option<u64>,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
}

impl Kudoer {
    /// Display name, `"{firstname} {lastname}"`.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
    }

    /// Aggregation identity for this kudoer.
    pub fn key(&self) -> KudoerKey {
        match self.id {
            Some(id) => KudoerKey::Athlete(id),
            None => KudoerKey::Name(self.display_name()),
        }
    }
}

/// Identity used to merge kudos from the same person.
///
/// Two people with the same display name stay distinct whenever Strava
/// gives us their athlete ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KudoerKey {
    Athlete(u64),
    Name(String),
}

/// An activity joined with the kudoers fetched for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "public/generated/")
)]
pub struct ActivityWithKudoers {
    #[serde(flatten)]
    pub activity: Activity,
    #[serde(default)]
    pub kudoers: Vec<Kudoer>,
}

impl ActivityWithKudoers {
    pub fn new(activity: Activity, kudoers: Vec<Kudoer>) -> Self {
        Self { activity, kudoers }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_strava_summary_activity() {
        let json = r#"{
            "id": 16906743520,
            "name": "Morning Run",
            "type": "Run",
            "sport_type": "TrailRun",
            "distance": 10234.5,
            "moving_time": 3120,
            "start_date": "2024-01-15T10:00:00Z",
            "kudos_count": 4
        }"#;

        let activity: Activity = serde_json::from_str(json).unwrap();
        assert_eq!(activity.id, 16906743520);
        assert_eq!(activity.activity_type, "Run");
        assert_eq!(activity.moving_time, 3120);
        assert!((activity.distance_km() - 10.2345).abs() < 1e-9);
    }

    #[test]
    fn test_kudoer_tolerates_missing_names() {
        let kudoer: Kudoer = serde_json::from_str(r#"{"firstname": "Ada"}"#).unwrap();
        assert_eq!(kudoer.lastname, "");
        assert_eq!(kudoer.display_name(), "Ada ");
        assert_eq!(kudoer.key(), KudoerKey::Name("Ada ".to_string()));
    }

    #[test]
    fn test_kudoer_key_prefers_athlete_id() {
        let a = Kudoer {
            id: Some(1),
            firstname: "Sam".to_string(),
            lastname: "Lee".to_string(),
        };
        let b = Kudoer {
            id: Some(2),
            ..a.clone()
        };
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn test_activity_with_kudoers_wire_shape() {
        let joined = ActivityWithKudoers::new(
            Activity {
                id: 7,
                name: "Lunch Ride".to_string(),
                activity_type: "Ride".to_string(),
                distance: 25000.0,
                moving_time: 3600,
                start_date: "2024-01-15T10:00:00Z".parse().unwrap(),
            },
            vec![Kudoer {
                id: None,
                firstname: "Ada".to_string(),
                lastname: "Lovelace".to_string(),
            }],
        );

        let value = serde_json::to_value(&joined).unwrap();
        assert_eq!(value["type"], "Ride");
        assert_eq!(value["distance"], 25000.0);
        assert_eq!(value["start_date"], "2024-01-15T10:00:00Z");
        assert_eq!(value["kudoers"][0]["firstname"], "Ada");
        assert!(value["kudoers"][0].get("id").is_none());
    }
}
