// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Dashboard summary returned by `GET /strava/kudoers-dashboard`.
//!
//! Activity fields keep Strava's snake_case names and meters; pattern
//! fields are camelCase and in kilometers. The renderer depends on both.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::ActivityWithKudoers;

/// Occurrences of one activity type in a kudoer's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "public/generated/")
)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub activity_type: String,
    pub count: u32,
}

impl fmt::Display for TypeCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.activity_type, self.count)
    }
}

/// Behavioral fingerprint of one kudoer over the analysis window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "public/generated/")
)]
pub struct KudoerPattern {
    /// 1-based position in the ranking
    pub rank: u32,
    pub name: String,
    /// Number of kudos given across the whole window
    pub count: u32,
    /// Names of the activities they gave kudos on, newest first
    pub activities: Vec<String>,
    /// Activity type -> occurrences, in first-seen order
    #[serde(serialize_with = "serialize_type_counts")]
    #[cfg_attr(feature = "binding-generation", ts(type = "Record<string, number>"))]
    pub types: Vec<TypeCount>,
    /// Per-kudos activity distance in kilometers
    pub distances: Vec<f64>,
    pub min_distance: f64,
    pub max_distance: f64,
    pub avg_distance: f64,
    /// Up to three most frequent types, most frequent first
    pub top_types: Vec<TypeCount>,
    /// Satisfied distance thresholds, ascending (e.g. `"≥10km"`)
    pub distance_preferences: Vec<String>,
}

/// Output of the kudoer aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "public/generated/")
)]
pub struct DashboardSummary {
    /// Kudos across every fetched activity
    pub total_kudoers: u32,
    /// Distinct people across every fetched activity
    pub unique_people: u32,
    pub recent_window: u32,
    pub total_window: u32,
    pub activities: Vec<ActivityWithKudoers>,
    pub patterns: Vec<KudoerPattern>,
}

/// Emit the type counts as a JSON object without losing insertion order.
fn serialize_type_counts<S>(counts: &[TypeCount], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(counts.len()))?;
    for entry in counts {
        map.serialize_entry(&entry.activity_type, &entry.count)?;
    }
    map.end()
}
