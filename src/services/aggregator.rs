// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Kudoer pattern aggregation.
//!
//! Two windows drive the ranking: the newest `recent` activities decide who
//! is eligible, and every fetched activity counts toward an eligible
//! person's score. Ties keep first-appearance order, so the sort must be
//! stable.
//!
//! Distance preferences are a display heuristic: a threshold is reported
//! when at least 80% of someone's kudos landed on activities at least that
//! long. There is no minimum sample size, so a single kudos satisfies every
//! threshold below its distance.

use std::collections::{HashMap, HashSet};

use crate::models::{
    Activity, ActivityWithKudoers, DashboardSummary, KudoerKey, KudoerPattern, TypeCount,
};

pub const DEFAULT_RECENT_WINDOW: usize = 5;
pub const DEFAULT_TOTAL_WINDOW: usize = 10;

/// Ranking is cut off after this many kudoers.
pub const MAX_RANKED_KUDOERS: usize = 10;

pub const DISTANCE_THRESHOLDS_KM: [u32; 5] = [1, 5, 10, 20, 50];

/// Share of distances that must reach a threshold for it to count.
pub const DISTANCE_PREFERENCE_RATIO: f64 = 0.80;

pub const TOP_TYPE_LIMIT: usize = 3;

/// Recency and history windows, in activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationWindows {
    /// Newest-first prefix that decides ranking eligibility.
    pub recent: usize,
    /// Number of activities requested from Strava.
    pub total: usize,
}

impl Default for AggregationWindows {
    fn default() -> Self {
        Self {
            recent: DEFAULT_RECENT_WINDOW,
            total: DEFAULT_TOTAL_WINDOW,
        }
    }
}

/// Aggregate newest-first activities into the dashboard summary.
///
/// Never fails: empty input and activities without kudoers simply
/// contribute nothing.
pub fn aggregate(
    activities: Vec<ActivityWithKudoers>,
    windows: AggregationWindows,
) -> DashboardSummary {
    let total_kudoers: usize = activities.iter().map(|a| a.kudoers.len()).sum();

    let unique_people = activities
        .iter()
        .flat_map(|a| &a.kudoers)
        .map(|k| k.key())
        .collect::<HashSet<_>>()
        .len();

    let eligible: HashSet<KudoerKey> = activities
        .iter()
        .take(windows.recent)
        .flat_map(|a| &a.kudoers)
        .map(|k| k.key())
        .collect();

    // Occurrence pass over the whole window; `builders` keeps first-seen order.
    let mut builders: Vec<PatternBuilder> = Vec::new();
    let mut slots: HashMap<KudoerKey, usize> = HashMap::new();

    for entry in &activities {
        for kudoer in &entry.kudoers {
            let key = kudoer.key();
            if !eligible.contains(&key) {
                continue;
            }

            let slot = *slots.entry(key).or_insert_with(|| {
                builders.push(PatternBuilder::new(kudoer.display_name()));
                builders.len() - 1
            });
            builders[slot].record(&entry.activity);
        }
    }

    // `sort_by` is stable: equal counts stay in first-seen order.
    builders.sort_by(|a, b| b.count().cmp(&a.count()));
    builders.truncate(MAX_RANKED_KUDOERS);

    let patterns = builders
        .into_iter()
        .enumerate()
        .map(|(index, builder)| builder.finish(index as u32 + 1))
        .collect();

    DashboardSummary {
        total_kudoers: total_kudoers as u32,
        unique_people: unique_people as u32,
        recent_window: windows.recent as u32,
        total_window: windows.total as u32,
        activities,
        patterns,
    }
}

/// Thresholds (km) met by at least 80% of `distances_km`, ascending.
pub fn distance_preferences(distances_km: &[f64]) -> Vec<u32> {
    if distances_km.is_empty() {
        return Vec::new();
    }

    let total = distances_km.len() as f64;
    DISTANCE_THRESHOLDS_KM
        .iter()
        .copied()
        .filter(|&threshold| {
            let meeting = distances_km
                .iter()
                .filter(|&&d| d >= f64::from(threshold))
                .count() as f64;
            meeting / total >= DISTANCE_PREFERENCE_RATIO
        })
        .collect()
}

/// Most frequent types first, ties in first-seen order, at most three.
pub fn top_types(type_counts: &[TypeCount]) -> Vec<TypeCount> {
    let mut sorted = type_counts.to_vec();
    sorted.sort_by(|a, b| b.count.cmp(&a.count));
    sorted.truncate(TOP_TYPE_LIMIT);
    sorted
}

/// Label used by the dashboard for a distance threshold.
pub fn distance_label(threshold_km: u32) -> String {
    format!("≥{}km", threshold_km)
}

/// Working state for one kudoer while scanning activities.
struct PatternBuilder {
    name: String,
    activity_names: Vec<String>,
    type_counts: Vec<TypeCount>,
    distances_km: Vec<f64>,
}

impl PatternBuilder {
    fn new(name: String) -> Self {
        Self {
            name,
            activity_names: Vec::new(),
            type_counts: Vec::new(),
            distances_km: Vec::new(),
        }
    }

    fn count(&self) -> usize {
        self.distances_km.len()
    }

    fn record(&mut self, activity: &Activity) {
        self.activity_names.push(activity.name.clone());
        self.distances_km.push(activity.distance_km());

        // A handful of types per person; a linear scan keeps insertion order.
        match self
            .type_counts
            .iter_mut()
            .find(|t| t.activity_type == activity.activity_type)
        {
            Some(entry) => entry.count += 1,
            None => self.type_counts.push(TypeCount {
                activity_type: activity.activity_type.clone(),
                count: 1,
            }),
        }
    }

    fn finish(self, rank: u32) -> KudoerPattern {
        let min_distance = self
            .distances_km
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);
        let max_distance = self
            .distances_km
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let sum: f64 = self.distances_km.iter().sum();
        // Clamp so float rounding never puts the mean outside [min, max].
        let avg_distance = (sum / self.count() as f64)
            .max(min_distance)
            .min(max_distance);

        KudoerPattern {
            rank,
            count: self.count() as u32,
            top_types: top_types(&self.type_counts),
            distance_preferences: distance_preferences(&self.distances_km)
                .into_iter()
                .map(distance_label)
                .collect(),
            name: self.name,
            activities: self.activity_names,
            types: self.type_counts,
            distances: self.distances_km,
            min_distance,
            max_distance,
            avg_distance,
        }
    }
}
