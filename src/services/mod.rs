// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod aggregator;
pub mod strava;
pub mod token_cache;

pub use aggregator::{aggregate, AggregationWindows};
pub use strava::{StravaClient, StravaService, StravaSession};
pub use token_cache::TokenCache;
