// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod athlete;
pub mod dashboard;

pub use activity::{Activity, ActivityWithKudoers, Kudoer, KudoerKey};
pub use athlete::{Athlete, TokenResponse};
pub use dashboard::{DashboardSummary, KudoerPattern, TypeCount};
