#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Derived view types produced by the aggregation engine.
//!
//! None of these are persisted. They are recomputed from the stored
//! records on every query and serialized as camelCase JSON for the API and
//! for AI summarization input.

use police_perf_district_models::Category;
use police_perf_record_models::RecordFilter;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// `solved / registered * 100`, or 0 when nothing was registered.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn solve_rate(registered: u64, solved: u64) -> f64 {
    if registered == 0 {
        0.0
    } else {
        solved as f64 / registered as f64 * 100.0
    }
}

/// Formats a rate with one decimal place, e.g. `66.7%`.
#[must_use]
pub fn format_rate(rate: f64) -> String {
    format!("{rate:.1}%")
}

/// Per-category KPI for the current and previous period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetric {
    /// Category this metric covers.
    pub category: Category,
    /// Display label for the category.
    pub label: String,
    /// Cases registered in the current period.
    pub cases_registered: u64,
    /// Cases solved in the current period.
    pub cases_solved: u64,
    /// Current-period solve rate (percent).
    pub solve_rate: f64,
    /// Previous-period solve rate (percent).
    pub previous_solve_rate: f64,
}

impl PerformanceMetric {
    /// Solve-rate change versus the previous period, in percentage points.
    #[must_use]
    pub fn change(&self) -> f64 {
        self.solve_rate - self.previous_solve_rate
    }
}

/// Per-district totals for the comparison chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictComparison {
    /// District id.
    pub district_id: u32,
    /// District name.
    pub name: String,
    /// Cases registered.
    pub cases_registered: u64,
    /// Cases solved.
    pub cases_solved: u64,
    /// Solve rate (percent).
    pub solve_rate: f64,
}

/// One calendar month of the trend series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendBucket {
    /// Month key, `YYYY-MM`.
    pub month: String,
    /// Display label, e.g. `May 2023`.
    pub label: String,
    /// Cases registered that month.
    pub cases_registered: u64,
    /// Cases solved that month.
    pub cases_solved: u64,
    /// Solve rate (percent).
    pub solve_rate: f64,
}

/// Marker for the top three leaderboard positions.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum RankBadge {
    Gold,
    Silver,
    Bronze,
}

impl RankBadge {
    /// Badge for a one-based rank, if it has one.
    #[must_use]
    pub const fn for_rank(rank: usize) -> Option<Self> {
        match rank {
            1 => Some(Self::Gold),
            2 => Some(Self::Silver),
            3 => Some(Self::Bronze),
            _ => None,
        }
    }
}

/// A ranked district.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// One-based position.
    pub rank: usize,
    /// District id.
    pub district_id: u32,
    /// District name.
    pub name: String,
    /// Cases registered across all categories.
    pub total_cases_registered: u64,
    /// Cases solved across all categories.
    pub total_cases_solved: u64,
    /// Solve rate (percent).
    pub solve_rate: f64,
    /// Ranking score. Equal to `total_cases_solved`.
    pub overall_score: u64,
    /// Badge for ranks 1-3.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<RankBadge>,
}

impl LeaderboardEntry {
    /// Ranks below the podium can request improvement suggestions.
    #[must_use]
    pub const fn eligible_for_suggestions(&self) -> bool {
        self.rank > 3
    }
}

/// A district's result in one category, used to pick weak areas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScore {
    /// Category.
    pub category: Category,
    /// Display label.
    pub label: String,
    /// Cases registered.
    pub cases_registered: u64,
    /// Cases solved.
    pub cases_solved: u64,
    /// Solve rate (percent).
    pub solve_rate: f64,
}

/// Sums over the filtered record set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    /// Number of matching records.
    pub records: usize,
    /// Cases registered.
    pub cases_registered: u64,
    /// Cases solved.
    pub cases_solved: u64,
    /// Solve rate (percent).
    pub solve_rate: f64,
}

/// Everything the dashboard shows for one filter selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    /// Filter the view was computed for.
    pub filter: RecordFilter,
    /// One KPI per category.
    pub metrics: Vec<PerformanceMetric>,
    /// One entry per known district.
    pub districts: Vec<DistrictComparison>,
    /// Six monthly buckets, oldest first.
    pub trend: Vec<TrendBucket>,
    /// Ranking over all records.
    pub leaderboard: Vec<LeaderboardEntry>,
    /// Totals for the filtered set.
    pub totals: Totals,
}
