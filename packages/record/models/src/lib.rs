#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The canonical performance record and the three-way record filter.
//!
//! Every ingestion source (manual entry, spreadsheet, PDF extraction,
//! free-text extraction) produces [`NewPerformanceRecord`]s. The store
//! assigns an id on insert, yielding a [`PerformanceRecord`]. Records are
//! append-only and are only removed through a filtered bulk delete.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use police_perf_district_models::Category;
use serde::{Deserialize, Serialize};

/// A stored performance record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceRecord {
    /// Opaque identifier assigned by the store.
    pub id: String,
    /// District this record belongs to.
    pub district_id: u32,
    /// Performance category.
    pub category: Category,
    /// Cases registered in the period.
    pub cases_registered: u64,
    /// Cases solved in the period. Never exceeds `cases_registered`.
    pub cases_solved: u64,
    /// Point in time the figures refer to.
    pub date: DateTime<Utc>,
}

/// A validated record that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPerformanceRecord {
    /// District this record belongs to.
    pub district_id: u32,
    /// Performance category.
    pub category: Category,
    /// Cases registered in the period.
    pub cases_registered: u64,
    /// Cases solved in the period.
    pub cases_solved: u64,
    /// Point in time the figures refer to.
    pub date: DateTime<Utc>,
}

impl NewPerformanceRecord {
    /// Attaches a store-assigned id.
    #[must_use]
    pub fn with_id(self, id: impl Into<String>) -> PerformanceRecord {
        PerformanceRecord {
            id: id.into(),
            district_id: self.district_id,
            category: self.category,
            cases_registered: self.cases_registered,
            cases_solved: self.cases_solved,
            date: self.date,
        }
    }
}

/// An inclusive range of UTC calendar days.
///
/// A range without `to` covers the single day `from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    /// First day of the range.
    pub from: NaiveDate,
    /// Last day of the range, if different from `from`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// Creates a range spanning `from..=to`.
    #[must_use]
    pub const fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to: Some(to) }
    }

    /// Creates a range covering one day.
    #[must_use]
    pub const fn single_day(day: NaiveDate) -> Self {
        Self {
            from: day,
            to: None,
        }
    }

    /// Last calendar day covered (`to`, or `from` when open-ended).
    #[must_use]
    pub fn last_day(&self) -> NaiveDate {
        self.to.unwrap_or(self.from)
    }

    /// Returns the same range with the end bound made explicit.
    #[must_use]
    pub fn closed(self) -> Self {
        Self {
            from: self.from,
            to: Some(self.last_day()),
        }
    }

    /// Start of the first day, 00:00:00.000 UTC.
    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        start_of_day(self.from)
    }

    /// End of the last day, 23:59:59.999 UTC.
    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        end_of_day(self.last_day())
    }

    /// Whether `instant` falls within the range, both ends inclusive.
    #[must_use]
    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        *instant >= self.start() && *instant <= self.end()
    }
}

/// Midnight UTC at the start of `day`.
#[must_use]
pub fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

/// Last millisecond of `day` in UTC.
#[must_use]
pub fn end_of_day(day: NaiveDate) -> DateTime<Utc> {
    start_of_day(day) + TimeDelta::days(1) - TimeDelta::milliseconds(1)
}

/// District, category, and date-range selection applied to records.
///
/// Every dimension is optional; an absent dimension matches everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFilter {
    /// Only records for this district.
    #[serde(default)]
    pub district_id: Option<u32>,
    /// Only records in this category.
    #[serde(default)]
    pub category: Option<Category>,
    /// Only records dated within this range.
    #[serde(default)]
    pub date_range: Option<DateRange>,
}

impl RecordFilter {
    /// A filter with no dimension set.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            district_id: None,
            category: None,
            date_range: None,
        }
    }

    /// Whether no dimension is constrained.
    #[must_use]
    pub const fn is_unconstrained(&self) -> bool {
        self.district_id.is_none() && self.category.is_none() && self.date_range.is_none()
    }

    /// Same filter with the date range dropped.
    #[must_use]
    pub const fn without_dates(self) -> Self {
        Self {
            district_id: self.district_id,
            category: self.category,
            date_range: None,
        }
    }

    /// Whether `record` passes every constrained dimension.
    #[must_use]
    pub fn matches(&self, record: &PerformanceRecord) -> bool {
        self.district_id.is_none_or(|id| record.district_id == id)
            && self.category.is_none_or(|c| record.category == c)
            && self
                .date_range
                .as_ref()
                .is_none_or(|range| range.contains(&record.date))
    }
}
