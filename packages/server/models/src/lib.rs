#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the police performance server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the stored record types so the API contract can evolve on its own.

use chrono::{DateTime, NaiveDate, Utc};
use police_perf_analytics_models::CategoryScore;
use police_perf_district_models::{Category, District, Language, district_name};
use police_perf_record_models::{DateRange, PerformanceRecord, RecordFilter};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct ApiHealth {
    /// Always `"ok"` when the server answers.
    pub status: String,
    /// Server version.
    pub version: String,
}

/// A selectable category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiCategory {
    /// Stored value.
    pub value: String,
    /// Display label.
    pub label: String,
}

impl From<Category> for ApiCategory {
    fn from(category: Category) -> Self {
        Self {
            value: category.to_string(),
            label: category.label().to_string(),
        }
    }
}

/// A stored record as returned by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRecord {
    /// Record id.
    pub id: String,
    /// District id.
    pub district_id: u32,
    /// District name.
    pub district_name: String,
    /// Stored category value.
    pub category: Category,
    /// Category display label.
    pub category_label: String,
    /// Cases registered.
    pub cases_registered: u64,
    /// Cases solved.
    pub cases_solved: u64,
    /// Record date (ISO 8601).
    pub date: DateTime<Utc>,
}

impl From<PerformanceRecord> for ApiRecord {
    fn from(record: PerformanceRecord) -> Self {
        Self {
            district_name: district_name(record.district_id).to_string(),
            category_label: record.category.label().to_string(),
            id: record.id,
            district_id: record.district_id,
            category: record.category,
            cases_registered: record.cases_registered,
            cases_solved: record.cases_solved,
            date: record.date,
        }
    }
}

/// Errors converting request parameters into a [`RecordFilter`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// No district has this id.
    #[error("Unknown district id {0}")]
    UnknownDistrict(u32),

    /// The category matches no stored value or label.
    #[error("Unknown category {0:?}")]
    UnknownCategory(String),

    /// `to` is before `from`.
    #[error("Date range ends ({to}) before it starts ({from})")]
    InvertedRange {
        /// Start day.
        from: NaiveDate,
        /// End day.
        to: NaiveDate,
    },

    /// `to` was given without `from`.
    #[error("A date range needs a start date")]
    MissingStart,
}

/// District, category, and date filter shared by the query endpoints and
/// embedded in several request bodies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterParams {
    /// District id.
    pub district_id: Option<u32>,
    /// Category value or label.
    pub category: Option<String>,
    /// First day, `YYYY-MM-DD`.
    pub from: Option<NaiveDate>,
    /// Last day, `YYYY-MM-DD`. Defaults to `from`.
    pub to: Option<NaiveDate>,
}

impl FilterParams {
    /// Whether no parameter was supplied.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.district_id.is_none()
            && self.category.is_none()
            && self.from.is_none()
            && self.to.is_none()
    }

    /// Validates the parameters and builds a filter.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError`] for an unknown district or category, or a
    /// malformed date range.
    pub fn to_filter(&self) -> Result<RecordFilter, FilterError> {
        let district_id = match self.district_id {
            Some(id) if District::by_id(id).is_none() => {
                return Err(FilterError::UnknownDistrict(id));
            }
            id => id,
        };

        let category = match self.category.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                Category::from_value_or_label(raw)
                    .ok_or_else(|| FilterError::UnknownCategory(raw.to_string()))?,
            ),
        };

        let date_range = match (self.from, self.to) {
            (None, None) => None,
            (None, Some(_)) => return Err(FilterError::MissingStart),
            (Some(from), Some(to)) if to < from => {
                return Err(FilterError::InvertedRange { from, to });
            }
            (Some(from), to) => Some(DateRange { from, to }),
        };

        Ok(RecordFilter {
            district_id,
            category,
            date_range,
        })
    }
}

/// `POST /api/ingest/upload` query string.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadParams {
    /// Original file name; its extension selects the parser.
    pub filename: String,
    /// Validate without saving.
    #[serde(default)]
    pub dry_run: bool,
}

/// `POST /api/ingest/text` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextIngestRequest {
    /// Free text containing figures.
    pub text: String,
    /// Validate without saving.
    #[serde(default)]
    pub dry_run: bool,
}

/// A row skipped during ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSkippedRow {
    /// One-based row number.
    pub row: usize,
    /// Why it was skipped.
    pub reason: String,
}

/// Ingestion result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    /// e.g. `"2 of 3 records saved"`.
    pub message: String,
    /// Records saved.
    pub saved: usize,
    /// Rows submitted.
    pub total: usize,
    /// Rows skipped.
    pub rejected: Vec<ApiSkippedRow>,
    /// Whether nothing was persisted.
    pub dry_run: bool,
}

/// `POST /api/clean/preview` and `POST /api/clean` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanRequest {
    /// Which records to delete.
    #[serde(flatten)]
    pub filter: FilterParams,
    /// Required when the filter is empty.
    #[serde(default)]
    pub confirmed: bool,
}

/// `POST /api/clean` response.
#[derive(Debug, Clone, Serialize)]
pub struct CleanResponse {
    /// Records removed.
    pub deleted: u64,
}

/// `POST /api/ai/summary` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    /// Which records to summarize.
    #[serde(flatten)]
    pub filter: FilterParams,
    /// Output language.
    #[serde(default)]
    pub language: Language,
    /// Also read the summary aloud.
    #[serde(default)]
    pub with_audio: bool,
}

/// `POST /api/ai/summary` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    /// Language of the text.
    pub language: Language,
    /// Executive summary.
    pub summary: String,
    /// Notable achievements.
    pub achievements: Vec<String>,
    /// Areas to improve.
    pub improvements: Vec<String>,
    /// WAV data URI when audio was requested and synthesized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_data_uri: Option<String>,
}

/// `POST /api/ai/translate` and `POST /api/ai/speech` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRequest {
    /// Source text.
    pub text: String,
    /// Target language.
    #[serde(default)]
    pub language: Language,
}

/// `POST /api/ai/translate` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateResponse {
    /// Translated text.
    pub translated_text: String,
}

/// `POST /api/ai/speech` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechResponse {
    /// `data:audio/wav;base64,...`
    pub audio_data_uri: String,
}

/// `POST /api/ai/suggestions` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionsRequest {
    /// District to advise.
    pub district_id: u32,
}

/// `POST /api/ai/suggestions` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionsResponse {
    /// District id.
    pub district_id: u32,
    /// District name.
    pub name: String,
    /// Weakest categories the suggestions address.
    pub worst_categories: Vec<CategoryScore>,
    /// Recommendations.
    pub suggestions: Vec<String>,
}
