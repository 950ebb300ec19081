#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Record normalization.
//!
//! Converts loosely-keyed raw rows (spreadsheet cells, AI-extracted JSON,
//! manual form data) into [`NewPerformanceRecord`]s. Each row either
//! normalizes cleanly or is rejected with a [`RejectReason`]; a rejected
//! row never aborts the rest of its batch.

pub mod category;
pub mod columns;
pub mod parsing;
pub mod value;

use police_perf_district_models::District;
use police_perf_record_models::NewPerformanceRecord;
use thiserror::Error;

pub use columns::{ColumnMap, Field};
pub use value::{RawRow, RawValue};

/// Why a row was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    /// The district name or id does not match any known district.
    #[error("Unknown district: {value:?}")]
    UnknownDistrict {
        /// The value as it appeared in the row.
        value: String,
    },
    /// The date cell could not be interpreted.
    #[error("Invalid date: {value:?}")]
    InvalidDate {
        /// The value as it appeared in the row.
        value: String,
    },
    /// No category was given.
    #[error("Missing category")]
    MissingCategory,
    /// A count is absent, negative, fractional, or not a number.
    #[error("Invalid number in {field}: {value:?}")]
    InvalidNumeric {
        /// Column the bad value came from.
        field: &'static str,
        /// The value as it appeared in the row.
        value: String,
    },
    /// More cases solved than registered.
    #[error("Cases solved ({solved}) exceeds cases registered ({registered})")]
    InconsistentCounts {
        /// Cases registered.
        registered: u64,
        /// Cases solved.
        solved: u64,
    },
}

/// A rejected row and its position in the batch (zero-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRejection {
    /// Index of the row within the submitted batch.
    pub row_index: usize,
    /// Why it was rejected.
    pub reason: RejectReason,
}

/// Result of normalizing a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Rows that passed every rule, in input order.
    pub accepted: Vec<NewPerformanceRecord>,
    /// Rows that were skipped.
    pub rejected: Vec<RowRejection>,
    /// Number of rows submitted.
    pub total: usize,
}

impl BatchOutcome {
    /// Whether the batch was non-empty and nothing validated.
    #[must_use]
    pub fn all_rejected(&self) -> bool {
        self.total > 0 && self.accepted.is_empty()
    }
}

/// Normalizes one row using headers already resolved for its batch.
///
/// Rules run in order and the first failure wins: district, date,
/// category, counts, then the solved-versus-registered check.
///
/// # Errors
///
/// Returns the [`RejectReason`] of the first rule the row fails.
pub fn normalize_row(
    columns: &ColumnMap,
    row: &RawRow,
) -> Result<NewPerformanceRecord, RejectReason> {
    let district_id = resolve_district(columns, row)?;

    let date_value = columns
        .get(row, Field::Date)
        .ok_or_else(|| RejectReason::InvalidDate {
            value: String::new(),
        })?;
    let date = parsing::parse_date(date_value).ok_or_else(|| RejectReason::InvalidDate {
        value: date_value.describe(),
    })?;

    let category = columns
        .get(row, Field::Category)
        .and_then(RawValue::as_text)
        .and_then(|s| category::resolve_category(&s))
        .ok_or(RejectReason::MissingCategory)?;

    let (cases_registered, cases_solved) = resolve_counts(columns, row)?;
    if cases_solved > cases_registered {
        return Err(RejectReason::InconsistentCounts {
            registered: cases_registered,
            solved: cases_solved,
        });
    }

    Ok(NewPerformanceRecord {
        district_id,
        category,
        cases_registered,
        cases_solved,
        date,
    })
}

/// Normalizes a batch, resolving its column aliases once up front.
#[must_use]
pub fn normalize_batch(rows: &[RawRow]) -> BatchOutcome {
    let columns = ColumnMap::resolve(rows);
    let mut outcome = BatchOutcome {
        accepted: Vec::with_capacity(rows.len()),
        rejected: Vec::new(),
        total: rows.len(),
    };

    for (row_index, row) in rows.iter().enumerate() {
        match normalize_row(&columns, row) {
            Ok(record) => outcome.accepted.push(record),
            Err(reason) => {
                log::warn!("Skipping row {}: {reason}", row_index + 1);
                outcome.rejected.push(RowRejection { row_index, reason });
            }
        }
    }

    log::info!(
        "Normalized {} of {} rows ({} rejected)",
        outcome.accepted.len(),
        outcome.total,
        outcome.rejected.len()
    );

    outcome
}

fn resolve_district(columns: &ColumnMap, row: &RawRow) -> Result<u32, RejectReason> {
    let name = columns.get(row, Field::District).and_then(RawValue::as_text);
    if let Some(district) = name.as_deref().and_then(District::by_name) {
        return Ok(district.id);
    }

    let id_value = columns.get(row, Field::DistrictId);
    if let Some(district) = id_value
        .and_then(parsing::parse_count)
        .and_then(|id| u32::try_from(id).ok())
        .and_then(District::by_id)
    {
        return Ok(district.id);
    }

    Err(RejectReason::UnknownDistrict {
        value: name
            .or_else(|| id_value.map(RawValue::describe))
            .unwrap_or_default(),
    })
}

/// Reads the paired counts, or the legacy single `value` when neither
/// paired column is present on the row.
fn resolve_counts(columns: &ColumnMap, row: &RawRow) -> Result<(u64, u64), RejectReason> {
    let registered = columns.get(row, Field::CasesRegistered);
    let solved = columns.get(row, Field::CasesSolved);

    if registered.is_none()
        && solved.is_none()
        && let Some(value) = columns.get(row, Field::Value)
    {
        let count = required_count(Some(value), Field::Value)?;
        return Ok((count, count));
    }

    Ok((
        required_count(registered, Field::CasesRegistered)?,
        required_count(solved, Field::CasesSolved)?,
    ))
}

fn required_count(value: Option<&RawValue>, field: Field) -> Result<u64, RejectReason> {
    value
        .and_then(parsing::parse_count)
        .ok_or_else(|| RejectReason::InvalidNumeric {
            field: field.header(),
            value: value.map(RawValue::describe).unwrap_or_default(),
        })
}
