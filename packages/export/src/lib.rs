#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Export of performance records.
//!
//! One row per record with the columns in [`HEADERS`]. Spreadsheet and CSV
//! output can be fed straight back into ingestion; the PDF is a paginated
//! table for printing.

pub mod pdf;
pub mod xlsx;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use police_perf_district_models::district_name;
use police_perf_record_models::PerformanceRecord;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Column headers, in order.
pub const HEADERS: [&str; 5] = [
    "District",
    "Category",
    "Cases Registered",
    "Cases Solved",
    "Date",
];

/// Errors that can occur while exporting.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV writer failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Spreadsheet writer failed.
    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// PDF writer failed.
    #[error("PDF error: {message}")]
    Pdf {
        /// Description of what went wrong.
        message: String,
    },

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Supported export formats.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ExportFormat {
    /// Excel workbook.
    Xlsx,
    /// Comma-separated values.
    Csv,
    /// Printable table.
    Pdf,
}

impl ExportFormat {
    /// File extension without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
            Self::Pdf => "pdf",
        }
    }

    /// MIME type for downloads.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Csv => "text/csv",
            Self::Pdf => "application/pdf",
        }
    }

    /// Returns all variants.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Xlsx, Self::Csv, Self::Pdf]
    }
}

/// A record flattened to display values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    /// District name.
    pub district: String,
    /// Stored category value, so the file re-ingests unchanged.
    pub category: String,
    /// Cases registered.
    pub cases_registered: u64,
    /// Cases solved.
    pub cases_solved: u64,
    /// `YYYY-MM-DD`.
    pub date: String,
}

impl From<&PerformanceRecord> for ExportRow {
    fn from(record: &PerformanceRecord) -> Self {
        Self {
            district: district_name(record.district_id).to_string(),
            category: record.category.to_string(),
            cases_registered: record.cases_registered,
            cases_solved: record.cases_solved,
            date: record.date.format("%Y-%m-%d").to_string(),
        }
    }
}

impl ExportRow {
    /// Cells as strings, in [`HEADERS`] order.
    #[must_use]
    pub fn cells(&self) -> [String; 5] {
        [
            self.district.clone(),
            self.category.clone(),
            self.cases_registered.to_string(),
            self.cases_solved.to_string(),
            self.date.clone(),
        ]
    }
}

/// `performance-records-YYYYMMDD-HHMMSS.<ext>`
#[must_use]
pub fn export_filename(format: ExportFormat, now: DateTime<Utc>) -> String {
    format!(
        "performance-records-{}.{}",
        now.format("%Y%m%d-%H%M%S"),
        format.extension()
    )
}

/// Writes records as CSV with a header row.
///
/// # Errors
///
/// Returns [`ExportError::Csv`] if writing fails.
pub fn to_csv(records: &[PerformanceRecord]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADERS)?;
    for record in records {
        writer.write_record(ExportRow::from(record).cells())?;
    }
    writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))
}

/// Renders records in `format`.
///
/// # Errors
///
/// Returns [`ExportError`] if the writer for `format` fails.
pub fn render(records: &[PerformanceRecord], format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    let bytes = match format {
        ExportFormat::Xlsx => xlsx::to_xlsx(records)?,
        ExportFormat::Csv => to_csv(records)?,
        ExportFormat::Pdf => pdf::to_pdf(records, Utc::now())?,
    };
    log::info!(
        "Exported {} records as {format} ({} bytes)",
        records.len(),
        bytes.len()
    );
    Ok(bytes)
}

/// Renders records and writes them to `dir` under a timestamped name.
///
/// # Errors
///
/// Returns [`ExportError`] if rendering or writing fails.
pub fn write_export(
    records: &[PerformanceRecord],
    format: ExportFormat,
    dir: &Path,
) -> Result<PathBuf, ExportError> {
    let bytes = render(records, format)?;
    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_filename(format, Utc::now()));
    std::fs::write(&path, bytes)?;
    Ok(path)
}
