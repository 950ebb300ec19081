#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ingestion of performance data.
//!
//! Every path ends in the same place: a batch of [`RawRow`]s goes through
//! the normalizer, invalid rows are skipped and logged, and the survivors
//! are written to the [`RecordStore`] in one batch. Spreadsheets and CSV
//! files are parsed locally; PDFs and free text go through the
//! [`Reporter`] for extraction first.

pub mod spreadsheet;

use std::fmt;
use std::path::Path;

use police_perf_ai::output::encode_data_uri;
use police_perf_ai::{AiError, Reporter};
use police_perf_database::{DbError, RecordStore};
use police_perf_normalize::{
    ColumnMap, RawRow, RawValue, RejectReason, RowRejection, normalize_batch, normalize_row,
};
use police_perf_record_models::PerformanceRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during ingestion.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Nothing was submitted.
    #[error("No data found in the input")]
    EmptyInput,

    /// Rows were submitted but none passed validation.
    #[error("None of the {total} rows could be saved")]
    NoValidRecords {
        /// Rows submitted.
        total: usize,
        /// Why each row was skipped.
        skipped: Vec<SkippedRow>,
    },

    /// A manually entered record failed validation.
    #[error("Invalid record: {0}")]
    Rejected(#[from] RejectReason),

    /// The file type is not supported.
    #[error("Unsupported file type: {extension:?}")]
    UnsupportedFile {
        /// Extension as given.
        extension: String,
    },

    /// The file could not be interpreted.
    #[error("Malformed input: {message}")]
    Malformed {
        /// Description of what went wrong.
        message: String,
    },

    /// Workbook parsing failed.
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Extraction through the model failed.
    #[error(transparent)]
    Ai(#[from] AiError),

    /// The store failed.
    #[error(transparent)]
    Persistence(#[from] DbError),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Ingestion options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOptions {
    /// Validate without writing anything.
    #[serde(default)]
    pub dry_run: bool,
}

/// A skipped row, as reported to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRow {
    /// One-based row number within the submitted data.
    pub row: usize,
    /// Why it was skipped.
    pub reason: String,
}

impl From<&RowRejection> for SkippedRow {
    fn from(rejection: &RowRejection) -> Self {
        Self {
            row: rejection.row_index + 1,
            reason: rejection.reason.to_string(),
        }
    }
}

/// Result of an ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
    /// Records written (or that would be written in a dry run).
    pub saved: usize,
    /// Rows submitted.
    pub total: usize,
    /// Rows skipped, with reasons.
    pub rejected: Vec<SkippedRow>,
    /// Whether this was a dry run.
    pub dry_run: bool,
    /// Stored records with their assigned ids. Empty for dry runs.
    #[serde(default)]
    pub records: Vec<PerformanceRecord>,
}

impl fmt::Display for IngestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            write!(
                f,
                "{} of {} records valid (dry run, nothing saved)",
                self.saved, self.total
            )
        } else {
            write!(f, "{} of {} records saved", self.saved, self.total)
        }
    }
}

/// Supported upload types, by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// `.xlsx`, `.xls`, `.xlsm`, `.xlsb`, `.ods`
    Workbook,
    /// `.csv`
    Csv,
    /// `.pdf`
    Pdf,
}

impl FileKind {
    /// Determines the kind from a file name.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::UnsupportedFile`] for anything else.
    pub fn from_filename(filename: &str) -> Result<Self, IngestError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        match extension.as_str() {
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Ok(Self::Workbook),
            "csv" => Ok(Self::Csv),
            "pdf" => Ok(Self::Pdf),
            _ => Err(IngestError::UnsupportedFile { extension }),
        }
    }
}

/// Normalizes `rows` and stores the valid ones in a single batch.
///
/// # Errors
///
/// * [`IngestError::EmptyInput`] when `rows` is empty
/// * [`IngestError::NoValidRecords`] when every row is rejected
/// * [`IngestError::Persistence`] when the store fails
pub async fn ingest_rows(
    store: &dyn RecordStore,
    rows: &[RawRow],
    options: IngestOptions,
) -> Result<IngestOutcome, IngestError> {
    if rows.is_empty() {
        return Err(IngestError::EmptyInput);
    }

    let batch = normalize_batch(rows);
    let rejected: Vec<SkippedRow> = batch.rejected.iter().map(SkippedRow::from).collect();

    if batch.all_rejected() {
        return Err(IngestError::NoValidRecords {
            total: batch.total,
            skipped: rejected,
        });
    }

    let records = if options.dry_run {
        Vec::new()
    } else {
        store.insert_many(&batch.accepted).await?
    };

    let outcome = IngestOutcome {
        saved: batch.accepted.len(),
        total: batch.total,
        rejected,
        dry_run: options.dry_run,
        records,
    };
    log::info!("{outcome}");
    Ok(outcome)
}

/// Parses an uploaded file and ingests it. PDFs need a `reporter`.
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be read or extracted, or if
/// [`ingest_rows`] fails.
pub async fn ingest_file(
    store: &dyn RecordStore,
    reporter: Option<&Reporter>,
    filename: &str,
    bytes: Vec<u8>,
    options: IngestOptions,
) -> Result<IngestOutcome, IngestError> {
    if bytes.is_empty() {
        return Err(IngestError::EmptyInput);
    }

    let rows = match FileKind::from_filename(filename)? {
        FileKind::Workbook => spreadsheet::read_workbook(bytes)?,
        FileKind::Csv => spreadsheet::read_csv(&bytes)?,
        FileKind::Pdf => {
            let reporter = require_reporter(reporter)?;
            log::info!("Extracting records from {filename} via {}", reporter.provider_name());
            reporter
                .extract_from_document(&encode_data_uri("application/pdf", &bytes))
                .await?
        }
    };

    ingest_rows(store, &rows, options).await
}

/// Reads a file from disk and ingests it.
///
/// # Errors
///
/// Returns [`IngestError`] as [`ingest_file`] does, or
/// [`IngestError::Io`] if the file cannot be read.
pub async fn ingest_path(
    store: &dyn RecordStore,
    reporter: Option<&Reporter>,
    path: &Path,
    options: IngestOptions,
) -> Result<IngestOutcome, IngestError> {
    let bytes = std::fs::read(path)?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    ingest_file(store, reporter, filename, bytes, options).await
}

/// Extracts records from free text and ingests them.
///
/// # Errors
///
/// Returns [`IngestError::EmptyInput`] for blank text, or any extraction
/// or [`ingest_rows`] error.
pub async fn ingest_text(
    store: &dyn RecordStore,
    reporter: Option<&Reporter>,
    text: &str,
    options: IngestOptions,
) -> Result<IngestOutcome, IngestError> {
    if text.trim().is_empty() {
        return Err(IngestError::EmptyInput);
    }
    let reporter = require_reporter(reporter)?;
    let rows = reporter.extract_from_text(text).await?;
    ingest_rows(store, &rows, options).await
}

fn require_reporter(reporter: Option<&Reporter>) -> Result<&Reporter, IngestError> {
    reporter.ok_or_else(|| {
        IngestError::Ai(AiError::Config {
            message: "AI extraction is not configured".to_string(),
        })
    })
}

/// A single record typed in by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualEntry {
    /// District name or numeric id.
    pub district: String,
    /// Category value or label.
    pub category: String,
    /// Cases registered.
    pub cases_registered: u64,
    /// Cases solved.
    pub cases_solved: u64,
    /// Date in any accepted format.
    pub date: String,
}

impl ManualEntry {
    /// The entry as a raw row with canonical headers.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_row(&self) -> RawRow {
        RawRow::new()
            .with("District", self.district.as_str())
            .with("Category", self.category.as_str())
            .with("Cases Registered", RawValue::Number(self.cases_registered as f64))
            .with("Cases Solved", RawValue::Number(self.cases_solved as f64))
            .with("Date", self.date.as_str())
    }
}

/// Validates and stores a single manual entry.
///
/// # Errors
///
/// Returns [`IngestError::Rejected`] with the first failing rule, or
/// [`IngestError::Persistence`] when the store fails.
pub async fn ingest_manual(
    store: &dyn RecordStore,
    entry: &ManualEntry,
    options: IngestOptions,
) -> Result<IngestOutcome, IngestError> {
    let row = entry.to_row();
    let columns = ColumnMap::resolve([&row]);
    let record = normalize_row(&columns, &row)?;

    let records = if options.dry_run {
        Vec::new()
    } else {
        store.insert_many(std::slice::from_ref(&record)).await?
    };

    Ok(IngestOutcome {
        saved: 1,
        total: 1,
        rejected: Vec::new(),
        dry_run: options.dry_run,
        records,
    })
}

#[cfg(test)]
mod tests {
    use police_perf_database::MemoryRecordStore;
    use police_perf_district_models::Category;
    use police_perf_record_models::RecordFilter;

    use super::*;

    fn row(district: &str, category: &str, registered: f64, solved: f64) -> RawRow {
        RawRow::new()
            .with("District", district)
            .with("Category", category)
            .with("Cases Registered", registered)
            .with("Cases Solved", solved)
            .with("Date", "2023-05-15")
    }

    #[tokio::test]
    async fn unknown_district_is_skipped_and_rest_saved() {
        let store = MemoryRecordStore::new();
        let rows = [
            row("Ganjam", "NBW", 120.0, 80.0),
            row("Unknown County", "NBW", 5.0, 1.0),
            row("Puri", "Conviction", 10.0, 9.0),
        ];
        let outcome = ingest_rows(&store, &rows, IngestOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.saved, 2);
        assert_eq!(outcome.total, 3);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].row, 2);
        assert_eq!(outcome.to_string(), "2 of 3 records saved");
        assert_eq!(store.count(&RecordFilter::all()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn all_rejected_is_no_valid_records() {
        let store = MemoryRecordStore::new();
        let rows = [row("Ganjam", "NBW", 1.0, 2.0)];
        let err = ingest_rows(&store, &rows, IngestOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::NoValidRecords { total: 1, .. }));
        assert_eq!(store.count(&RecordFilter::all()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_input_is_reported() {
        let store = MemoryRecordStore::new();
        assert!(matches!(
            ingest_rows(&store, &[], IngestOptions::default()).await,
            Err(IngestError::EmptyInput)
        ));
        assert!(matches!(
            ingest_text(&store, None, "   ", IngestOptions::default()).await,
            Err(IngestError::EmptyInput)
        ));
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let store = MemoryRecordStore::new();
        let outcome = ingest_rows(
            &store,
            &[row("Cuttack", "Cybercrime", 3.0, 1.0)],
            IngestOptions { dry_run: true },
        )
        .await
        .unwrap();
        assert_eq!(outcome.saved, 1);
        assert!(outcome.records.is_empty());
        assert!(outcome.to_string().contains("dry run"));
        assert_eq!(store.count(&RecordFilter::all()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn csv_upload_round_trips_through_normalizer() {
        let store = MemoryRecordStore::new();
        let csv = b"District,Category,Cases Registered,Cases Solved,Date\n\
                    Ganjam,NBW,120,80,2023-05-15\n"
            .to_vec();
        let outcome = ingest_file(&store, None, "report.CSV", csv, IngestOptions::default())
            .await
            .unwrap();
        assert_eq!(outcome.saved, 1);
        assert_eq!(outcome.records[0].category, Category::Nbw);
        assert_eq!(outcome.records[0].cases_registered, 120);
    }

    #[tokio::test]
    async fn pdf_without_reporter_is_config_error() {
        let store = MemoryRecordStore::new();
        let err = ingest_file(
            &store,
            None,
            "report.pdf",
            b"%PDF-1.4".to_vec(),
            IngestOptions::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, IngestError::Ai(AiError::Config { .. })));
    }

    #[test]
    fn unsupported_extension() {
        assert!(matches!(
            FileKind::from_filename("notes.docx"),
            Err(IngestError::UnsupportedFile { .. })
        ));
        assert_eq!(FileKind::from_filename("a.ods").unwrap(), FileKind::Workbook);
    }

    #[tokio::test]
    async fn manual_entry_is_validated() {
        let store = MemoryRecordStore::new();
        let entry = ManualEntry {
            district: "Sambalpur".to_string(),
            category: "Missing Persons Traced".to_string(),
            cases_registered: 4,
            cases_solved: 3,
            date: "2024-02-01".to_string(),
        };
        let outcome = ingest_manual(&store, &entry, IngestOptions::default())
            .await
            .unwrap();
        assert_eq!(outcome.records[0].category, Category::MissingPerson);

        let bad = ManualEntry {
            cases_solved: 9,
            ..entry
        };
        assert!(matches!(
            ingest_manual(&store, &bad, IngestOptions::default()).await,
            Err(IngestError::Rejected(RejectReason::InconsistentCounts { .. }))
        ));
    }
}
