#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Persistence for performance records.
//!
//! [`RecordStore`] is the seam the rest of the workspace talks to: insert a
//! batch, query by filter, count, and delete by filter. [`db`] implements it
//! over `SQLite` through `switchy_database`; [`memory`] keeps records in
//! process. [`clean`] builds the confirmation-gated bulk delete.

pub mod clean;
pub mod db;
pub mod memory;

use async_trait::async_trait;
use police_perf_record_models::{NewPerformanceRecord, PerformanceRecord, RecordFilter};

pub use db::SqliteRecordStore;
pub use memory::MemoryRecordStore;

/// Errors that can occur during record persistence.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// The store rejected or could not run a statement.
    #[error("Persistence unavailable: {0}")]
    PersistenceUnavailable(#[from] switchy_database::DatabaseError),

    /// The database file could not be opened.
    #[error("Failed to open database: {message}")]
    Open {
        /// Description of what went wrong.
        message: String,
    },

    /// Filesystem error while preparing the database location.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored row could not be converted back into a record.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Record persistence operations.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Stores a batch, assigning ids. All or nothing.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the batch could not be written.
    async fn insert_many(
        &self,
        records: &[NewPerformanceRecord],
    ) -> Result<Vec<PerformanceRecord>, DbError>;

    /// Records matching `filter`, ordered by date then id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    async fn query(&self, filter: &RecordFilter) -> Result<Vec<PerformanceRecord>, DbError>;

    /// Number of records matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    async fn count(&self, filter: &RecordFilter) -> Result<u64, DbError>;

    /// Deletes every record matching `filter` in one statement.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the delete fails.
    async fn delete_many(&self, filter: &RecordFilter) -> Result<u64, DbError>;
}
