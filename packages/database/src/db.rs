//! `SQLite` record store.
//!
//! Dates are stored as UTC epoch milliseconds in `date_ms` so range
//! predicates compare integers. Filters are translated into `$n`
//! placeholders, one fragment per constrained dimension.

use std::path::Path;
use std::str::FromStr as _;

use async_trait::async_trait;
use chrono::DateTime;
use moosicbox_json_utils::database::ToValue as _;
use police_perf_district_models::Category;
use police_perf_record_models::{NewPerformanceRecord, PerformanceRecord, RecordFilter};
use switchy_database::{Database, DatabaseValue};
use switchy_database_connection::init_sqlite_rusqlite;

use crate::{DbError, RecordStore};

/// Default location of the records database.
pub const DEFAULT_DB_PATH: &str = "data/police_perf.db";

const SELECT_COLUMNS: &str =
    "id, district_id, category, cases_registered, cases_solved, date_ms";

/// Record store backed by a `switchy_database` connection.
pub struct SqliteRecordStore {
    db: Box<dyn Database>,
}

impl std::fmt::Debug for SqliteRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRecordStore").finish_non_exhaustive()
    }
}

impl SqliteRecordStore {
    /// Opens (or creates) the database file and ensures the schema exists.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the file cannot be opened or the schema
    /// cannot be created.
    pub async fn open(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let db = init_sqlite_rusqlite(Some(path)).map_err(|e| DbError::Open {
            message: e.to_string(),
        })?;

        log::info!("Opened records database at {}", path.display());
        Self::from_database(db).await
    }

    /// Wraps an existing connection, creating the schema if needed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if schema creation fails.
    pub async fn from_database(db: Box<dyn Database>) -> Result<Self, DbError> {
        ensure_schema(db.as_ref()).await?;
        Ok(Self { db })
    }
}

async fn ensure_schema(db: &dyn Database) -> Result<(), DbError> {
    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS performance_records (
            id                TEXT PRIMARY KEY,
            district_id       INTEGER NOT NULL,
            category          TEXT NOT NULL,
            cases_registered  INTEGER NOT NULL,
            cases_solved      INTEGER NOT NULL,
            date_ms           INTEGER NOT NULL,
            created_at        TEXT NOT NULL
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE INDEX IF NOT EXISTS idx_performance_records_filter
         ON performance_records (district_id, category, date_ms)",
    )
    .await?;

    Ok(())
}

/// Builds `WHERE` fragments and their parameters for `filter`.
fn build_filters(filter: &RecordFilter) -> (Vec<String>, Vec<DatabaseValue>) {
    let mut frags = Vec::new();
    let mut params: Vec<DatabaseValue> = Vec::new();
    let mut idx = 1;

    if let Some(district_id) = filter.district_id {
        frags.push(format!("district_id = ${idx}"));
        params.push(DatabaseValue::Int64(i64::from(district_id)));
        idx += 1;
    }

    if let Some(category) = filter.category {
        frags.push(format!("category = ${idx}"));
        params.push(DatabaseValue::String(category.to_string()));
        idx += 1;
    }

    if let Some(range) = filter.date_range {
        frags.push(format!("date_ms >= ${idx}"));
        params.push(DatabaseValue::Int64(range.start().timestamp_millis()));
        idx += 1;

        frags.push(format!("date_ms <= ${idx}"));
        params.push(DatabaseValue::Int64(range.end().timestamp_millis()));
    }

    (frags, params)
}

fn where_clause(frags: &[String]) -> String {
    if frags.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", frags.join(" AND "))
    }
}

fn count_param(value: u64, field: &str) -> Result<DatabaseValue, DbError> {
    i64::try_from(value)
        .map(DatabaseValue::Int64)
        .map_err(|_| DbError::Conversion {
            message: format!("{field} {value} does not fit in a signed 64-bit column"),
        })
}

fn column_error<E: std::fmt::Display>(column: &'static str) -> impl FnOnce(E) -> DbError {
    move |e| DbError::Conversion {
        message: format!("column {column}: {e}"),
    }
}

fn row_to_record(row: &switchy_database::Row) -> Result<PerformanceRecord, DbError> {
    let id: String = row.to_value("id").map_err(column_error("id"))?;
    let district_id: i64 = row
        .to_value("district_id")
        .map_err(column_error("district_id"))?;
    let category: String = row.to_value("category").map_err(column_error("category"))?;
    let registered: i64 = row
        .to_value("cases_registered")
        .map_err(column_error("cases_registered"))?;
    let solved: i64 = row
        .to_value("cases_solved")
        .map_err(column_error("cases_solved"))?;
    let date_ms: i64 = row.to_value("date_ms").map_err(column_error("date_ms"))?;

    let conversion = |message: String| DbError::Conversion { message };

    Ok(PerformanceRecord {
        district_id: u32::try_from(district_id)
            .map_err(|_| conversion(format!("record {id}: bad district id {district_id}")))?,
        category: Category::from_str(&category)
            .map_err(|_| conversion(format!("record {id}: unknown category {category:?}")))?,
        cases_registered: u64::try_from(registered)
            .map_err(|_| conversion(format!("record {id}: negative registered count")))?,
        cases_solved: u64::try_from(solved)
            .map_err(|_| conversion(format!("record {id}: negative solved count")))?,
        date: DateTime::from_timestamp_millis(date_ms)
            .ok_or_else(|| conversion(format!("record {id}: date out of range")))?,
        id,
    })
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn insert_many(
        &self,
        records: &[NewPerformanceRecord],
    ) -> Result<Vec<PerformanceRecord>, DbError> {
        let now = chrono::Utc::now().to_rfc3339();
        let mut stored = Vec::with_capacity(records.len());

        let txn = self.db.begin_transaction().await?;
        for record in records {
            let id = uuid::Uuid::new_v4().to_string();
            txn.exec_raw_params(
                "INSERT INTO performance_records
                    (id, district_id, category, cases_registered, cases_solved, date_ms, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
                &[
                    DatabaseValue::String(id.clone()),
                    DatabaseValue::Int64(i64::from(record.district_id)),
                    DatabaseValue::String(record.category.to_string()),
                    count_param(record.cases_registered, "cases_registered")?,
                    count_param(record.cases_solved, "cases_solved")?,
                    DatabaseValue::Int64(record.date.timestamp_millis()),
                    DatabaseValue::String(now.clone()),
                ],
            )
            .await?;
            stored.push(record.clone().with_id(id));
        }
        txn.commit().await?;

        log::info!("Inserted {} records", stored.len());
        Ok(stored)
    }

    async fn query(&self, filter: &RecordFilter) -> Result<Vec<PerformanceRecord>, DbError> {
        let (frags, params) = build_filters(filter);
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM performance_records{} ORDER BY date_ms, id",
            where_clause(&frags)
        );
        log::debug!("Querying records: {sql}");

        let rows = self.db.query_raw_params(&sql, &params).await?;
        rows.iter().map(row_to_record).collect()
    }

    async fn count(&self, filter: &RecordFilter) -> Result<u64, DbError> {
        let (frags, params) = build_filters(filter);
        let sql = format!(
            "SELECT COUNT(*) as cnt FROM performance_records{}",
            where_clause(&frags)
        );

        let rows = self.db.query_raw_params(&sql, &params).await?;
        let cnt: i64 = rows
            .first()
            .map_or(0, |row| row.to_value("cnt").unwrap_or(0));
        Ok(u64::try_from(cnt).unwrap_or(0))
    }

    async fn delete_many(&self, filter: &RecordFilter) -> Result<u64, DbError> {
        let (frags, params) = build_filters(filter);
        let sql = format!("DELETE FROM performance_records{}", where_clause(&frags));
        log::debug!("Deleting records: {sql}");

        let deleted = self.db.exec_raw_params(&sql, &params).await?;
        log::info!("Deleted {deleted} records");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone as _, Utc};
    use police_perf_record_models::DateRange;

    use super::*;

    fn new_record(district_id: u32, category: Category, day: u32) -> NewPerformanceRecord {
        NewPerformanceRecord {
            district_id,
            category,
            cases_registered: 20,
            cases_solved: 10,
            date: Utc.with_ymd_and_hms(2023, 5, day, 23, 30, 0).unwrap(),
        }
    }

    async fn open_temp() -> (tempfile::TempDir, SqliteRecordStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteRecordStore::open(&dir.path().join("records.db"))
            .await
            .unwrap();
        (dir, store)
    }

    #[test]
    fn filters_become_numbered_fragments() {
        let filter = RecordFilter {
            district_id: Some(2),
            category: Some(Category::Cybercrime),
            date_range: Some(DateRange::single_day(
                NaiveDate::from_ymd_opt(2023, 5, 1).unwrap(),
            )),
        };
        let (frags, params) = build_filters(&filter);
        assert_eq!(
            frags,
            [
                "district_id = $1",
                "category = $2",
                "date_ms >= $3",
                "date_ms <= $4"
            ]
        );
        assert_eq!(params.len(), 4);
        assert_eq!(where_clause(&[]), "");
    }

    #[tokio::test]
    async fn insert_query_and_delete() {
        let (_dir, store) = open_temp().await;
        let stored = store
            .insert_many(&[
                new_record(1, Category::Nbw, 15),
                new_record(1, Category::Conviction, 16),
                new_record(2, Category::Nbw, 31),
            ])
            .await
            .unwrap();
        assert_eq!(stored.len(), 3);
        assert_ne!(stored[0].id, stored[1].id);

        let all = store.query(&RecordFilter::all()).await.unwrap();
        assert_eq!(all, stored);

        let may_31 = RecordFilter {
            date_range: Some(DateRange::single_day(
                NaiveDate::from_ymd_opt(2023, 5, 31).unwrap(),
            )),
            ..RecordFilter::all()
        };
        assert_eq!(store.count(&may_31).await.unwrap(), 1);

        let ganjam = RecordFilter {
            district_id: Some(1),
            ..RecordFilter::all()
        };
        assert_eq!(store.delete_many(&ganjam).await.unwrap(), 2);
        assert_eq!(store.count(&RecordFilter::all()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn mistyped_column_is_a_conversion_error() {
        let (_dir, store) = open_temp().await;
        store
            .db
            .exec_raw(
                "INSERT INTO performance_records
                    (id, district_id, category, cases_registered, cases_solved, date_ms, created_at)
                 VALUES ('bad', 'Ganjam', 'NBW', 5, 2, 0, '2023-05-01T00:00:00Z')",
            )
            .await
            .unwrap();

        let err = store.query(&RecordFilter::all()).await.unwrap_err();
        assert!(matches!(err, DbError::Conversion { .. }), "{err}");
    }

    #[tokio::test]
    async fn reopening_keeps_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("records.db");
        {
            let store = SqliteRecordStore::open(&path).await.unwrap();
            store
                .insert_many(&[new_record(3, Category::Others, 2)])
                .await
                .unwrap();
        }
        let store = SqliteRecordStore::open(&path).await.unwrap();
        assert_eq!(store.count(&RecordFilter::all()).await.unwrap(), 1);
    }
}
