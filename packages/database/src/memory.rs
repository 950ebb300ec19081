//! In-process record store.

use async_trait::async_trait;
use police_perf_record_models::{NewPerformanceRecord, PerformanceRecord, RecordFilter};
use tokio::sync::RwLock;

use crate::{DbError, RecordStore};

/// Keeps records in memory with the same semantics as the `SQLite` store.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<Vec<PerformanceRecord>>,
}

impl MemoryRecordStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert_many(
        &self,
        records: &[NewPerformanceRecord],
    ) -> Result<Vec<PerformanceRecord>, DbError> {
        let stored: Vec<PerformanceRecord> = records
            .iter()
            .map(|r| r.clone().with_id(uuid::Uuid::new_v4().to_string()))
            .collect();
        self.records.write().await.extend(stored.iter().cloned());
        Ok(stored)
    }

    async fn query(&self, filter: &RecordFilter) -> Result<Vec<PerformanceRecord>, DbError> {
        let mut matched: Vec<PerformanceRecord> = self
            .records
            .read()
            .await
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        Ok(matched)
    }

    async fn count(&self, filter: &RecordFilter) -> Result<u64, DbError> {
        let records = self.records.read().await;
        Ok(records.iter().filter(|r| filter.matches(r)).count() as u64)
    }

    async fn delete_many(&self, filter: &RecordFilter) -> Result<u64, DbError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| !filter.matches(r));
        Ok((before - records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone as _, Utc};
    use police_perf_district_models::Category;

    use super::*;

    #[tokio::test]
    async fn query_orders_by_date() {
        let store = MemoryRecordStore::new();
        let later = NewPerformanceRecord {
            district_id: 1,
            category: Category::Nbw,
            cases_registered: 1,
            cases_solved: 1,
            date: Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap(),
        };
        let earlier = NewPerformanceRecord {
            date: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
            ..later.clone()
        };
        store.insert_many(&[later, earlier]).await.unwrap();
        let all = store.query(&RecordFilter::all()).await.unwrap();
        assert!(all[0].date < all[1].date);
        assert_eq!(store.delete_many(&RecordFilter::all()).await.unwrap(), 2);
        assert_eq!(store.count(&RecordFilter::all()).await.unwrap(), 0);
    }
}
