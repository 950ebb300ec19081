//! Data-cleaning query builder.
//!
//! Turns the dashboard's district/category/date selection into a bulk
//! delete. Deleting with nothing selected wipes the whole collection, so
//! that case needs explicit confirmation and a message spelling out what
//! will go.

use police_perf_district_models::district_name;
use police_perf_record_models::RecordFilter;
use serde::Serialize;
use thiserror::Error;

use crate::{DbError, RecordStore};

/// Errors from a clean-data request.
#[derive(Debug, Error)]
pub enum CleanError {
    /// The plan targets every record and was not confirmed.
    #[error("Confirmation required: {message}")]
    ConfirmationRequired {
        /// The message the user has to confirm.
        message: String,
    },

    /// Nothing matched the selection.
    #[error("No records match the selected filters")]
    NoMatchingRecords,

    /// The store failed.
    #[error(transparent)]
    Persistence(#[from] DbError),
}

/// A bulk delete built from a filter selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanPlan {
    filter: RecordFilter,
}

impl CleanPlan {
    /// Builds a plan. A date range without an end becomes a single day.
    #[must_use]
    pub fn new(filter: RecordFilter) -> Self {
        Self {
            filter: RecordFilter {
                date_range: filter.date_range.map(|range| range.closed()),
                ..filter
            },
        }
    }

    /// The filter the delete will use.
    #[must_use]
    pub const fn filter(&self) -> &RecordFilter {
        &self.filter
    }

    /// Whether the plan deletes the whole collection.
    #[must_use]
    pub const fn requires_confirmation(&self) -> bool {
        self.filter.is_unconstrained()
    }

    /// Describes exactly which records the plan deletes. Each dimension
    /// appears only when it is constrained.
    #[must_use]
    pub fn confirmation_message(&self) -> String {
        if self.filter.is_unconstrained() {
            return "This will permanently delete ALL records.".to_string();
        }

        let mut scope = Vec::new();
        if let Some(id) = self.filter.district_id {
            scope.push(format!("in district {}", district_name(id)));
        }
        if let Some(category) = self.filter.category {
            scope.push(format!("in category {}", category.label()));
        }
        if let Some(range) = self.filter.date_range {
            let last = range.last_day();
            if last == range.from {
                scope.push(format!("dated {}", range.from));
            } else {
                scope.push(format!("dated {} through {last}", range.from));
            }
        }

        format!(
            "This will permanently delete all records {}.",
            scope.join(", ")
        )
    }
}

/// What a clean would remove, shown before the user commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanPreview {
    /// Human-readable scope of the delete.
    pub message: String,
    /// Records currently matching.
    pub matching: u64,
    /// Whether the caller must pass explicit confirmation.
    pub requires_confirmation: bool,
}

/// Counts what `plan` would delete.
///
/// # Errors
///
/// Returns [`DbError`] if the count fails.
pub async fn preview(store: &dyn RecordStore, plan: &CleanPlan) -> Result<CleanPreview, DbError> {
    Ok(CleanPreview {
        message: plan.confirmation_message(),
        matching: store.count(plan.filter()).await?,
        requires_confirmation: plan.requires_confirmation(),
    })
}

/// Runs `plan` as one batch delete and returns the number removed.
///
/// # Errors
///
/// * [`CleanError::ConfirmationRequired`] for an unconfirmed
///   whole-collection delete
/// * [`CleanError::NoMatchingRecords`] when nothing matches
/// * [`CleanError::Persistence`] when the store fails
pub async fn execute(
    store: &dyn RecordStore,
    plan: &CleanPlan,
    confirmed: bool,
) -> Result<u64, CleanError> {
    if plan.requires_confirmation() && !confirmed {
        return Err(CleanError::ConfirmationRequired {
            message: plan.confirmation_message(),
        });
    }

    if store.count(plan.filter()).await? == 0 {
        return Err(CleanError::NoMatchingRecords);
    }

    log::info!("Cleaning data: {}", plan.confirmation_message());
    Ok(store.delete_many(plan.filter()).await?)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone as _, Utc};
    use police_perf_district_models::Category;
    use police_perf_record_models::{DateRange, NewPerformanceRecord};

    use super::*;
    use crate::MemoryRecordStore;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 5, d).unwrap()
    }

    async fn seeded() -> MemoryRecordStore {
        let store = MemoryRecordStore::new();
        let records: Vec<NewPerformanceRecord> = [
            (1, Category::Nbw, 1),
            (2, Category::Nbw, 15),
            (1, Category::Conviction, 15),
        ]
        .into_iter()
        .map(|(district_id, category, d)| NewPerformanceRecord {
            district_id,
            category,
            cases_registered: 5,
            cases_solved: 2,
            date: Utc.with_ymd_and_hms(2023, 5, d, 18, 0, 0).unwrap(),
        })
        .collect();
        store.insert_many(&records).await.unwrap();
        store
    }

    #[test]
    fn message_for_unfiltered_plan_mentions_all_records() {
        let plan = CleanPlan::new(RecordFilter::all());
        assert!(plan.requires_confirmation());
        assert!(plan.confirmation_message().contains("ALL records"));
    }

    #[test]
    fn message_lists_only_constrained_dimensions() {
        let plan = CleanPlan::new(RecordFilter {
            district_id: Some(1),
            category: Some(Category::Nbw),
            date_range: Some(DateRange::new(day(1), day(31))),
        });
        assert_eq!(
            plan.confirmation_message(),
            "This will permanently delete all records in district Ganjam, in category NBW Execution, dated 2023-05-01 through 2023-05-31."
        );

        let category_only = CleanPlan::new(RecordFilter {
            category: Some(Category::MissingPerson),
            ..RecordFilter::all()
        });
        let message = category_only.confirmation_message();
        assert!(message.contains("Missing Persons Traced"));
        assert!(!message.contains("district"));
        assert!(!message.contains("dated"));
        assert!(!category_only.requires_confirmation());
    }

    #[test]
    fn open_range_becomes_single_day() {
        let plan = CleanPlan::new(RecordFilter {
            date_range: Some(DateRange::single_day(day(15))),
            ..RecordFilter::all()
        });
        assert_eq!(plan.filter().date_range, Some(DateRange::new(day(15), day(15))));
        assert!(plan.confirmation_message().ends_with("dated 2023-05-15."));
    }

    #[tokio::test]
    async fn unconfirmed_full_wipe_is_refused() {
        let store = seeded().await;
        let plan = CleanPlan::new(RecordFilter::all());
        let err = execute(&store, &plan, false).await.unwrap_err();
        assert!(matches!(err, CleanError::ConfirmationRequired { .. }));
        assert_eq!(store.count(&RecordFilter::all()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn confirmed_full_wipe_deletes_everything() {
        let store = seeded().await;
        let plan = CleanPlan::new(RecordFilter::all());
        assert_eq!(execute(&store, &plan, true).await.unwrap(), 3);
        assert_eq!(store.count(&RecordFilter::all()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn single_day_delete_covers_whole_day() {
        let store = seeded().await;
        let plan = CleanPlan::new(RecordFilter {
            date_range: Some(DateRange::single_day(day(15))),
            ..RecordFilter::all()
        });
        let preview = preview(&store, &plan).await.unwrap();
        assert_eq!(preview.matching, 2);
        assert!(!preview.requires_confirmation);
        assert_eq!(execute(&store, &plan, false).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn no_match_is_reported() {
        let store = seeded().await;
        let plan = CleanPlan::new(RecordFilter {
            district_id: Some(6),
            ..RecordFilter::all()
        });
        assert!(matches!(
            execute(&store, &plan, true).await,
            Err(CleanError::NoMatchingRecords)
        ));
    }
}
