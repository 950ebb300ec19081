//! Observable dashboard state.
//!
//! [`DashboardStore`] owns the current filter selection and record set.
//! Every transition recomputes the [`DashboardView`] through
//! [`crate::engine::project`] and publishes it on a watch channel, so
//! consumers subscribe to views instead of re-deriving them.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{NaiveDate, Utc};
use police_perf_analytics_models::DashboardView;
use police_perf_record_models::{PerformanceRecord, RecordFilter};
use tokio::sync::watch;

use crate::{
    engine,
    sequence::{RequestSequencer, Ticket},
};

type Clock = Box<dyn Fn() -> NaiveDate + Send + Sync>;

#[derive(Debug, Default)]
struct State {
    filter: RecordFilter,
    records: Arc<Vec<PerformanceRecord>>,
    loaded: bool,
}

/// Filter selection plus records, with a published projection.
pub struct DashboardStore {
    state: Mutex<State>,
    tx: watch::Sender<Arc<DashboardView>>,
    reloads: RequestSequencer,
    clock: Clock,
}

impl std::fmt::Debug for DashboardStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardStore")
            .field("state", &self.state)
            .field("reloads", &self.reloads)
            .finish_non_exhaustive()
    }
}

impl Default for DashboardStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardStore {
    /// Creates an empty store using today's UTC date for the trend window.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(|| Utc::now().date_naive())
    }

    /// Creates an empty store with a custom reference-date source.
    #[must_use]
    pub fn with_clock(clock: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        let clock: Clock = Box::new(clock);
        let initial = engine::project(&[], &RecordFilter::all(), clock());
        let (tx, _) = watch::channel(Arc::new(initial));
        Self {
            state: Mutex::new(State::default()),
            tx,
            reloads: RequestSequencer::new(),
            clock,
        }
    }

    /// Receives every view published from now on.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<DashboardView>> {
        self.tx.subscribe()
    }

    /// The most recently published view.
    #[must_use]
    pub fn current(&self) -> Arc<DashboardView> {
        self.tx.borrow().clone()
    }

    /// The current filter selection.
    #[must_use]
    pub fn filter(&self) -> RecordFilter {
        self.lock().filter
    }

    /// Shared handle to the current record set.
    #[must_use]
    pub fn records(&self) -> Arc<Vec<PerformanceRecord>> {
        self.lock().records.clone()
    }

    /// Replaces the filter selection and republishes.
    pub fn set_filter(&self, filter: RecordFilter) -> Arc<DashboardView> {
        let mut state = self.lock();
        state.filter = filter;
        self.publish(&state)
    }

    /// Drops every filter dimension and republishes.
    pub fn clear_filter(&self) -> Arc<DashboardView> {
        self.set_filter(RecordFilter::all())
    }

    /// Replaces the record set and republishes.
    ///
    /// The first non-empty load with no date range selected adopts the
    /// span of the loaded records as the date range.
    pub fn replace_records(&self, records: Vec<PerformanceRecord>) -> Arc<DashboardView> {
        let mut state = self.lock();
        self.apply_records(&mut state, records)
    }

    /// Marks the start of a record reload. Only the latest reload's result
    /// is applied by [`Self::finish_reload`].
    pub fn begin_reload(&self) -> Ticket {
        self.reloads.issue()
    }

    /// Applies reloaded records if `ticket` is still the latest reload.
    /// Returns the new view, or `None` when the result was stale.
    pub fn finish_reload(
        &self,
        ticket: Ticket,
        records: Vec<PerformanceRecord>,
    ) -> Option<Arc<DashboardView>> {
        let mut state = self.lock();
        let records = self.reloads.accept(ticket, records)?;
        Some(self.apply_records(&mut state, records))
    }

    /// Projects the current records under an ad hoc filter without
    /// changing the stored selection.
    #[must_use]
    pub fn view_for(&self, filter: &RecordFilter) -> DashboardView {
        let records = self.records();
        engine::project(&records, filter, (self.clock)())
    }

    fn apply_records(
        &self,
        state: &mut State,
        records: Vec<PerformanceRecord>,
    ) -> Arc<DashboardView> {
        if !state.loaded && state.filter.date_range.is_none() {
            state.filter.date_range = engine::default_date_range(&records);
            state.loaded = state.filter.date_range.is_some();
        } else {
            state.loaded = true;
        }
        state.records = Arc::new(records);
        self.publish(state)
    }

    fn publish(&self, state: &State) -> Arc<DashboardView> {
        let view = Arc::new(engine::project(
            &state.records,
            &state.filter,
            (self.clock)(),
        ));
        self.tx.send_replace(view.clone());
        view
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone as _, Utc};
    use police_perf_district_models::Category;
    use police_perf_record_models::{DateRange, NewPerformanceRecord};

    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn store() -> DashboardStore {
        DashboardStore::with_clock(|| NaiveDate::from_ymd_opt(2023, 6, 15).unwrap())
    }

    fn record(id: &str, district_id: u32, solved: u64, m: u32, d: u32) -> PerformanceRecord {
        NewPerformanceRecord {
            district_id,
            category: Category::Nbw,
            cases_registered: 100,
            cases_solved: solved,
            date: Utc.with_ymd_and_hms(2023, m, d, 12, 0, 0).unwrap(),
        }
        .with_id(id)
    }

    #[test]
    fn first_load_adopts_record_span() {
        let store = store();
        store.replace_records(vec![record("a", 1, 50, 2, 3), record("b", 2, 60, 5, 20)]);
        assert_eq!(
            store.filter().date_range,
            Some(DateRange::new(day(2023, 2, 3), day(2023, 5, 20)))
        );
        assert_eq!(store.current().totals.records, 2);
    }

    #[test]
    fn empty_first_load_defers_range_adoption() {
        let store = store();
        store.replace_records(Vec::new());
        assert_eq!(store.filter().date_range, None);

        store.replace_records(vec![record("a", 1, 50, 5, 15)]);
        assert_eq!(
            store.filter().date_range,
            Some(DateRange::new(day(2023, 5, 15), day(2023, 5, 15)))
        );
    }

    #[test]
    fn reload_started_during_apply_still_wins() {
        let store = Arc::new(store());
        let first = store.begin_reload();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let ticket = store.begin_reload();
                    store.finish_reload(ticket, vec![record(&format!("new{i}"), 1, 10, 6, 1)]);
                })
            })
            .collect();
        store.finish_reload(first, vec![record("old", 1, 90, 6, 1)]);
        for handle in handles {
            handle.join().unwrap();
        }

        assert_ne!(store.records()[0].id, "old");
    }

    #[test]
    fn later_loads_keep_the_selection() {
        let store = store();
        store.replace_records(vec![record("a", 1, 50, 2, 3)]);
        store.clear_filter();
        store.replace_records(vec![record("a", 1, 50, 2, 3), record("b", 2, 60, 5, 20)]);
        assert_eq!(store.filter().date_range, None);
    }

    #[tokio::test]
    async fn subscribers_see_every_transition() {
        let store = store();
        let mut rx = store.subscribe();

        store.replace_records(vec![record("a", 1, 50, 5, 1), record("b", 2, 70, 5, 2)]);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().totals.cases_solved, 120);

        store.set_filter(RecordFilter {
            district_id: Some(2),
            ..store.filter()
        });
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().totals.cases_solved, 70);
    }

    #[test]
    fn stale_reload_is_discarded() {
        let store = store();
        let first = store.begin_reload();
        let second = store.begin_reload();
        assert!(
            store
                .finish_reload(second, vec![record("new", 1, 10, 6, 1)])
                .is_some()
        );
        assert!(
            store
                .finish_reload(first, vec![record("old", 1, 90, 6, 1)])
                .is_none()
        );
        assert_eq!(store.records()[0].id, "new");
    }

    #[test]
    fn ad_hoc_view_leaves_selection_alone() {
        let store = store();
        store.replace_records(vec![record("a", 1, 50, 6, 1), record("b", 3, 20, 6, 2)]);
        let selection = store.filter();
        let view = store.view_for(&RecordFilter {
            district_id: Some(3),
            ..RecordFilter::all()
        });
        assert_eq!(view.totals.cases_solved, 20);
        assert_eq!(store.filter(), selection);
    }
}
