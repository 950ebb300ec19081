//! Pure aggregation over in-memory record sets.
//!
//! Every function here is deterministic in its arguments: the same records,
//! filter, and reference date always produce the same output, and empty
//! input yields zero-valued views rather than errors.

use chrono::{Datelike as _, NaiveDate, TimeDelta};
use police_perf_analytics_models::{
    CategoryScore, DashboardView, DistrictComparison, LeaderboardEntry, PerformanceMetric,
    RankBadge, Totals, TrendBucket, solve_rate,
};
use police_perf_district_models::{Category, District};
use police_perf_record_models::{DateRange, PerformanceRecord, RecordFilter};

/// Number of months in the trend window, including the current month.
pub const TREND_MONTHS: i32 = 6;

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, Copy, Default)]
struct Counts {
    registered: u64,
    solved: u64,
}

impl Counts {
    const fn add(&mut self, record: &PerformanceRecord) {
        self.registered += record.cases_registered;
        self.solved += record.cases_solved;
    }

    fn rate(self) -> f64 {
        solve_rate(self.registered, self.solved)
    }
}

/// Records passing every constrained dimension of `filter`.
#[must_use]
pub fn filter_records<'a>(
    records: &'a [PerformanceRecord],
    filter: &RecordFilter,
) -> Vec<&'a PerformanceRecord> {
    records.iter().filter(|r| filter.matches(r)).collect()
}

fn first_of_month(day: NaiveDate) -> NaiveDate {
    day - TimeDelta::days(i64::from(day.day0()))
}

/// The full calendar month before the month containing `range.from`.
#[must_use]
pub fn previous_period(range: &DateRange) -> DateRange {
    let month_start = first_of_month(range.from);
    let previous_end = month_start - TimeDelta::days(1);
    DateRange::new(first_of_month(previous_end), previous_end)
}

/// One KPI per category for the filtered set and the previous period.
///
/// The previous period uses the same district and category selection.
/// Without a date range there is no previous period and every
/// `previous_solve_rate` is zero.
#[must_use]
pub fn compute_metrics(
    records: &[PerformanceRecord],
    filter: &RecordFilter,
) -> Vec<PerformanceMetric> {
    let previous_filter = filter.date_range.as_ref().map(|range| RecordFilter {
        date_range: Some(previous_period(range)),
        ..*filter
    });

    let mut current = [Counts::default(); Category::all().len()];
    let mut previous = [Counts::default(); Category::all().len()];

    for record in records {
        let index = category_index(record.category);
        if filter.matches(record) {
            current[index].add(record);
        }
        if previous_filter.is_some_and(|f| f.matches(record)) {
            previous[index].add(record);
        }
    }

    Category::all()
        .iter()
        .enumerate()
        .map(|(i, category)| PerformanceMetric {
            category: *category,
            label: category.label().to_string(),
            cases_registered: current[i].registered,
            cases_solved: current[i].solved,
            solve_rate: current[i].rate(),
            previous_solve_rate: previous[i].rate(),
        })
        .collect()
}

fn category_index(category: Category) -> usize {
    Category::all()
        .iter()
        .position(|c| *c == category)
        .unwrap_or(Category::all().len() - 1)
}

/// Per-district totals over the filtered set, every known district
/// included.
#[must_use]
pub fn compare_districts(
    records: &[PerformanceRecord],
    filter: &RecordFilter,
) -> Vec<DistrictComparison> {
    let per_district = district_counts(records.iter().filter(|r| filter.matches(r)));

    District::all()
        .iter()
        .zip(per_district)
        .map(|(district, counts)| DistrictComparison {
            district_id: district.id,
            name: district.name.to_string(),
            cases_registered: counts.registered,
            cases_solved: counts.solved,
            solve_rate: counts.rate(),
        })
        .collect()
}

fn district_counts<'a>(records: impl Iterator<Item = &'a PerformanceRecord>) -> Vec<Counts> {
    let districts = District::all();
    let mut counts = vec![Counts::default(); districts.len()];
    for record in records {
        match districts.iter().position(|d| d.id == record.district_id) {
            Some(index) => counts[index].add(record),
            None => log::debug!(
                "Ignoring record {} with unknown district {}",
                record.id,
                record.district_id
            ),
        }
    }
    counts
}

/// Monthly totals for the six months ending with the month of `today`,
/// oldest first.
///
/// Records are selected by district and category; the window replaces any
/// date range on the filter.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn monthly_trend(
    records: &[PerformanceRecord],
    filter: &RecordFilter,
    today: NaiveDate,
) -> Vec<TrendBucket> {
    let filter = filter.without_dates();
    let current_index = month_index(today.year(), today.month0());
    let first_index = current_index - (TREND_MONTHS - 1);

    let mut buckets = vec![Counts::default(); TREND_MONTHS as usize];
    for record in records.iter().filter(|r| filter.matches(r)) {
        let index = month_index(record.date.year(), record.date.month0());
        if (first_index..=current_index).contains(&index) {
            buckets[(index - first_index) as usize].add(record);
        }
    }

    buckets
        .into_iter()
        .zip(first_index..)
        .map(|(counts, index)| {
            let year = index.div_euclid(12);
            let month0 = index.rem_euclid(12) as usize;
            TrendBucket {
                month: format!("{year:04}-{:02}", month0 + 1),
                label: format!("{} {year}", MONTH_ABBREVIATIONS[month0]),
                cases_registered: counts.registered,
                cases_solved: counts.solved,
                solve_rate: counts.rate(),
            }
        })
        .collect()
}

#[allow(clippy::cast_possible_wrap)]
const fn month_index(year: i32, month0: u32) -> i32 {
    year * 12 + month0 as i32
}

/// Ranks every known district by total cases solved across all records.
///
/// Ties keep district reference order.
#[must_use]
pub fn leaderboard(records: &[PerformanceRecord]) -> Vec<LeaderboardEntry> {
    let per_district = district_counts(records.iter());

    let mut entries: Vec<LeaderboardEntry> = District::all()
        .iter()
        .zip(per_district)
        .map(|(district, counts)| LeaderboardEntry {
            rank: 0,
            district_id: district.id,
            name: district.name.to_string(),
            total_cases_registered: counts.registered,
            total_cases_solved: counts.solved,
            solve_rate: counts.rate(),
            overall_score: counts.solved,
            badge: None,
        })
        .collect();

    entries.sort_by(|a, b| b.overall_score.cmp(&a.overall_score));

    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i + 1;
        entry.badge = RankBadge::for_rank(entry.rank);
    }

    entries
}

/// The `limit` lowest-solve-rate categories a district has records in.
///
/// Ties keep category display order.
#[must_use]
pub fn worst_categories(
    records: &[PerformanceRecord],
    district_id: u32,
    limit: usize,
) -> Vec<CategoryScore> {
    let mut counts: Vec<Option<Counts>> = vec![None; Category::all().len()];
    for record in records.iter().filter(|r| r.district_id == district_id) {
        counts[category_index(record.category)]
            .get_or_insert_with(Counts::default)
            .add(record);
    }

    let mut scores: Vec<CategoryScore> = Category::all()
        .iter()
        .zip(counts)
        .filter_map(|(category, counts)| {
            counts.map(|c| CategoryScore {
                category: *category,
                label: category.label().to_string(),
                cases_registered: c.registered,
                cases_solved: c.solved,
                solve_rate: c.rate(),
            })
        })
        .collect();

    scores.sort_by(|a, b| a.solve_rate.total_cmp(&b.solve_rate));
    scores.truncate(limit);
    scores
}

/// Earliest to latest record day, if there are records.
#[must_use]
pub fn default_date_range(records: &[PerformanceRecord]) -> Option<DateRange> {
    let first = records.iter().map(|r| r.date).min()?;
    let last = records.iter().map(|r| r.date).max()?;
    Some(DateRange::new(first.date_naive(), last.date_naive()))
}

/// Sums over the filtered set.
#[must_use]
pub fn totals(records: &[PerformanceRecord], filter: &RecordFilter) -> Totals {
    let mut counts = Counts::default();
    let mut matched = 0;
    for record in records.iter().filter(|r| filter.matches(r)) {
        counts.add(record);
        matched += 1;
    }
    Totals {
        records: matched,
        cases_registered: counts.registered,
        cases_solved: counts.solved,
        solve_rate: counts.rate(),
    }
}

/// Computes every dashboard view for one filter selection.
#[must_use]
pub fn project(
    records: &[PerformanceRecord],
    filter: &RecordFilter,
    today: NaiveDate,
) -> DashboardView {
    DashboardView {
        filter: *filter,
        metrics: compute_metrics(records, filter),
        districts: compare_districts(records, filter),
        trend: monthly_trend(records, filter, today),
        leaderboard: leaderboard(records),
        totals: totals(records, filter),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone as _, Utc};
    use police_perf_record_models::NewPerformanceRecord;

    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 30, 0).unwrap()
    }

    fn record(
        id: &str,
        district_id: u32,
        category: Category,
        registered: u64,
        solved: u64,
        date: DateTime<Utc>,
    ) -> PerformanceRecord {
        NewPerformanceRecord {
            district_id,
            category,
            cases_registered: registered,
            cases_solved: solved,
            date,
        }
        .with_id(id)
    }

    fn sample() -> Vec<PerformanceRecord> {
        vec![
            record("a", 1, Category::Nbw, 120, 80, at(2023, 5, 15)),
            record("b", 1, Category::Nbw, 50, 20, at(2023, 4, 10)),
            record("c", 2, Category::Conviction, 40, 35, at(2023, 5, 20)),
            record("d", 3, Category::Nbw, 10, 10, at(2023, 5, 31)),
            record("e", 4, Category::Cybercrime, 30, 3, at(2023, 1, 5)),
            record("f", 4, Category::Narcotics, 8, 7, at(2023, 2, 5)),
        ]
    }

    #[test]
    fn ganjam_nbw_scenario() {
        let records = vec![record("a", 1, Category::Nbw, 120, 80, at(2023, 5, 15))];
        let filter = RecordFilter {
            district_id: Some(1),
            category: Some(Category::Nbw),
            date_range: None,
        };
        let metrics = compute_metrics(&records, &filter);
        let nbw = metrics.iter().find(|m| m.category == Category::Nbw).unwrap();
        assert_eq!(nbw.cases_registered, 120);
        assert_eq!(nbw.cases_solved, 80);
        assert!((nbw.solve_rate - 66.7).abs() < 0.05);
        assert_eq!(metrics.len(), Category::all().len());
    }

    #[test]
    fn metrics_compare_against_previous_calendar_month() {
        let filter = RecordFilter {
            district_id: Some(1),
            category: None,
            date_range: Some(DateRange::new(day(2023, 5, 1), day(2023, 5, 31))),
        };
        let metrics = compute_metrics(&sample(), &filter);
        let nbw = &metrics[0];
        assert_eq!(nbw.category, Category::Nbw);
        assert_eq!(nbw.cases_registered, 120);
        assert!((nbw.previous_solve_rate - 40.0).abs() < f64::EPSILON);
        assert!((nbw.change() - (80.0 / 120.0 * 100.0 - 40.0)).abs() < 1e-9);
    }

    #[test]
    fn previous_period_spans_full_prior_month() {
        let range = DateRange::new(day(2023, 3, 15), day(2023, 3, 20));
        assert_eq!(
            previous_period(&range),
            DateRange::new(day(2023, 2, 1), day(2023, 2, 28))
        );
        let january = DateRange::single_day(day(2024, 1, 10));
        assert_eq!(
            previous_period(&january),
            DateRange::new(day(2023, 12, 1), day(2023, 12, 31))
        );
    }

    #[test]
    fn empty_input_degrades_to_zeros() {
        let view = project(&[], &RecordFilter::all(), day(2023, 5, 1));
        assert_eq!(view.metrics.len(), Category::all().len());
        assert!(view.metrics.iter().all(|m| m.cases_registered == 0 && m.solve_rate.abs() < f64::EPSILON));
        assert_eq!(view.districts.len(), District::all().len());
        assert_eq!(view.trend.len(), 6);
        assert_eq!(view.leaderboard.len(), District::all().len());
        assert_eq!(view.totals, Totals::default());
    }

    #[test]
    fn district_comparison_conserves_totals() {
        let records = sample();
        let filters = [
            RecordFilter::all(),
            RecordFilter {
                category: Some(Category::Nbw),
                ..RecordFilter::all()
            },
            RecordFilter {
                district_id: Some(4),
                ..RecordFilter::all()
            },
            RecordFilter {
                date_range: Some(DateRange::new(day(2023, 5, 1), day(2023, 5, 31))),
                ..RecordFilter::all()
            },
        ];
        for filter in &filters {
            let per_district: u64 = compare_districts(&records, filter)
                .iter()
                .map(|d| d.cases_registered)
                .sum();
            let filtered: u64 = filter_records(&records, filter)
                .iter()
                .map(|r| r.cases_registered)
                .sum();
            assert_eq!(per_district, filtered, "{filter:?}");
        }
    }

    #[test]
    fn district_comparison_seeds_every_district() {
        let filter = RecordFilter {
            district_id: Some(2),
            ..RecordFilter::all()
        };
        let districts = compare_districts(&sample(), &filter);
        assert_eq!(districts.len(), District::all().len());
        assert_eq!(districts[0].cases_registered, 0);
        assert_eq!(districts[1].cases_registered, 40);
        assert_eq!(districts[5].name, "Rourkela");
    }

    #[test]
    fn trend_fills_gaps_with_zero_months() {
        let records = vec![
            record("x", 1, Category::Nbw, 10, 5, at(2023, 1, 3)),
            record("y", 1, Category::Nbw, 20, 10, at(2023, 6, 28)),
        ];
        let trend = monthly_trend(&records, &RecordFilter::all(), day(2023, 6, 30));
        assert_eq!(trend.len(), 6);
        assert_eq!(trend[0].month, "2023-01");
        assert_eq!(trend[0].label, "Jan 2023");
        assert_eq!(trend[0].cases_registered, 10);
        for bucket in &trend[1..5] {
            assert_eq!(bucket.cases_registered, 0);
            assert_eq!(bucket.cases_solved, 0);
        }
        assert_eq!(trend[5].month, "2023-06");
        assert_eq!(trend[5].cases_solved, 10);
    }

    #[test]
    fn trend_window_crosses_year_boundary() {
        let trend = monthly_trend(&[], &RecordFilter::all(), day(2024, 2, 10));
        let months: Vec<&str> = trend.iter().map(|b| b.month.as_str()).collect();
        assert_eq!(
            months,
            ["2023-09", "2023-10", "2023-11", "2023-12", "2024-01", "2024-02"]
        );
    }

    #[test]
    fn trend_ignores_the_date_range() {
        let filter = RecordFilter {
            district_id: Some(1),
            category: None,
            date_range: Some(DateRange::single_day(day(2023, 5, 15))),
        };
        let trend = monthly_trend(&sample(), &filter, day(2023, 5, 31));
        assert_eq!(trend[4].cases_registered, 50);
        assert_eq!(trend[5].cases_registered, 120);
    }

    #[test]
    fn leaderboard_is_sorted_and_badged() {
        let board = leaderboard(&sample());
        for pair in board.windows(2) {
            assert!(pair[0].overall_score >= pair[1].overall_score);
        }
        assert_eq!(board[0].district_id, 1);
        assert_eq!(board[0].overall_score, 100);
        assert_eq!(board[0].badge, Some(RankBadge::Gold));
        assert_eq!(board[2].badge, Some(RankBadge::Bronze));
        assert_eq!(board[3].badge, None);
        assert!(board[3].eligible_for_suggestions());
    }

    #[test]
    fn leaderboard_ties_keep_reference_order() {
        let board = leaderboard(&[]);
        let ids: Vec<u32> = board.iter().map(|e| e.district_id).collect();
        assert_eq!(ids, [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn worst_categories_pick_lowest_rates() {
        let mut records = sample();
        records.push(record("g", 4, Category::Firearms, 10, 5, at(2023, 3, 1)));
        records.push(record("h", 4, Category::Others, 4, 4, at(2023, 3, 1)));
        let worst = worst_categories(&records, 4, 3);
        let categories: Vec<Category> = worst.iter().map(|c| c.category).collect();
        assert_eq!(
            categories,
            [Category::Cybercrime, Category::Firearms, Category::Narcotics]
        );
    }

    #[test]
    fn default_range_spans_record_days() {
        assert_eq!(
            default_date_range(&sample()),
            Some(DateRange::new(day(2023, 1, 5), day(2023, 5, 31)))
        );
        assert_eq!(default_date_range(&[]), None);
    }

    #[test]
    fn projection_is_idempotent() {
        let records = sample();
        let filter = RecordFilter {
            category: Some(Category::Nbw),
            ..RecordFilter::all()
        };
        let a = project(&records, &filter, day(2023, 5, 31));
        let b = project(&records, &filter, day(2023, 5, 31));
        assert_eq!(a, b);
    }
}
