//! Subcommand implementations shared by the argument parser and the
//! interactive menu.

use std::fmt::Write as _;
use std::io::Read as _;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use dialoguer::Confirm;
use police_perf_ai::Reporter;
use police_perf_analytics::{DashboardStore, engine};
use police_perf_analytics_models::{DashboardView, LeaderboardEntry, format_rate};
use police_perf_config::AppConfig;
use police_perf_database::clean::{self, CleanPlan};
use police_perf_database::{RecordStore, SqliteRecordStore};
use police_perf_district_models::{Category, District};
use police_perf_export::{ExportFormat, write_export};
use police_perf_ingest::{IngestOptions, IngestOutcome, ManualEntry};
use police_perf_record_models::RecordFilter;
use police_perf_server_models::FilterParams;

use crate::FilterArgs;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Store and optional reporter for one command run.
pub struct Context {
    pub store: Box<dyn RecordStore>,
    pub reporter: Option<Reporter>,
}

impl Context {
    /// Opens the configured database. The reporter is built only when a
    /// provider is configured.
    pub async fn open(config: &AppConfig) -> CliResult<Self> {
        let store = match SqliteRecordStore::open(&config.database_path).await {
            Ok(store) => store,
            Err(e) => {
                log::error!(
                    "Failed to open database {}: {e}",
                    config.database_path.display()
                );
                return Err(e.into());
            }
        };
        Ok(Self {
            store: Box::new(store),
            reporter: police_perf_server::build_reporter(config),
        })
    }
}

/// Accepts a district id or name.
pub fn resolve_district(input: &str) -> Option<&'static District> {
    input
        .trim()
        .parse::<u32>()
        .ok()
        .and_then(District::by_id)
        .or_else(|| District::by_name(input))
}

impl FilterArgs {
    /// Validates the arguments and builds a filter.
    pub fn to_filter(&self) -> CliResult<RecordFilter> {
        let district_id = match self.district.as_deref() {
            None => None,
            Some(input) => Some(
                resolve_district(input)
                    .ok_or_else(|| format!("Unknown district {input:?}"))?
                    .id,
            ),
        };

        let params = FilterParams {
            district_id,
            category: self.category.clone(),
            from: self.from,
            to: self.to,
        };
        Ok(params.to_filter()?)
    }
}

/// Reads a text file, or stdin for `-`.
pub fn read_text_source(source: &str) -> CliResult<String> {
    if source == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        Ok(std::fs::read_to_string(source)?)
    }
}

fn print_outcome(outcome: &IngestOutcome) {
    println!("{outcome}");
    for skipped in &outcome.rejected {
        println!("  row {}: {}", skipped.row, skipped.reason);
    }
}

pub async fn upload(ctx: &Context, file: &Path, dry_run: bool) -> CliResult<()> {
    log::info!("Ingesting {}...", file.display());
    let outcome = match police_perf_ingest::ingest_path(
        ctx.store.as_ref(),
        ctx.reporter.as_ref(),
        file,
        IngestOptions { dry_run },
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            log::error!("Failed to ingest {}: {e}", file.display());
            return Err(e.into());
        }
    };
    print_outcome(&outcome);
    Ok(())
}

pub async fn text(ctx: &Context, text: &str, dry_run: bool) -> CliResult<()> {
    log::info!("Extracting records from {} characters of text...", text.len());
    let outcome = match police_perf_ingest::ingest_text(
        ctx.store.as_ref(),
        ctx.reporter.as_ref(),
        text,
        IngestOptions { dry_run },
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            log::error!("Text extraction failed: {e}");
            return Err(e.into());
        }
    };
    print_outcome(&outcome);
    Ok(())
}

pub async fn add(ctx: &Context, entry: &ManualEntry) -> CliResult<()> {
    let outcome =
        police_perf_ingest::ingest_manual(ctx.store.as_ref(), entry, IngestOptions::default())
            .await?;
    print_outcome(&outcome);
    Ok(())
}

/// Projects the stored records. Without dates the view spans every
/// record.
pub async fn dashboard_view(
    ctx: &Context,
    filter: RecordFilter,
    today: Option<NaiveDate>,
) -> CliResult<DashboardView> {
    let today = today.unwrap_or_else(|| Utc::now().date_naive());
    let records = ctx.store.query(&RecordFilter::all()).await?;

    let state = DashboardStore::with_clock(move || today);
    state.set_filter(filter);
    let view = state.replace_records(records);
    Ok(view.as_ref().clone())
}

pub async fn dashboard(
    ctx: &Context,
    filter: &FilterArgs,
    today: Option<NaiveDate>,
) -> CliResult<()> {
    let view = dashboard_view(ctx, filter.to_filter()?, today).await?;
    print!("{}", format_dashboard(&view));
    Ok(())
}

pub fn format_dashboard(view: &DashboardView) -> String {
    let mut out = String::new();

    if let Some(range) = view.filter.date_range {
        let _ = writeln!(out, "Period: {} to {}", range.from, range.last_day());
    }
    let _ = writeln!(
        out,
        "Records: {}  Registered: {}  Solved: {}  Solve rate: {}",
        view.totals.records,
        view.totals.cases_registered,
        view.totals.cases_solved,
        format_rate(view.totals.solve_rate)
    );

    let _ = writeln!(
        out,
        "\n{:<28} {:>10} {:>8} {:>8} {:>8}",
        "CATEGORY", "REGISTERED", "SOLVED", "RATE", "CHANGE"
    );
    for metric in view.metrics.iter().filter(|m| m.cases_registered > 0) {
        let _ = writeln!(
            out,
            "{:<28} {:>10} {:>8} {:>8} {:>+7.1}",
            metric.label,
            metric.cases_registered,
            metric.cases_solved,
            format_rate(metric.solve_rate),
            metric.change()
        );
    }

    let _ = writeln!(
        out,
        "\n{:<14} {:>10} {:>8} {:>8}",
        "DISTRICT", "REGISTERED", "SOLVED", "RATE"
    );
    for district in &view.districts {
        let _ = writeln!(
            out,
            "{:<14} {:>10} {:>8} {:>8}",
            district.name,
            district.cases_registered,
            district.cases_solved,
            format_rate(district.solve_rate)
        );
    }

    let _ = writeln!(
        out,
        "\n{:<10} {:>10} {:>8} {:>8}",
        "MONTH", "REGISTERED", "SOLVED", "RATE"
    );
    for bucket in &view.trend {
        let _ = writeln!(
            out,
            "{:<10} {:>10} {:>8} {:>8}",
            bucket.label,
            bucket.cases_registered,
            bucket.cases_solved,
            format_rate(bucket.solve_rate)
        );
    }

    out
}

pub async fn leaderboard(ctx: &Context) -> CliResult<()> {
    let records = ctx.store.query(&RecordFilter::all()).await?;
    print!("{}", format_leaderboard(&engine::leaderboard(&records)));
    Ok(())
}

pub fn format_leaderboard(entries: &[LeaderboardEntry]) -> String {
    let mut out = format!(
        "{:<6} {:<14} {:>10} {:>8} {:>8}\n",
        "RANK", "DISTRICT", "REGISTERED", "SOLVED", "RATE"
    );
    for entry in entries {
        let badge = entry
            .badge
            .map(|b| format!(" ({b})"))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "{:<6} {:<14} {:>10} {:>8} {:>8}{badge}",
            entry.rank,
            entry.name,
            entry.total_cases_registered,
            entry.total_cases_solved,
            format_rate(entry.solve_rate)
        );
    }
    out
}

/// Deletes matching records, asking first unless `yes` is set. Returns
/// the number deleted, or `None` when the user declined.
pub async fn clean_records(
    ctx: &Context,
    filter: RecordFilter,
    yes: bool,
) -> CliResult<Option<u64>> {
    let plan = CleanPlan::new(filter);
    let preview = clean::preview(ctx.store.as_ref(), &plan).await?;
    println!("{} ({} matching)", preview.message, preview.matching);

    if !yes
        && !Confirm::new()
            .with_prompt("Continue?")
            .default(false)
            .interact()?
    {
        return Ok(None);
    }

    let deleted = clean::execute(ctx.store.as_ref(), &plan, true).await?;
    log::info!("Clean removed {deleted} records");
    Ok(Some(deleted))
}

pub async fn clean(ctx: &Context, filter: &FilterArgs, yes: bool) -> CliResult<()> {
    match clean_records(ctx, filter.to_filter()?, yes).await? {
        Some(deleted) => println!("Deleted {deleted} records."),
        None => println!("Cancelled."),
    }
    Ok(())
}

pub async fn export(
    ctx: &Context,
    format: ExportFormat,
    filter: &FilterArgs,
    out_dir: &Path,
) -> CliResult<PathBuf> {
    let records = ctx.store.query(&filter.to_filter()?).await?;
    let path = match write_export(&records, format, out_dir) {
        Ok(path) => path,
        Err(e) => {
            log::error!("Failed to write {format} export to {}: {e}", out_dir.display());
            return Err(e.into());
        }
    };
    println!("Wrote {} records to {}", records.len(), path.display());
    Ok(path)
}

pub fn districts() {
    for district in District::all() {
        println!("{:>3}  {}", district.id, district.name);
    }
}

pub fn categories() {
    for category in Category::all() {
        println!("{:<22} {}", category.to_string(), category.label());
    }
}

/// Runs the API server on actix's own runtime.
pub async fn serve(config: AppConfig) -> CliResult<()> {
    tokio::task::spawn_blocking(move || {
        actix_web::rt::System::new().block_on(police_perf_server::run_server(config))
    })
    .await??;
    Ok(())
}
