#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line interface for police performance analytics.
//!
//! Every operation is available as a subcommand (`police_perf upload`,
//! `police_perf dashboard`, ...). Run without a subcommand to pick an
//! action from an interactive menu instead.

mod commands;
mod interactive;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use police_perf_config::AppConfig;
use police_perf_export::ExportFormat;

#[derive(Parser)]
#[command(name = "police_perf", about = "District police performance analytics")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// District, category, and date filters shared by several commands.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// District name or id
    #[arg(long)]
    pub district: Option<String>,
    /// Category value or label (e.g. "NBW" or "NBW Execution")
    #[arg(long)]
    pub category: Option<String>,
    /// First day, YYYY-MM-DD
    #[arg(long)]
    pub from: Option<NaiveDate>,
    /// Last day, YYYY-MM-DD (defaults to --from)
    #[arg(long)]
    pub to: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a spreadsheet (.xlsx, .xls, .ods, .csv) or PDF report
    Upload {
        /// File to ingest
        file: PathBuf,
        /// Validate without saving
        #[arg(long)]
        dry_run: bool,
    },
    /// Extract records from free text with the AI provider
    Text {
        /// Text file to read, or "-" for stdin
        file: String,
        /// Validate without saving
        #[arg(long)]
        dry_run: bool,
    },
    /// Add a single record
    Add {
        /// District name or id
        #[arg(long)]
        district: String,
        /// Category value or label
        #[arg(long)]
        category: String,
        /// Cases registered
        #[arg(long)]
        registered: u64,
        /// Cases solved
        #[arg(long)]
        solved: u64,
        /// Record date
        #[arg(long)]
        date: String,
    },
    /// Show KPIs, district comparison, and the monthly trend
    Dashboard {
        #[command(flatten)]
        filter: FilterArgs,
        /// Reference day for the six-month trend (defaults to today)
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Rank districts by cases solved
    Leaderboard,
    /// Delete records matching the filters
    Clean {
        #[command(flatten)]
        filter: FilterArgs,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Export records as xlsx, csv, or pdf
    Export {
        /// Output format
        format: ExportFormat,
        #[command(flatten)]
        filter: FilterArgs,
        /// Directory to write into
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// List districts
    Districts,
    /// List categories
    Categories,
    /// Start the API server
    Serve,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();
    let config = AppConfig::load()?;

    let Some(command) = cli.command else {
        return interactive::run(config).await;
    };

    match command {
        Commands::Districts => commands::districts(),
        Commands::Categories => commands::categories(),
        Commands::Serve => commands::serve(config).await?,
        Commands::Upload { file, dry_run } => {
            let ctx = commands::Context::open(&config).await?;
            commands::upload(&ctx, &file, dry_run).await?;
        }
        Commands::Text { file, dry_run } => {
            let ctx = commands::Context::open(&config).await?;
            let text = commands::read_text_source(&file)?;
            commands::text(&ctx, &text, dry_run).await?;
        }
        Commands::Add {
            district,
            category,
            registered,
            solved,
            date,
        } => {
            let ctx = commands::Context::open(&config).await?;
            let entry = police_perf_ingest::ManualEntry {
                district,
                category,
                cases_registered: registered,
                cases_solved: solved,
                date,
            };
            commands::add(&ctx, &entry).await?;
        }
        Commands::Dashboard { filter, today } => {
            let ctx = commands::Context::open(&config).await?;
            commands::dashboard(&ctx, &filter, today).await?;
        }
        Commands::Leaderboard => {
            let ctx = commands::Context::open(&config).await?;
            commands::leaderboard(&ctx).await?;
        }
        Commands::Clean { filter, yes } => {
            let ctx = commands::Context::open(&config).await?;
            commands::clean(&ctx, &filter, yes).await?;
        }
        Commands::Export {
            format,
            filter,
            out_dir,
        } => {
            let ctx = commands::Context::open(&config).await?;
            commands::export(&ctx, format, &filter, &out_dir).await?;
        }
    }

    Ok(())
}
