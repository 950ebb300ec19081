//! Interactive menu shown when no subcommand is given.

use std::path::PathBuf;

use chrono::NaiveDate;
use dialoguer::{Confirm, Input, Select};
use police_perf_config::AppConfig;
use police_perf_district_models::{Category, District};
use police_perf_export::ExportFormat;
use police_perf_ingest::ManualEntry;

use crate::FilterArgs;
use crate::commands::{self, Context};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

enum Action {
    Dashboard,
    Leaderboard,
    Upload,
    Text,
    Add,
    Clean,
    Export,
    Serve,
}

impl Action {
    const ALL: &[Self] = &[
        Self::Dashboard,
        Self::Leaderboard,
        Self::Upload,
        Self::Text,
        Self::Add,
        Self::Clean,
        Self::Export,
        Self::Serve,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Dashboard => "Show dashboard",
            Self::Leaderboard => "Show leaderboard",
            Self::Upload => "Upload a spreadsheet or PDF",
            Self::Text => "Extract records from text",
            Self::Add => "Add a record",
            Self::Clean => "Clean records",
            Self::Export => "Export records",
            Self::Serve => "Start API server",
        }
    }
}

fn select_district(prompt: &str, allow_all: bool) -> CliResult<Option<String>> {
    let mut labels: Vec<&str> = Vec::new();
    if allow_all {
        labels.push("All districts");
    }
    labels.extend(District::all().iter().map(|d| d.name));

    let idx = Select::new()
        .with_prompt(prompt)
        .items(&labels)
        .default(0)
        .interact()?;
    Ok((!allow_all || idx > 0).then(|| labels[idx].to_string()))
}

fn select_category(prompt: &str, allow_all: bool) -> CliResult<Option<String>> {
    let mut labels: Vec<&str> = Vec::new();
    if allow_all {
        labels.push("All categories");
    }
    labels.extend(Category::all().iter().map(|c| c.label()));

    let idx = Select::new()
        .with_prompt(prompt)
        .items(&labels)
        .default(0)
        .interact()?;
    Ok((!allow_all || idx > 0).then(|| labels[idx].to_string()))
}

fn optional_date(prompt: &str) -> CliResult<Option<NaiveDate>> {
    let input: String = Input::new()
        .with_prompt(format!("{prompt} (YYYY-MM-DD, blank for none)"))
        .allow_empty(true)
        .interact_text()?;
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    Ok(Some(input.parse()?))
}

fn prompt_filter() -> CliResult<FilterArgs> {
    Ok(FilterArgs {
        district: select_district("District", true)?,
        category: select_category("Category", true)?,
        from: optional_date("From")?,
        to: optional_date("To")?,
    })
}

fn prompt_entry() -> CliResult<ManualEntry> {
    let district = select_district("District", false)?.unwrap_or_default();
    let category = select_category("Category", false)?.unwrap_or_default();
    let cases_registered: u64 = Input::new().with_prompt("Cases registered").interact_text()?;
    let cases_solved: u64 = Input::new().with_prompt("Cases solved").interact_text()?;
    let date: String = Input::new()
        .with_prompt("Date (YYYY-MM-DD)")
        .interact_text()?;
    Ok(ManualEntry {
        district,
        category,
        cases_registered,
        cases_solved,
        date,
    })
}

/// Shows the action menu and runs the selected action.
pub async fn run(config: AppConfig) -> CliResult<()> {
    println!("Police Performance Analytics");
    println!();

    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();
    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    let ctx = Context::open(&config).await?;
    match Action::ALL[idx] {
        Action::Dashboard => {
            let filter = prompt_filter()?;
            commands::dashboard(&ctx, &filter, None).await?;
        }
        Action::Leaderboard => commands::leaderboard(&ctx).await?,
        Action::Upload => {
            let path: String = Input::new().with_prompt("File path").interact_text()?;
            let dry_run = Confirm::new()
                .with_prompt("Dry run (validate only)?")
                .default(false)
                .interact()?;
            commands::upload(&ctx, &PathBuf::from(path), dry_run).await?;
        }
        Action::Text => {
            let path: String = Input::new()
                .with_prompt("Text file path (- for stdin)")
                .interact_text()?;
            let text = commands::read_text_source(&path)?;
            commands::text(&ctx, &text, false).await?;
        }
        Action::Add => commands::add(&ctx, &prompt_entry()?).await?,
        Action::Clean => {
            let filter = prompt_filter()?;
            commands::clean(&ctx, &filter, false).await?;
        }
        Action::Export => {
            let formats: Vec<String> = ExportFormat::all()
                .iter()
                .map(ToString::to_string)
                .collect();
            let choice = Select::new()
                .with_prompt("Format")
                .items(&formats)
                .default(0)
                .interact()?;
            let filter = prompt_filter()?;
            let dir: String = Input::new()
                .with_prompt("Output directory")
                .default(".".to_string())
                .interact_text()?;
            let format = ExportFormat::all()[choice];
            commands::export(&ctx, format, &filter, &PathBuf::from(dir)).await?;
        }
        Action::Serve => {
            drop(ctx);
            serve(config).await?;
        }
    }

    Ok(())
}

async fn serve(config: AppConfig) -> CliResult<()> {
    tokio::task::spawn_blocking(move || {
        actix_web::rt::System::new().block_on(police_perf_server::interactive::run(config))
    })
    .await??;
    Ok(())
}
