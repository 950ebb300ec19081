#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for police performance analytics.
//!
//! Serves the JSON API under `/api`: record queries and ingestion, the
//! dashboard projection and leaderboard, data cleaning, exports, and the
//! AI-backed summary, translation, speech, and suggestion endpoints.
//! Records live in a `SQLite` file; the dashboard keeps an in-memory copy
//! that is reloaded after every ingestion or clean.

mod handlers;
pub mod interactive;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use police_perf_ai::Reporter;
use police_perf_analytics::{DashboardStore, RequestSequencer};
use police_perf_config::AppConfig;
use police_perf_database::{DbError, RecordStore, SqliteRecordStore};
use police_perf_record_models::RecordFilter;
use thiserror::Error;

/// Largest accepted upload or JSON body, in bytes.
pub const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Errors that can stop the server from starting.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The records database could not be opened or loaded.
    #[error(transparent)]
    Database(#[from] DbError),

    /// Binding or serving failed.
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared application state.
pub struct AppState {
    /// Persisted records.
    pub store: Arc<dyn RecordStore>,
    /// In-memory records plus the published dashboard view.
    pub dashboard: DashboardStore,
    /// AI collaborator, when a provider is configured.
    pub reporter: Option<Reporter>,
    /// Orders summary requests so only the latest result is returned.
    pub summaries: RequestSequencer,
}

impl AppState {
    /// Creates the state and loads every stored record into the dashboard.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the initial load fails.
    pub async fn new(
        store: Arc<dyn RecordStore>,
        reporter: Option<Reporter>,
    ) -> Result<Self, DbError> {
        let state = Self {
            store,
            dashboard: DashboardStore::new(),
            reporter,
            summaries: RequestSequencer::new(),
        };
        state.reload().await?;
        Ok(state)
    }

    /// Re-reads every record into the dashboard. A reload that finishes
    /// after a newer one started is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub async fn reload(&self) -> Result<(), DbError> {
        let ticket = self.dashboard.begin_reload();
        let records = self.store.query(&RecordFilter::all()).await?;
        let count = records.len();
        match self.dashboard.finish_reload(ticket, records) {
            Some(_) => log::debug!("Dashboard reloaded with {count} records"),
            None => log::debug!("Discarded stale dashboard reload"),
        }
        Ok(())
    }
}

/// Builds the reporter from configuration, or `None` when no provider is
/// available.
#[must_use]
pub fn build_reporter(config: &AppConfig) -> Option<Reporter> {
    match Reporter::from_settings(&config.provider_settings()) {
        Ok(reporter) => {
            log::info!("AI features enabled via {}", reporter.provider_name());
            Some(reporter)
        }
        Err(e) => {
            log::warn!("AI features disabled: {e}");
            None
        }
    }
}

/// Opens the configured database and builds the application state.
///
/// # Errors
///
/// Returns [`ServerError::Database`] if the store cannot be opened or
/// loaded.
pub async fn build_state(config: &AppConfig) -> Result<AppState, ServerError> {
    log::info!("Opening records database...");
    let store = SqliteRecordStore::open(&config.database_path).await?;
    Ok(AppState::new(Arc::new(store), build_reporter(config)).await?)
}

/// Registers every `/api` route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PayloadConfig::new(MAX_BODY_BYTES))
        .app_data(web::JsonConfig::default().limit(MAX_BODY_BYTES))
        .service(
            web::scope("/api")
                .route("/health", web::get().to(handlers::health))
                .route("/districts", web::get().to(handlers::districts))
                .route("/categories", web::get().to(handlers::categories))
                .route("/records", web::get().to(handlers::records))
                .route("/records", web::post().to(handlers::add_record))
                .route("/ingest/upload", web::post().to(handlers::upload))
                .route("/ingest/text", web::post().to(handlers::ingest_text))
                .route("/dashboard", web::get().to(handlers::dashboard))
                .route("/leaderboard", web::get().to(handlers::leaderboard))
                .route("/clean/preview", web::post().to(handlers::clean_preview))
                .route("/clean", web::post().to(handlers::clean))
                .route("/export/{format}", web::get().to(handlers::export))
                .route("/ai/summary", web::post().to(handlers::ai_summary))
                .route("/ai/translate", web::post().to(handlers::ai_translate))
                .route("/ai/speech", web::post().to(handlers::ai_speech))
                .route("/ai/suggestions", web::post().to(handlers::ai_suggestions)),
        );
}

/// Starts the API server.
///
/// Opens the records database, loads the dashboard, configures the AI
/// reporter if a provider is available, and serves until shut down. The
/// caller provides the async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns [`ServerError`] if the database cannot be opened or the HTTP
/// server fails to bind or run.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: AppConfig) -> Result<(), ServerError> {
    let state = web::Data::new(build_state(&config).await?);

    let bind_addr = config.bind_addr.clone();
    let port = config.port;
    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await?;

    Ok(())
}
