//! HTTP handler functions for the police performance API.

use std::fmt::Display;

use actix_web::{HttpResponse, http::StatusCode, http::header, web};
use chrono::Utc;
use police_perf_ai::{AiError, Reporter, SummaryInput};
use police_perf_analytics::engine;
use police_perf_database::clean::{self, CleanError, CleanPlan};
use police_perf_district_models::{Category, District};
use police_perf_export::{ExportFormat, export_filename, render};
use police_perf_ingest::{IngestError, IngestOptions, IngestOutcome, ManualEntry, SkippedRow};
use police_perf_record_models::RecordFilter;
use police_perf_server_models::{
    ApiCategory, ApiHealth, ApiRecord, ApiSkippedRow, CleanRequest, CleanResponse, FilterParams,
    IngestResponse, SpeechResponse, SuggestionsRequest, SuggestionsResponse, SummaryRequest,
    SummaryResponse, TextIngestRequest, TextRequest, TranslateResponse, UploadParams,
};

use crate::AppState;

/// Categories handed to the reporter when asking for suggestions.
const WORST_CATEGORY_COUNT: usize = 3;

fn error_response(status: StatusCode, message: impl Display) -> HttpResponse {
    HttpResponse::build(status).json(serde_json::json!({
        "error": message.to_string()
    }))
}

fn skipped_rows(rows: &[SkippedRow]) -> Vec<ApiSkippedRow> {
    rows.iter()
        .map(|r| ApiSkippedRow {
            row: r.row,
            reason: r.reason.clone(),
        })
        .collect()
}

fn ai_status(e: &AiError) -> StatusCode {
    match e {
        AiError::Config { .. } => StatusCode::SERVICE_UNAVAILABLE,
        AiError::ExtractionFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        AiError::Http(_)
        | AiError::Json(_)
        | AiError::Provider { .. }
        | AiError::Audio(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn ai_error(action: &str, e: &AiError) -> HttpResponse {
    log::error!("Failed to {action}: {e}");
    error_response(ai_status(e), e)
}

fn ingest_error(e: &IngestError) -> HttpResponse {
    log::error!("Failed to ingest records: {e}");
    match e {
        IngestError::NoValidRecords { skipped, .. } => {
            HttpResponse::UnprocessableEntity().json(serde_json::json!({
                "error": e.to_string(),
                "skipped": skipped_rows(skipped),
            }))
        }
        IngestError::Rejected(_) => error_response(StatusCode::UNPROCESSABLE_ENTITY, e),
        IngestError::EmptyInput
        | IngestError::UnsupportedFile { .. }
        | IngestError::Malformed { .. }
        | IngestError::Spreadsheet(_)
        | IngestError::Csv(_) => error_response(StatusCode::BAD_REQUEST, e),
        IngestError::Ai(ai) => error_response(ai_status(ai), e),
        IngestError::Persistence(_) | IngestError::Io(_) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to ingest records")
        }
    }
}

fn reporter(state: &AppState) -> Result<&Reporter, HttpResponse> {
    state.reporter.as_ref().ok_or_else(|| {
        error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "AI features are not configured",
        )
    })
}

fn parse_filter(params: &FilterParams) -> Result<RecordFilter, HttpResponse> {
    params
        .to_filter()
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e))
}

async fn reload_dashboard(state: &AppState) {
    if let Err(e) = state.reload().await {
        log::error!("Failed to reload dashboard: {e}");
    }
}

async fn ingested(state: &AppState, outcome: &IngestOutcome) -> HttpResponse {
    if !outcome.dry_run {
        reload_dashboard(state).await;
    }
    let status = if outcome.dry_run {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    HttpResponse::build(status).json(IngestResponse {
        message: outcome.to_string(),
        saved: outcome.saved,
        total: outcome.total,
        rejected: skipped_rows(&outcome.rejected),
        dry_run: outcome.dry_run,
    })
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/districts`
pub async fn districts() -> HttpResponse {
    HttpResponse::Ok().json(District::all())
}

/// `GET /api/categories`
pub async fn categories() -> HttpResponse {
    let categories: Vec<ApiCategory> = Category::all()
        .iter()
        .copied()
        .map(ApiCategory::from)
        .collect();
    HttpResponse::Ok().json(categories)
}

/// `GET /api/records`
///
/// Records matching the district, category, and date filters, ordered by
/// date.
pub async fn records(
    state: web::Data<AppState>,
    params: web::Query<FilterParams>,
) -> HttpResponse {
    let filter = match parse_filter(&params) {
        Ok(filter) => filter,
        Err(response) => return response,
    };

    match state.store.query(&filter).await {
        Ok(rows) => {
            let records: Vec<ApiRecord> = rows.into_iter().map(ApiRecord::from).collect();
            HttpResponse::Ok().json(records)
        }
        Err(e) => {
            log::error!("Failed to query records: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to query records")
        }
    }
}

/// `POST /api/records`
///
/// Validates and stores one manually entered record.
pub async fn add_record(
    state: web::Data<AppState>,
    body: web::Json<ManualEntry>,
) -> HttpResponse {
    match police_perf_ingest::ingest_manual(
        state.store.as_ref(),
        &body,
        IngestOptions::default(),
    )
    .await
    {
        Ok(outcome) => ingested(&state, &outcome).await,
        Err(e) => ingest_error(&e),
    }
}

/// `POST /api/ingest/upload?filename=...`
///
/// The request body is the raw file. Spreadsheets are parsed locally;
/// PDFs go through AI extraction.
pub async fn upload(
    state: web::Data<AppState>,
    params: web::Query<UploadParams>,
    body: web::Bytes,
) -> HttpResponse {
    log::info!("Received upload {} ({} bytes)", params.filename, body.len());

    match police_perf_ingest::ingest_file(
        state.store.as_ref(),
        state.reporter.as_ref(),
        &params.filename,
        body.to_vec(),
        IngestOptions {
            dry_run: params.dry_run,
        },
    )
    .await
    {
        Ok(outcome) => ingested(&state, &outcome).await,
        Err(e) => ingest_error(&e),
    }
}

/// `POST /api/ingest/text`
pub async fn ingest_text(
    state: web::Data<AppState>,
    body: web::Json<TextIngestRequest>,
) -> HttpResponse {
    match police_perf_ingest::ingest_text(
        state.store.as_ref(),
        state.reporter.as_ref(),
        &body.text,
        IngestOptions {
            dry_run: body.dry_run,
        },
    )
    .await
    {
        Ok(outcome) => ingested(&state, &outcome).await,
        Err(e) => ingest_error(&e),
    }
}

/// `GET /api/dashboard`
///
/// Without parameters this is the published view, which spans every
/// loaded record's dates.
pub async fn dashboard(
    state: web::Data<AppState>,
    params: web::Query<FilterParams>,
) -> HttpResponse {
    if params.is_empty() {
        return HttpResponse::Ok().json(state.dashboard.current().as_ref());
    }

    match parse_filter(&params) {
        Ok(filter) => HttpResponse::Ok().json(state.dashboard.view_for(&filter)),
        Err(response) => response,
    }
}

/// `GET /api/leaderboard`
pub async fn leaderboard(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(engine::leaderboard(&state.dashboard.records()))
}

/// `POST /api/clean/preview`
pub async fn clean_preview(
    state: web::Data<AppState>,
    body: web::Json<CleanRequest>,
) -> HttpResponse {
    let plan = match parse_filter(&body.filter) {
        Ok(filter) => CleanPlan::new(filter),
        Err(response) => return response,
    };

    match clean::preview(state.store.as_ref(), &plan).await {
        Ok(preview) => HttpResponse::Ok().json(preview),
        Err(e) => {
            log::error!("Failed to preview clean: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to preview clean")
        }
    }
}

/// `POST /api/clean`
///
/// Deletes the matching records. Deleting everything requires
/// `confirmed: true`.
pub async fn clean(state: web::Data<AppState>, body: web::Json<CleanRequest>) -> HttpResponse {
    let plan = match parse_filter(&body.filter) {
        Ok(filter) => CleanPlan::new(filter),
        Err(response) => return response,
    };

    match clean::execute(state.store.as_ref(), &plan, body.confirmed).await {
        Ok(deleted) => {
            reload_dashboard(&state).await;
            HttpResponse::Ok().json(CleanResponse { deleted })
        }
        Err(e @ CleanError::ConfirmationRequired { .. }) => {
            HttpResponse::Conflict().json(serde_json::json!({
                "error": e.to_string(),
                "requiresConfirmation": true,
            }))
        }
        Err(e @ CleanError::NoMatchingRecords) => error_response(StatusCode::NOT_FOUND, e),
        Err(e @ CleanError::Persistence(_)) => {
            log::error!("Failed to clean records: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to clean records")
        }
    }
}

/// `GET /api/export/{format}`
///
/// Downloads the filtered records as `xlsx`, `csv`, or `pdf`.
pub async fn export(
    state: web::Data<AppState>,
    format: web::Path<String>,
    params: web::Query<FilterParams>,
) -> HttpResponse {
    let Ok(format) = format.parse::<ExportFormat>() else {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("Unsupported export format {:?}", format.as_str()),
        );
    };
    let filter = match parse_filter(&params) {
        Ok(filter) => filter,
        Err(response) => return response,
    };

    let records = match state.store.query(&filter).await {
        Ok(records) => records,
        Err(e) => {
            log::error!("Failed to query records for export: {e}");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to export records");
        }
    };

    match render(&records, format) {
        Ok(bytes) => {
            let filename = export_filename(format, Utc::now());
            HttpResponse::Ok()
                .content_type(format.content_type())
                .insert_header((
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{filename}\""),
                ))
                .body(bytes)
        }
        Err(e) => {
            log::error!("Failed to render export: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to export records")
        }
    }
}

/// `POST /api/ai/summary`
///
/// Summarizes the filtered KPIs. A response that finishes after a newer
/// summary request started is dropped. Audio is only synthesized once
/// the summary itself succeeded; audio failures leave it out.
pub async fn ai_summary(
    state: web::Data<AppState>,
    body: web::Json<SummaryRequest>,
) -> HttpResponse {
    let reporter = match reporter(&state) {
        Ok(reporter) => reporter,
        Err(response) => return response,
    };
    let filter = match parse_filter(&body.filter) {
        Ok(filter) => filter,
        Err(response) => return response,
    };

    let ticket = state.summaries.issue();
    let view = state.dashboard.view_for(&filter);
    if view.totals.records == 0 {
        return error_response(
            StatusCode::NOT_FOUND,
            "No records match the selected filters",
        );
    }

    let input = SummaryInput {
        metrics: view.metrics,
        districts: view.districts,
    };
    let summary = match reporter.summarize(&input, body.language).await {
        Ok(summary) => summary,
        Err(e) => return ai_error("generate summary", &e),
    };

    let Some(summary) = state.summaries.accept(ticket, summary) else {
        log::debug!("Dropping stale summary {}", ticket.value());
        return error_response(
            StatusCode::CONFLICT,
            "Superseded by a newer summary request",
        );
    };

    let audio_data_uri = if body.with_audio {
        match reporter
            .synthesize_speech(&summary.summary, body.language)
            .await
        {
            Ok(speech) => Some(speech.audio_data_uri),
            Err(e) => {
                log::warn!("Summary audio unavailable: {e}");
                None
            }
        }
    } else {
        None
    };

    HttpResponse::Ok().json(SummaryResponse {
        language: body.language,
        summary: summary.summary,
        achievements: summary.achievements,
        improvements: summary.improvements,
        audio_data_uri,
    })
}

/// `POST /api/ai/translate`
pub async fn ai_translate(
    state: web::Data<AppState>,
    body: web::Json<TextRequest>,
) -> HttpResponse {
    let reporter = match reporter(&state) {
        Ok(reporter) => reporter,
        Err(response) => return response,
    };

    match reporter.translate(&body.text, body.language).await {
        Ok(translated_text) => HttpResponse::Ok().json(TranslateResponse { translated_text }),
        Err(e) => ai_error("translate text", &e),
    }
}

/// `POST /api/ai/speech`
pub async fn ai_speech(state: web::Data<AppState>, body: web::Json<TextRequest>) -> HttpResponse {
    let reporter = match reporter(&state) {
        Ok(reporter) => reporter,
        Err(response) => return response,
    };
    if body.text.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Text is required");
    }

    match reporter.synthesize_speech(&body.text, body.language).await {
        Ok(speech) => HttpResponse::Ok().json(SpeechResponse {
            audio_data_uri: speech.audio_data_uri,
        }),
        Err(e) => ai_error("synthesize speech", &e),
    }
}

/// `POST /api/ai/suggestions`
///
/// Recommendations for a district ranked below the podium, based on its
/// three lowest solve-rate categories.
pub async fn ai_suggestions(
    state: web::Data<AppState>,
    body: web::Json<SuggestionsRequest>,
) -> HttpResponse {
    let reporter = match reporter(&state) {
        Ok(reporter) => reporter,
        Err(response) => return response,
    };
    let Some(district) = District::by_id(body.district_id) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("Unknown district id {}", body.district_id),
        );
    };

    let records = state.dashboard.records();
    let board = engine::leaderboard(&records);
    if let Some(entry) = board.iter().find(|e| e.district_id == district.id)
        && !entry.eligible_for_suggestions()
    {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!(
                "{} ranks {}; suggestions are offered below the top three",
                district.name, entry.rank
            ),
        );
    }

    let worst = engine::worst_categories(&records, district.id, WORST_CATEGORY_COUNT);
    if worst.is_empty() {
        return error_response(
            StatusCode::NOT_FOUND,
            format!("No records for {}", district.name),
        );
    }

    match reporter.suggest_improvements(district.name, &worst).await {
        Ok(suggestions) => HttpResponse::Ok().json(SuggestionsResponse {
            district_id: district.id,
            name: district.name.to_string(),
            worst_categories: worst,
            suggestions,
        }),
        Err(e) => ai_error("suggest improvements", &e),
    }
}
