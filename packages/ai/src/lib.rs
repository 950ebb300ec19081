#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Reporting collaborator for the performance dashboard.
//!
//! Wraps a generative model behind [`providers::LlmProvider`] (Gemini,
//! Anthropic Claude, or any `OpenAI`-compatible server selected with
//! `AI_BASE_URL`) and exposes the narrative operations the dashboard needs:
//! executive summaries, translation, improvement suggestions, and
//! extraction of raw rows from PDFs and free text. Speech goes through
//! [`speech::SpeechSynthesizer`] and comes back as a WAV data URI.

pub mod output;
pub mod prompts;
pub mod providers;
pub mod reporter;
pub mod speech;

use thiserror::Error;

pub use reporter::{DistrictSummary, Reporter, SummaryInput};

/// Errors that can occur during AI operations.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request to the model provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider-specific error.
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },

    /// The model produced nothing usable from a document or text.
    #[error("Extraction failed: {message}")]
    ExtractionFailed {
        /// Description.
        message: String,
    },

    /// Audio could not be encoded.
    #[error("Audio encoding error: {0}")]
    Audio(#[from] hound::Error),
}
