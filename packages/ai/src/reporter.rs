//! Narrative reporting over a provider.
//!
//! Every operation is a single request with no retries. Model output is
//! parsed as JSON after stripping code fences. Failures never touch stored
//! records; callers decide what to show.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use police_perf_analytics_models::{CategoryScore, DistrictComparison, PerformanceMetric};
use police_perf_district_models::Language;
use police_perf_normalize::RawRow;
use serde::{Deserialize, Serialize};

use crate::output::{decode_data_uri, parse_json};
use crate::providers::{
    ContentBlock, LlmProvider, Message, ProviderSettings, StopReason, create_provider,
};
use crate::speech::{GeminiSpeech, SpeechOutput, SpeechSynthesizer, wav_data_uri};
use crate::{AiError, prompts};

/// Aggregates the summary is written about.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryInput {
    /// Per-category KPIs for the current filter.
    pub metrics: Vec<PerformanceMetric>,
    /// Per-district totals for the current filter.
    pub districts: Vec<DistrictComparison>,
}

/// Executive summary with highlights.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictSummary {
    /// One-paragraph overview.
    pub summary: String,
    /// Districts excelling in specific categories.
    #[serde(default)]
    pub achievements: Vec<String>,
    /// Districts underperforming in specific categories.
    #[serde(default)]
    pub improvements: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslationOutput {
    translated_text: String,
}

#[derive(Deserialize)]
struct SuggestionsOutput {
    suggestions: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ExtractionOutput {
    Wrapped { data: Vec<serde_json::Value> },
    Bare(Vec<serde_json::Value>),
}

/// Memoizes translations per `(language, text)`.
#[derive(Debug, Default)]
pub struct TranslationCache {
    entries: Mutex<HashMap<(Language, String), String>>,
}

impl TranslationCache {
    /// Cached translation, if any.
    #[must_use]
    pub fn get(&self, language: Language, text: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(language, text.to_string()))
            .cloned()
    }

    /// Stores a translation.
    pub fn insert(&self, language: Language, text: String, translated: String) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((language, text), translated);
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Generates summaries, translations, speech, suggestions, and extracted
/// rows.
pub struct Reporter {
    provider: Box<dyn LlmProvider>,
    speech: Option<Box<dyn SpeechSynthesizer>>,
    translations: TranslationCache,
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("provider", &self.provider.name())
            .field("speech", &self.speech.is_some())
            .finish_non_exhaustive()
    }
}

impl Reporter {
    /// Creates a reporter without speech support.
    #[must_use]
    pub fn new(provider: Box<dyn LlmProvider>) -> Self {
        Self {
            provider,
            speech: None,
            translations: TranslationCache::default(),
        }
    }

    /// Attaches a speech synthesizer.
    #[must_use]
    pub fn with_speech(mut self, speech: Box<dyn SpeechSynthesizer>) -> Self {
        self.speech = Some(speech);
        self
    }

    /// Builds a reporter from provider settings. Speech is enabled when a
    /// Gemini key is present.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Config`] if no provider can be configured.
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, AiError> {
        let reporter = Self::new(create_provider(settings)?);
        Ok(match GeminiSpeech::from_env() {
            Some(speech) => reporter.with_speech(Box::new(speech)),
            None => {
                log::info!("No Gemini key found; speech synthesis disabled");
                reporter
            }
        })
    }

    /// Name of the underlying provider.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// The translation cache.
    #[must_use]
    pub const fn translations(&self) -> &TranslationCache {
        &self.translations
    }

    async fn complete(&self, system: &str, messages: &[Message]) -> Result<String, AiError> {
        log::debug!("Sending request to {}", self.provider.name());
        let response = self.provider.chat(system, messages).await?;
        if response.stop_reason == StopReason::MaxTokens {
            log::warn!("{} response was truncated", self.provider.name());
        }
        Ok(response.text)
    }

    async fn complete_json<T: serde::de::DeserializeOwned>(
        &self,
        system: &str,
        prompt: String,
    ) -> Result<T, AiError> {
        let text = self.complete(system, &[Message::user(prompt)]).await?;
        parse_json(&text)
    }

    /// Writes an executive summary of `input`, translated into `language`.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request or parsing fails.
    pub async fn summarize(
        &self,
        input: &SummaryInput,
        language: Language,
    ) -> Result<DistrictSummary, AiError> {
        let summary: DistrictSummary = self
            .complete_json(
                prompts::ANALYST_SYSTEM_PROMPT,
                prompts::summary_prompt(&input.metrics, &input.districts),
            )
            .await?;

        if language == Language::English {
            return Ok(summary);
        }

        let mut achievements = Vec::with_capacity(summary.achievements.len());
        for item in &summary.achievements {
            achievements.push(self.translate(item, language).await?);
        }
        let mut improvements = Vec::with_capacity(summary.improvements.len());
        for item in &summary.improvements {
            improvements.push(self.translate(item, language).await?);
        }

        Ok(DistrictSummary {
            summary: self.translate(&summary.summary, language).await?,
            achievements,
            improvements,
        })
    }

    /// Translates `text` into `language`. English and blank text pass
    /// through unchanged; results are cached.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request or parsing fails.
    pub async fn translate(&self, text: &str, language: Language) -> Result<String, AiError> {
        if language == Language::English || text.trim().is_empty() {
            return Ok(text.to_string());
        }

        if let Some(cached) = self.translations.get(language, text) {
            return Ok(cached);
        }

        let output: TranslationOutput = self
            .complete_json(
                prompts::ANALYST_SYSTEM_PROMPT,
                prompts::translate_prompt(text, language),
            )
            .await?;

        self.translations
            .insert(language, text.to_string(), output.translated_text.clone());
        Ok(output.translated_text)
    }

    /// Reads `text` aloud in `language`.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Config`] when no synthesizer is configured, or
    /// any synthesis error.
    pub async fn synthesize_speech(
        &self,
        text: &str,
        language: Language,
    ) -> Result<SpeechOutput, AiError> {
        let speech = self.speech.as_ref().ok_or_else(|| AiError::Config {
            message: "Speech synthesis requires GEMINI_API_KEY or GOOGLE_API_KEY".to_string(),
        })?;
        let wav = speech.synthesize(text, language).await?;
        Ok(SpeechOutput {
            audio_data_uri: wav_data_uri(&wav),
        })
    }

    /// Asks for 3 to 4 recommendations for a district's weakest categories.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request or parsing fails.
    pub async fn suggest_improvements(
        &self,
        district_name: &str,
        worst: &[CategoryScore],
    ) -> Result<Vec<String>, AiError> {
        let output: SuggestionsOutput = self
            .complete_json(
                prompts::ANALYST_SYSTEM_PROMPT,
                prompts::suggestions_prompt(district_name, worst),
            )
            .await?;
        Ok(output.suggestions)
    }

    /// Extracts raw rows from a base64 PDF data URI.
    ///
    /// Providers that cannot read documents get the PDF text extracted
    /// locally and routed through [`Self::extract_from_text`].
    ///
    /// # Errors
    ///
    /// Returns [`AiError::ExtractionFailed`] for malformed input or empty
    /// output, or any request error.
    pub async fn extract_from_document(&self, pdf_data_uri: &str) -> Result<Vec<RawRow>, AiError> {
        let document = decode_data_uri(pdf_data_uri)?;

        if !self.provider.supports_documents() {
            log::info!(
                "{} cannot read documents; extracting PDF text locally",
                self.provider.name()
            );
            let text = pdf_text(document.bytes).await?;
            return self.extract_from_text(&text).await;
        }

        let message = Message::user_blocks(vec![
            ContentBlock::Document {
                media_type: document.media_type,
                data: pdf_data_uri
                    .split_once(',')
                    .map_or_else(String::new, |(_, payload)| payload.trim().to_string()),
            },
            ContentBlock::Text {
                text: prompts::document_prompt(&today()),
            },
        ]);

        let text = self
            .complete(prompts::EXTRACTION_SYSTEM_PROMPT, &[message])
            .await?;
        parse_rows(&text)
    }

    /// Extracts raw rows from unstructured text.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::ExtractionFailed`] for blank input or empty
    /// output, or any request error.
    pub async fn extract_from_text(&self, text: &str) -> Result<Vec<RawRow>, AiError> {
        if text.trim().is_empty() {
            return Err(AiError::ExtractionFailed {
                message: "No text to extract from".to_string(),
            });
        }

        let output = self
            .complete(
                prompts::EXTRACTION_SYSTEM_PROMPT,
                &[Message::user(prompts::text_prompt(text, &today()))],
            )
            .await?;
        parse_rows(&output)
    }
}

fn today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

/// Parses `{"data": [...]}` or a bare array into rows.
fn parse_rows(text: &str) -> Result<Vec<RawRow>, AiError> {
    let output: ExtractionOutput = parse_json(text).map_err(|e| AiError::ExtractionFailed {
        message: format!("Model output was not valid JSON: {e}"),
    })?;
    let values = match output {
        ExtractionOutput::Wrapped { data } | ExtractionOutput::Bare(data) => data,
    };

    let rows: Vec<RawRow> = values.iter().filter_map(RawRow::from_json).collect();
    if rows.is_empty() {
        return Err(AiError::ExtractionFailed {
            message: "AI could not extract any data".to_string(),
        });
    }

    log::info!("Extracted {} rows", rows.len());
    Ok(rows)
}

/// Extracts a PDF's text on the blocking pool.
///
/// # Errors
///
/// Returns [`AiError::ExtractionFailed`] if the PDF cannot be read.
pub async fn pdf_text(bytes: Vec<u8>) -> Result<String, AiError> {
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| AiError::ExtractionFailed {
            message: format!("PDF extraction task failed: {e}"),
        })?
        .map_err(|e| AiError::ExtractionFailed {
            message: format!("Could not read PDF: {e}"),
        })?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use police_perf_district_models::Category;

    use super::*;
    use crate::providers::LlmResponse;

    struct ScriptedProvider {
        replies: Mutex<VecDeque<String>>,
        prompts: Mutex<Vec<Vec<Message>>>,
        calls: AtomicUsize,
        documents: bool,
    }

    impl ScriptedProvider {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().map(ToString::to_string).collect()),
                prompts: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
                documents: false,
            }
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn chat(
            &self,
            _system_prompt: &str,
            messages: &[Message],
        ) -> Result<LlmResponse, AiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(messages.to_vec());
            let text = self.replies.lock().unwrap().pop_front().unwrap_or_default();
            Ok(LlmResponse {
                text,
                stop_reason: StopReason::EndTurn,
            })
        }

        fn supports_documents(&self) -> bool {
            self.documents
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    struct Shared(std::sync::Arc<ScriptedProvider>);

    #[async_trait::async_trait]
    impl LlmProvider for Shared {
        async fn chat(
            &self,
            system_prompt: &str,
            messages: &[Message],
        ) -> Result<LlmResponse, AiError> {
            self.0.chat(system_prompt, messages).await
        }

        fn supports_documents(&self) -> bool {
            self.0.supports_documents()
        }

        fn name(&self) -> &'static str {
            self.0.name()
        }
    }

    struct FixedSpeech;

    #[async_trait::async_trait]
    impl SpeechSynthesizer for FixedSpeech {
        async fn synthesize(&self, _text: &str, _language: Language) -> Result<Vec<u8>, AiError> {
            crate::speech::pcm_to_wav(&[0, 0], 24_000)
        }
    }

    #[tokio::test]
    async fn summary_in_english_is_returned_as_parsed() {
        let reporter = Reporter::new(Box::new(ScriptedProvider::new(&[
            "```json\n{\"summary\":\"Ganjam leads.\",\"achievements\":[\"a\"],\"improvements\":[\"b\"]}\n```",
        ])));
        let summary = reporter
            .summarize(&SummaryInput::default(), Language::English)
            .await
            .unwrap();
        assert_eq!(summary.summary, "Ganjam leads.");
        assert_eq!(summary.achievements, ["a"]);
        assert_eq!(summary.improvements, ["b"]);
    }

    #[tokio::test]
    async fn odia_summary_translates_each_part() {
        let reporter = Reporter::new(Box::new(ScriptedProvider::new(&[
            r#"{"summary":"S","achievements":["A"],"improvements":["I"]}"#,
            r#"{"translatedText":"A-or"}"#,
            r#"{"translatedText":"I-or"}"#,
            r#"{"translatedText":"S-or"}"#,
        ])));
        let summary = reporter
            .summarize(&SummaryInput::default(), Language::Odia)
            .await
            .unwrap();
        assert_eq!(summary.summary, "S-or");
        assert_eq!(summary.achievements, ["A-or"]);
        assert_eq!(summary.improvements, ["I-or"]);
        assert_eq!(reporter.translations().len(), 3);
    }

    #[tokio::test]
    async fn translations_are_cached_per_language_and_text() {
        let provider = ScriptedProvider::new(&[r#"{"translatedText":"ନମସ୍କାର"}"#]);
        let reporter = Reporter::new(Box::new(provider));

        let first = reporter.translate("Hello", Language::Odia).await.unwrap();
        let second = reporter.translate("Hello", Language::Odia).await.unwrap();
        assert_eq!(first, "ନମସ୍କାର");
        assert_eq!(first, second);
        assert_eq!(reporter.translations().len(), 1);

        let english = reporter.translate("Hello", Language::English).await.unwrap();
        assert_eq!(english, "Hello");
    }

    #[tokio::test]
    async fn speech_without_synthesizer_is_config_error() {
        let reporter = Reporter::new(Box::new(ScriptedProvider::new(&[])));
        assert!(matches!(
            reporter.synthesize_speech("hi", Language::English).await,
            Err(AiError::Config { .. })
        ));

        let reporter = reporter.with_speech(Box::new(FixedSpeech));
        let output = reporter
            .synthesize_speech("hi", Language::English)
            .await
            .unwrap();
        assert!(output.audio_data_uri.starts_with("data:audio/wav;base64,"));
    }

    #[tokio::test]
    async fn suggestions_are_parsed() {
        let reporter = Reporter::new(Box::new(ScriptedProvider::new(&[
            r#"{"suggestions":["Run NBW drives","Train staff","Track warrants"]}"#,
        ])));
        let worst = [CategoryScore {
            category: Category::Nbw,
            label: Category::Nbw.label().to_string(),
            cases_registered: 10,
            cases_solved: 1,
            solve_rate: 10.0,
        }];
        let suggestions = reporter
            .suggest_improvements("Puri", &worst)
            .await
            .unwrap();
        assert_eq!(suggestions.len(), 3);
    }

    #[tokio::test]
    async fn text_extraction_accepts_wrapped_and_bare_arrays() {
        let reporter = Reporter::new(Box::new(ScriptedProvider::new(&[
            r#"{"data":[{"District":"Ganjam","Category":"NBW","Value":12,"Date":"2024-01-02"}]}"#,
            r#"[{"District":"Puri","Category":"Others","Value":1,"Date":"2024-01-02"}]"#,
        ])));
        let rows = reporter.extract_from_text("Ganjam NBW 12").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].get("District").is_some());

        let rows = reporter.extract_from_text("Puri other 1").await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn empty_extraction_fails() {
        let reporter = Reporter::new(Box::new(ScriptedProvider::new(&[r#"{"data":[]}"#, "oops"])));
        assert!(matches!(
            reporter.extract_from_text("nothing here").await,
            Err(AiError::ExtractionFailed { .. })
        ));
        assert!(matches!(
            reporter.extract_from_text("garbled").await,
            Err(AiError::ExtractionFailed { .. })
        ));
        assert!(matches!(
            reporter.extract_from_text("   ").await,
            Err(AiError::ExtractionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn document_capable_provider_receives_the_pdf() {
        let mut provider = ScriptedProvider::new(&[
            r#"{"data":[{"District":"Rourkela","Category":"Firearms","Value":3,"Date":"2024-02-01"}]}"#,
        ]);
        provider.documents = true;
        let provider = std::sync::Arc::new(provider);

        let reporter = Reporter::new(Box::new(Shared(provider.clone())));
        let uri = crate::output::encode_data_uri("application/pdf", b"%PDF-1.4");
        let rows = reporter.extract_from_document(&uri).await.unwrap();
        assert_eq!(rows.len(), 1);

        let prompts = provider.prompts.lock().unwrap();
        let crate::providers::MessageContent::Blocks(blocks) = &prompts[0][0].content else {
            panic!("expected blocks");
        };
        assert!(matches!(
            &blocks[0],
            ContentBlock::Document { media_type, data }
                if media_type == "application/pdf" && data == "JVBERi0xLjQ="
        ));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }
}
