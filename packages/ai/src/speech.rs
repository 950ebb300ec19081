//! Text-to-speech.
//!
//! Gemini TTS returns raw 24 kHz signed 16-bit mono PCM. It is wrapped in
//! a WAV container with `hound` and handed back as a base64 data URI so
//! clients can play it directly.

use std::io::Cursor;

use base64::{Engine as _, engine::general_purpose};
use police_perf_district_models::Language;
use serde::Serialize;

use crate::AiError;
use crate::providers::gemini::{self, GeminiContent, GeminiPart, GeminiRequest};

/// Gemini speech model.
pub const TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";

/// Sample rate of Gemini TTS output.
pub const SAMPLE_RATE: u32 = 24_000;

/// Synthesized audio ready for playback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechOutput {
    /// `data:audio/wav;base64,...`
    pub audio_data_uri: String,
}

/// Produces WAV audio for a piece of text.
#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesizes `text` in `language`, returning WAV bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if synthesis fails.
    async fn synthesize(&self, text: &str, language: Language) -> Result<Vec<u8>, AiError>;
}

/// Prebuilt voice for each language.
#[must_use]
pub const fn voice_for(language: Language) -> &'static str {
    match language {
        Language::English => "Algenib",
        Language::Odia => "Achernar",
    }
}

/// Wraps little-endian 16-bit mono PCM in a WAV container.
///
/// # Errors
///
/// Returns [`AiError::Audio`] if the writer fails.
pub fn pcm_to_wav(pcm: &[u8], sample_rate: u32) -> Result<Vec<u8>, AiError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(pcm.len() + 44));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for chunk in pcm.chunks_exact(2) {
            writer.write_sample(i16::from_le_bytes([chunk[0], chunk[1]]))?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Encodes WAV bytes as a data URI.
#[must_use]
pub fn wav_data_uri(wav: &[u8]) -> String {
    format!(
        "data:audio/wav;base64,{}",
        general_purpose::STANDARD.encode(wav)
    )
}

/// Gemini TTS synthesizer.
pub struct GeminiSpeech {
    api_key: String,
    client: reqwest::Client,
}

impl GeminiSpeech {
    /// Creates a synthesizer.
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// Creates a synthesizer if a Gemini key is in the environment.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        crate::providers::gemini_api_key().map(Self::new)
    }
}

fn speech_request(text: &str, language: Language) -> GeminiRequest {
    GeminiRequest {
        system_instruction: None,
        contents: vec![GeminiContent {
            role: Some("user".to_string()),
            parts: vec![GeminiPart::text(text)],
        }],
        generation_config: Some(serde_json::json!({
            "responseModalities": ["AUDIO"],
            "speechConfig": {
                "voiceConfig": {
                    "prebuiltVoiceConfig": { "voiceName": voice_for(language) }
                }
            }
        })),
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for GeminiSpeech {
    async fn synthesize(&self, text: &str, language: Language) -> Result<Vec<u8>, AiError> {
        let request = speech_request(text, language);
        let candidate = gemini::generate(&self.client, &self.api_key, TTS_MODEL, &request).await?;

        let audio = candidate
            .content
            .parts
            .into_iter()
            .find_map(|p| p.inline_data)
            .ok_or_else(|| AiError::Provider {
                message: "No audio media was generated".to_string(),
            })?;

        let pcm = general_purpose::STANDARD
            .decode(audio.data.as_bytes())
            .map_err(|e| AiError::Provider {
                message: format!("Invalid audio payload: {e}"),
            })?;

        log::debug!("Received {} bytes of PCM ({})", pcm.len(), audio.mime_type);
        pcm_to_wav(&pcm, SAMPLE_RATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_has_riff_header_and_samples() {
        let pcm = [0x01, 0x00, 0xff, 0x7f];
        let wav = pcm_to_wav(&pcm, SAMPLE_RATE).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(wav.len(), 44 + pcm.len());

        let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        assert_eq!(reader.spec().sample_rate, 24_000);
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.len(), 2);
    }

    #[test]
    fn data_uri_prefix() {
        assert!(wav_data_uri(b"RIFF").starts_with("data:audio/wav;base64,UklGRg"));
    }

    #[test]
    fn voice_depends_on_language() {
        let json = serde_json::to_value(speech_request("hello", Language::Odia)).unwrap();
        assert_eq!(
            json["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
            "Achernar"
        );
        assert_eq!(voice_for(Language::English), "Algenib");
    }
}
