//! Parsing model output and data URIs.

use base64::{Engine as _, engine::general_purpose};
use serde::de::DeserializeOwned;

use crate::AiError;

/// Removes a surrounding Markdown code fence (```` ```json ... ``` ````) if
/// present.
#[must_use]
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`, `JSON`, ...) on the opening line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parses model output as JSON after stripping code fences.
///
/// # Errors
///
/// Returns [`AiError::Json`] if the text is not valid JSON for `T`.
pub fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, AiError> {
    let body = strip_code_fences(text);
    log::debug!("Parsing model output: {body}");
    Ok(serde_json::from_str(body)?)
}

/// A decoded `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    /// MIME type, e.g. `application/pdf`.
    pub media_type: String,
    /// Decoded bytes.
    pub bytes: Vec<u8>,
}

/// Decodes a base64 `data:<mime>;base64,<payload>` URI.
///
/// # Errors
///
/// Returns [`AiError::ExtractionFailed`] if the URI is malformed.
pub fn decode_data_uri(uri: &str) -> Result<DataUri, AiError> {
    let malformed = |message: &str| AiError::ExtractionFailed {
        message: message.to_string(),
    };

    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| malformed("Document is not a data URI"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| malformed("Data URI has no payload"))?;
    let media_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| malformed("Data URI is not base64 encoded"))?;

    let bytes = general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| AiError::ExtractionFailed {
            message: format!("Invalid base64 payload: {e}"),
        })?;

    Ok(DataUri {
        media_type: if media_type.is_empty() {
            "application/octet-stream".to_string()
        } else {
            media_type.to_string()
        },
        bytes,
    })
}

/// Encodes bytes as a base64 data URI.
#[must_use]
pub fn encode_data_uri(media_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{media_type};base64,{}",
        general_purpose::STANDARD.encode(bytes)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        let text = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(text), "{\"a\": 1}");
    }

    #[test]
    fn strips_bare_fence_and_whitespace() {
        assert_eq!(strip_code_fences("  ```\n[1]\n```  "), "[1]");
        assert_eq!(strip_code_fences("  [1] "), "[1]");
    }

    #[test]
    fn parse_json_reads_fenced_output() {
        let value: Vec<u32> = parse_json("```JSON\n[1, 2]\n```").unwrap();
        assert_eq!(value, [1, 2]);
        assert!(parse_json::<Vec<u32>>("not json").is_err());
    }

    #[test]
    fn data_uri_decodes_pdf() {
        let uri = encode_data_uri("application/pdf", b"%PDF-1.4");
        let decoded = decode_data_uri(&uri).unwrap();
        assert_eq!(decoded.media_type, "application/pdf");
        assert_eq!(decoded.bytes, b"%PDF-1.4");
    }

    #[test]
    fn malformed_data_uris_fail_extraction() {
        for uri in ["application/pdf;base64,AA", "data:application/pdf,AA", "data:x"] {
            assert!(matches!(
                decode_data_uri(uri),
                Err(AiError::ExtractionFailed { .. })
            ));
        }
    }
}
