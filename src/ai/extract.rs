//! Response extraction.
//!
//! Only the first candidate is read. Its text parts are concatenated in order
//! and its first image part wins; later images are ignored. A candidate with
//! no image is a valid result, not an error.

use super::gemini::types::{InlineData, Part};
use super::RawResponse;
use crate::models::{GenerationResult, ImagePart};
use crate::{Error, Result};
use base64::Engine as _;

pub fn extract(response: &RawResponse) -> Result<GenerationResult> {
    let Some(candidate) = response.candidates.first() else {
        let reason = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref());
        return Err(Error::EmptyResponse(match reason {
            Some(reason) => format!("No candidates returned (prompt blocked: {})", reason),
            None => "No candidates returned".to_string(),
        }));
    };

    if response.candidates.len() > 1 {
        tracing::debug!(
            "Ignoring {} additional candidate(s)",
            response.candidates.len() - 1
        );
    }

    let mut text: Option<String> = None;
    let mut image: Option<ImagePart> = None;

    let parts = candidate
        .content
        .as_ref()
        .map(|c| c.parts.as_slice())
        .unwrap_or_default();

    for part in parts {
        match part {
            Part::Text { text: value, thought } => {
                if *thought == Some(true) || value.is_empty() {
                    continue;
                }
                text.get_or_insert_with(String::new).push_str(value);
            }
            Part::InlineData { inline_data } => {
                if inline_data.data.is_empty() {
                    continue;
                }
                if image.is_some() {
                    tracing::debug!("Ignoring additional image part ({})", inline_data.mime_type);
                    continue;
                }
                image = Some(decode_inline_image(inline_data)?);
            }
            Part::Unrecognized(_) => {}
        }
    }

    if image.is_none() {
        tracing::debug!(
            "No image data found in the response (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unspecified")
        );
    }

    Ok(GenerationResult {
        text,
        image,
        finish_reason: candidate.finish_reason.clone(),
    })
}

fn decode_inline_image(inline_data: &InlineData) -> Result<ImagePart> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&inline_data.data)
        .map_err(|e| Error::CorruptArtifact(format!("Failed to decode base64 image: {}", e)))?;

    tracing::debug!(
        "Gemini returned image with mime_type: {} ({} bytes)",
        inline_data.mime_type,
        bytes.len()
    );

    Ok(ImagePart::new(bytes, inline_data.mime_type.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn response(value: serde_json::Value) -> RawResponse {
        serde_json::from_value(value).unwrap()
    }

    fn b64(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn test_empty_candidates_is_empty_response() {
        let err = extract(&response(serde_json::json!({ "candidates": [] }))).unwrap_err();
        assert!(matches!(err, Error::EmptyResponse(_)));
    }

    #[test]
    fn test_empty_response_reports_block_reason() {
        let err = extract(&response(serde_json::json!({
            "promptFeedback": { "blockReason": "PROHIBITED_CONTENT" }
        })))
        .unwrap_err();
        assert!(matches!(err, Error::EmptyResponse(msg) if msg.contains("PROHIBITED_CONTENT")));
    }

    #[test]
    fn test_first_image_wins() {
        let result = extract(&response(serde_json::json!({
            "candidates": [{
                "content": { "parts": [
                    { "inlineData": { "mimeType": "image/png", "data": b64(&[1, 1, 1]) } },
                    { "inlineData": { "mimeType": "image/jpeg", "data": b64(&[2, 2, 2]) } }
                ] }
            }]
        })))
        .unwrap();

        assert_eq!(result.image, Some(ImagePart::new(vec![1, 1, 1], "image/png")));
    }

    #[test]
    fn test_text_is_joined_in_order_around_image() {
        let result = extract(&response(serde_json::json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "Here " },
                    { "inlineData": { "mimeType": "image/png", "data": b64(&[7]) } },
                    { "text": "you go" }
                ] },
                "finishReason": "STOP"
            }]
        })))
        .unwrap();

        assert_eq!(result.text.as_deref(), Some("Here you go"));
        assert_eq!(result.image.unwrap().bytes(), &[7]);
        assert_eq!(result.finish_reason.as_deref(), Some("STOP"));
    }

    #[test]
    fn test_text_only_is_not_an_error() {
        let result = extract(&response(serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "I can't help with that" }] }
            }]
        })))
        .unwrap();

        assert_eq!(result.text.as_deref(), Some("I can't help with that"));
        assert!(result.image.is_none());
    }

    #[test]
    fn test_unrecognized_and_empty_parts_are_skipped() {
        let result = extract(&response(serde_json::json!({
            "candidates": [{
                "content": { "parts": [
                    {},
                    { "functionCall": { "name": "noop" } },
                    { "inlineData": { "mimeType": "image/png", "data": "" } },
                    { "text": "plan", "thought": true },
                    { "inlineData": { "mimeType": "image/webp", "data": b64(&[9, 9]) } }
                ] }
            }]
        })))
        .unwrap();

        assert_eq!(result.text, None);
        assert_eq!(result.image, Some(ImagePart::new(vec![9, 9], "image/webp")));
    }

    #[test]
    fn test_empty_text_part_is_not_text() {
        let result = extract(&response(serde_json::json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "" },
                    { "inlineData": { "mimeType": "image/png", "data": b64(&[3]) } }
                ] }
            }]
        })))
        .unwrap();

        assert_eq!(result.text, None);
        assert_eq!(result.image, Some(ImagePart::new(vec![3], "image/png")));
    }

    #[test]
    fn test_blocked_candidate_without_content() {
        let result = extract(&response(serde_json::json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        })))
        .unwrap();

        assert_eq!(
            result,
            GenerationResult {
                text: None,
                image: None,
                finish_reason: Some("SAFETY".to_string()),
            }
        );
    }

    #[test]
    fn test_only_first_candidate_is_read() {
        let result = extract(&response(serde_json::json!({
            "candidates": [
                { "content": { "parts": [{ "text": "first" }] } },
                { "content": { "parts": [
                    { "inlineData": { "mimeType": "image/png", "data": b64(&[1]) } }
                ] } }
            ]
        })))
        .unwrap();

        assert_eq!(result.text.as_deref(), Some("first"));
        assert!(result.image.is_none());
    }

    #[test]
    fn test_invalid_base64_is_corrupt_artifact() {
        let err = extract(&response(serde_json::json!({
            "candidates": [{
                "content": { "parts": [
                    { "inlineData": { "mimeType": "image/png", "data": "!!!invalid-base64!!!" } }
                ] }
            }]
        })))
        .unwrap_err();
        assert!(matches!(err, Error::CorruptArtifact(_)));
    }
}
