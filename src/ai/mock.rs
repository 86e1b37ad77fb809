use super::{GenerationService, RawResponse};
use crate::models::GenerationRequest;
use crate::{Error, Result};
use async_trait::async_trait;
use base64::Engine as _;
use std::sync::{Arc, Mutex};

type ErrorFactory = Arc<dyn Fn() -> Error + Send + Sync>;

/// Scripted [`GenerationService`] that records every request it receives.
///
/// Responses cycle in the order they were added. With no responses
/// configured it answers with a single 1x1 PNG.
#[derive(Clone)]
pub struct MockGenerationClient {
    responses: Arc<Mutex<Vec<RawResponse>>>,
    error: Option<ErrorFactory>,
    calls: Arc<Mutex<Vec<(GenerationRequest, String)>>>,
}

impl MockGenerationClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            error: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_response(self, response: RawResponse) -> Self {
        self.responses.lock().unwrap().push(response);
        self
    }

    /// Queue a response from its JSON wire form.
    pub fn with_json_response(self, value: serde_json::Value) -> Self {
        let response = serde_json::from_value(value).expect("mock response must match schema");
        self.with_response(response)
    }

    /// Queue a single-candidate response with optional text and image parts.
    pub fn with_parts(self, text: Option<&str>, image: Option<(&[u8], &str)>) -> Self {
        self.with_json_response(candidate_json(text, image))
    }

    /// Fail every call with a freshly built error.
    pub fn with_error<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Error + Send + Sync + 'static,
    {
        self.error = Some(Arc::new(factory));
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Requests received so far, with the model id each was sent to.
    pub fn calls(&self) -> Vec<(GenerationRequest, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockGenerationClient {
    fn default() -> Self {
        Self::new()
    }
}

fn candidate_json(text: Option<&str>, image: Option<(&[u8], &str)>) -> serde_json::Value {
    let mut parts = Vec::new();
    if let Some(text) = text {
        parts.push(serde_json::json!({ "text": text }));
    }
    if let Some((bytes, mime_type)) = image {
        parts.push(serde_json::json!({
            "inlineData": {
                "mimeType": mime_type,
                "data": base64::engine::general_purpose::STANDARD.encode(bytes),
            }
        }));
    }
    serde_json::json!({
        "candidates": [{ "content": { "role": "model", "parts": parts }, "finishReason": "STOP" }]
    })
}

fn default_response() -> Result<RawResponse> {
    let pixel = image::RgbaImage::from_pixel(1, 1, image::Rgba([255, 0, 0, 255]));
    let mut png = Vec::new();
    pixel
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| Error::Invariant(format!("Failed to encode mock image: {}", e)))?;

    serde_json::from_value(candidate_json(None, Some((png.as_slice(), "image/png"))))
        .map_err(|e| Error::Invariant(format!("Failed to build mock response: {}", e)))
}

#[async_trait]
impl GenerationService for MockGenerationClient {
    async fn invoke(&self, request: &GenerationRequest, model_id: &str) -> Result<RawResponse> {
        let count = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((request.clone(), model_id.to_string()));
            calls.len()
        };

        if let Some(factory) = &self.error {
            return Err(factory());
        }

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            default_response()
        } else {
            let index = (count - 1) % responses.len();
            Ok(responses[index].clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{build_create, extract};

    #[tokio::test]
    async fn test_mock_default_response_has_image() {
        let client = MockGenerationClient::new();
        let request = build_create("anything").unwrap();

        let response = client.invoke(&request, "model-a").await.unwrap();
        let result = extract(&response).unwrap();

        let image = result.image.unwrap();
        assert_eq!(image.mime_type(), "image/png");
        assert!(image::load_from_memory(image.bytes()).is_ok());
        assert_eq!(client.get_call_count(), 1);
        assert_eq!(client.calls()[0].1, "model-a");
    }

    #[tokio::test]
    async fn test_mock_responses_cycle() {
        let client = MockGenerationClient::new()
            .with_parts(Some("one"), None)
            .with_parts(Some("two"), None);
        let request = build_create("anything").unwrap();

        let mut texts = Vec::new();
        for _ in 0..3 {
            let response = client.invoke(&request, "m").await.unwrap();
            texts.push(extract(&response).unwrap().text.unwrap());
        }
        assert_eq!(texts, vec!["one", "two", "one"]);
    }

    #[tokio::test]
    async fn test_mock_error_is_rebuilt_per_call() {
        let client = MockGenerationClient::new().with_error(|| Error::Auth("bad key".into()));
        let request = build_create("anything").unwrap();

        for _ in 0..2 {
            let err = client.invoke(&request, "m").await.unwrap_err();
            assert!(matches!(err, Error::Auth(_)));
        }
        assert_eq!(client.get_call_count(), 2);
    }
}
