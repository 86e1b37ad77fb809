use super::client::GeminiHttpClient;
use super::types::{Content, GenerateContentResponse, Part};
use crate::ai::GenerationService;
use crate::models::{Config, Credentials, GenerationRequest};
use crate::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ImageRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: ImageGenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageGenerationConfig {
    response_modalities: Vec<String>,
}

impl From<&GenerationRequest> for ImageRequest {
    fn from(request: &GenerationRequest) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: request.parts().iter().map(Part::from).collect(),
            }],
            generation_config: ImageGenerationConfig {
                response_modalities: request
                    .response_modalities()
                    .iter()
                    .map(|m| m.as_str().to_string())
                    .collect(),
            },
        }
    }
}

/// [`GenerationService`] backed by Gemini's `generateContent` endpoint.
pub struct GeminiImageClient {
    http: GeminiHttpClient,
}

impl GeminiImageClient {
    pub fn new(credentials: Credentials, timeout: Duration) -> Self {
        Self::new_with_client(credentials, timeout, reqwest::Client::new())
    }

    pub fn new_with_client(
        credentials: Credentials,
        timeout: Duration,
        client: reqwest::Client,
    ) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(credentials, timeout, client),
        }
    }

    /// Reads credentials and timeout from `config` once, at construction.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.credentials.clone(), config.timeout)
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }
}

#[async_trait]
impl GenerationService for GeminiImageClient {
    async fn invoke(
        &self,
        request: &GenerationRequest,
        model_id: &str,
    ) -> Result<GenerateContentResponse> {
        tracing::debug!(
            "Sending {} content part(s) to Gemini model {}",
            request.parts().len(),
            model_id
        );

        let payload = ImageRequest::from(request);
        self.http.generate_content(model_id, &payload).await
    }
}
