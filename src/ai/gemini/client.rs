use crate::error::TransportKind;
use crate::models::Credentials;
use crate::{Error, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEVELOPER_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Standard Google API error envelope.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    details: Vec<serde_json::Value>,
}

/// Lightweight Gemini REST client for the `generateContent` endpoint.
///
/// Works against either the Developer API (API key) or Vertex AI (bearer
/// token), chosen by the [`Credentials`] it was built with.
pub struct GeminiHttpClient {
    client: Client,
    credentials: Credentials,
    base_url: String,
    timeout: Duration,
}

impl GeminiHttpClient {
    pub fn new(credentials: Credentials, timeout: Duration) -> Self {
        Self::new_with_client(credentials, timeout, Client::new())
    }

    pub fn new_with_client(credentials: Credentials, timeout: Duration, client: Client) -> Self {
        let base_url = match &credentials {
            Credentials::ApiKey(_) => DEVELOPER_API_BASE_URL.to_string(),
            Credentials::Vertex { location, .. } if location == "global" => {
                "https://aiplatform.googleapis.com".to_string()
            }
            Credentials::Vertex { location, .. } => {
                format!("https://{}-aiplatform.googleapis.com", location)
            }
        };

        Self {
            client,
            credentials,
            base_url,
            timeout,
        }
    }

    /// Point requests at a different host (a proxy or a local mock server).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn generate_content_url(&self, model: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        match &self.credentials {
            Credentials::ApiKey(_) => format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, model
            ),
            Credentials::Vertex {
                project, location, ..
            } => format!(
                "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
                self.base_url, project, location, model
            ),
        }
    }

    /// Calls `generateContent` once. No retries.
    pub async fn generate_content<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        model: &str,
        request: &Req,
    ) -> Result<Resp> {
        let url = self.generate_content_url(model);

        let builder = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .header("Content-Type", "application/json");
        let builder = match &self.credentials {
            Credentials::ApiKey(api_key) => builder.header("x-goog-api-key", api_key),
            Credentials::Vertex { access_token, .. } => builder.bearer_auth(access_token),
        };

        let response = builder.json(request).send().await.map_err(|e| {
            tracing::error!("Failed to send request to Gemini: {}", e);
            Error::from(e)
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await?;
            tracing::error!("Gemini API error (status {}): {}", status, error_text);
            return Err(classify_error_status(status, &error_text));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse Gemini response: {}\nBody: {}", e, body);
            Error::transport(TransportKind::Decode, e)
        })
    }
}

/// Map a non-success HTTP status and body onto the error taxonomy.
///
/// Credential problems become [`Error::Auth`]; everything else the service
/// declined is [`Error::RemoteRejection`] with the remote message verbatim.
pub(crate) fn classify_error_status(status: u16, body: &str) -> Error {
    let parsed = serde_json::from_str::<ApiErrorResponse>(body).ok();
    let message = parsed
        .as_ref()
        .map(|e| e.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.to_string());

    let invalid_api_key = parsed.as_ref().is_some_and(|e| {
        e.error
            .details
            .iter()
            .any(|d| d.get("reason").and_then(|r| r.as_str()) == Some("API_KEY_INVALID"))
    });
    let quota = message.to_lowercase().contains("quota")
        || parsed
            .as_ref()
            .is_some_and(|e| e.error.status == "RESOURCE_EXHAUSTED");

    match status {
        401 => Error::Auth(message),
        403 if !quota => Error::Auth(message),
        400 if invalid_api_key => Error::Auth(message),
        _ => Error::RemoteRejection { status, message },
    }
}
