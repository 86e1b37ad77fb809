//! AI service integration for image generation and editing
//!
//! Builds multimodal requests, sends them to Gemini, and pulls text and image
//! parts back out of the response.

pub mod extract;
pub mod gemini;
pub mod mime;
pub mod mock;
pub mod request;

pub use extract::extract;
pub use gemini::{GeminiHttpClient, GeminiImageClient};
pub use mock::MockGenerationClient;
pub use request::{build_create, build_edit};

use crate::models::GenerationRequest;
use crate::Result;
use async_trait::async_trait;

/// Raw, multi-candidate service response before extraction.
pub type RawResponse = gemini::types::GenerateContentResponse;

/// One outbound call per `invoke`; implementations never retry internally.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn invoke(&self, request: &GenerationRequest, model_id: &str) -> Result<RawResponse>;
}
