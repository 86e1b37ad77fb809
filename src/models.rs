//! Data models and structures
//!
//! Defines the per-call content model (parts, requests, results, artifacts)
//! and the environment-backed configuration consumed once at startup.

use crate::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image-preview";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Binary image payload plus its declared mime type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePart {
    bytes: Vec<u8>,
    mime_type: String,
}

impl ImagePart {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A single unit of multimodal content. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    Image(ImagePart),
}

impl ContentPart {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentPart::Text(text) => Some(text),
            ContentPart::Image(_) => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImagePart> {
        match self {
            ContentPart::Text(_) => None,
            ContentPart::Image(image) => Some(image),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modality {
    Text,
    Image,
}

impl Modality {
    /// Wire name used in `responseModalities`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Text => "TEXT",
            Modality::Image => "IMAGE",
        }
    }
}

/// Ordered content plus the modalities the caller wants back.
///
/// Built only through [`crate::ai::request`], which guarantees a valid
/// prompt, a valid source image, and both modalities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub(crate) parts: Vec<ContentPart>,
    pub(crate) response_modalities: Vec<Modality>,
}

impl GenerationRequest {
    pub fn parts(&self) -> &[ContentPart] {
        &self.parts
    }

    pub fn response_modalities(&self) -> &[Modality] {
        &self.response_modalities
    }
}

/// Text and (first) image pulled out of a response candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationResult {
    pub text: Option<String>,
    pub image: Option<ImagePart>,
    /// Why the candidate stopped, when the service says (e.g. `SAFETY`).
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedArtifact {
    pub path: PathBuf,
    pub bytes_written: u64,
}

/// Result of a create/edit call that did not hard-fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Saved {
        artifact: PersistedArtifact,
        text: Option<String>,
    },
    /// The service answered but produced no image (e.g. a refusal).
    NoImage {
        text: Option<String>,
        finish_reason: Option<String>,
    },
}

impl Outcome {
    pub fn artifact(&self) -> Option<&PersistedArtifact> {
        match self {
            Outcome::Saved { artifact, .. } => Some(artifact),
            Outcome::NoImage { .. } => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Outcome::Saved { text, .. } | Outcome::NoImage { text, .. } => text.as_deref(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Saved { .. } => 0,
            Outcome::NoImage { .. } => crate::error::NO_IMAGE_EXIT_CODE,
        }
    }
}

/// How requests authenticate against the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Gemini Developer API key.
    ApiKey(String),
    /// Vertex AI project with an OAuth bearer token.
    Vertex {
        project: String,
        location: String,
        access_token: String,
    },
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub model: String,
    pub timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. `from_env` delegates here.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let credentials = if let Some(api_key) = var("GEMINI_API_KEY") {
            Credentials::ApiKey(api_key)
        } else if var("GOOGLE_GENAI_USE_VERTEXAI")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
        {
            let project = var("GOOGLE_CLOUD_PROJECT").ok_or_else(|| {
                Error::Config(
                    "GOOGLE_CLOUD_PROJECT must be set when GOOGLE_GENAI_USE_VERTEXAI is true"
                        .to_string(),
                )
            })?;
            let access_token = var("GOOGLE_CLOUD_ACCESS_TOKEN").ok_or_else(|| {
                Error::Config(
                    "GOOGLE_CLOUD_ACCESS_TOKEN must be set when GOOGLE_GENAI_USE_VERTEXAI is true"
                        .to_string(),
                )
            })?;
            Credentials::Vertex {
                project,
                location: var("GOOGLE_CLOUD_LOCATION").unwrap_or_else(|| "global".to_string()),
                access_token,
            }
        } else {
            return Err(Error::Config(
                "Set GEMINI_API_KEY, or GOOGLE_GENAI_USE_VERTEXAI=true with GOOGLE_CLOUD_PROJECT \
                 and GOOGLE_CLOUD_ACCESS_TOKEN"
                    .to_string(),
            ));
        };

        let timeout_secs = match var("GEMINI_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    Error::Config(format!(
                        "GEMINI_TIMEOUT_SECS must be a positive integer, got '{}'",
                        raw
                    ))
                })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            credentials,
            model: var("IMAGE_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}
