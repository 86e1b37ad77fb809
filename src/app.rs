//! Orchestration of create and edit calls.

use crate::ai::mime::detect_image_mime;
use crate::ai::{build_create, build_edit, extract, GeminiImageClient, GenerationService};
use crate::artifact::ArtifactPersister;
use crate::models::{Config, GenerationRequest, ImagePart, Outcome};
use crate::{Error, Result};
use std::path::Path;
use tracing::info;

/// Runs the request → invoke → extract → persist pipeline, one stage at a time.
pub struct Orchestrator {
    service: Box<dyn GenerationService>,
    persister: ArtifactPersister,
}

impl Orchestrator {
    /// Build an orchestrator from a concrete service.
    ///
    /// This is primarily useful for tests and harnesses that inject mocks.
    pub fn with_service(service: Box<dyn GenerationService>) -> Self {
        Self {
            service,
            persister: ArtifactPersister::new(),
        }
    }

    /// Construct an orchestrator talking to Gemini with `config`'s credentials.
    pub fn new(config: &Config) -> Self {
        Self::with_service(Box::new(GeminiImageClient::from_config(config)))
    }

    pub fn persister(&self) -> &ArtifactPersister {
        &self.persister
    }

    /// Generate a new image from `prompt` and save it to `output_path`.
    pub async fn create(&self, prompt: &str, output_path: &Path, model_id: &str) -> Result<Outcome> {
        info!("Generating image with prompt: '{}'", prompt);

        let request = build_create(prompt)?;
        self.run(request, output_path, model_id).await
    }

    /// Edit the image at `source_path` according to `prompt`.
    ///
    /// The source is read before anything is sent, so a missing file fails
    /// without a network call.
    pub async fn edit(
        &self,
        prompt: &str,
        source_path: &Path,
        output_path: &Path,
        model_id: &str,
    ) -> Result<Outcome> {
        info!(
            "Editing image '{}' with prompt: '{}'",
            source_path.display(),
            prompt
        );

        let source = load_source_image(source_path).await?;
        let request = build_edit(prompt, source)?;
        self.run(request, output_path, model_id).await
    }

    async fn run(
        &self,
        request: GenerationRequest,
        output_path: &Path,
        model_id: &str,
    ) -> Result<Outcome> {
        let response = self.service.invoke(&request, model_id).await?;
        let result = extract(&response)?;

        match result.image {
            Some(image) => {
                let artifact = self.persister.persist(&image, output_path).await?;
                Ok(Outcome::Saved {
                    artifact,
                    text: result.text,
                })
            }
            None => Ok(Outcome::NoImage {
                text: result.text,
                finish_reason: result.finish_reason,
            }),
        }
    }
}

async fn load_source_image(path: &Path) -> Result<ImagePart> {
    let bytes = tokio::fs::read(path).await.map_err(|source| Error::SourceRead {
        path: path.to_path_buf(),
        source,
    })?;

    let mime_type = detect_image_mime(&bytes).ok_or_else(|| {
        Error::InvalidInput(format!(
            "'{}' is not a supported image (png, jpeg, webp, gif)",
            path.display()
        ))
    })?;

    tracing::debug!(
        "Loaded source image {} ({} bytes, {})",
        path.display(),
        bytes.len(),
        mime_type
    );
    Ok(ImagePart::new(bytes, mime_type))
}
