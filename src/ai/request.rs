//! Request construction for create and edit calls.
//!
//! Pure functions: they validate caller input and lay out the content parts
//! in the order the model reads them. Edits place the source image first and
//! the instruction second.

use super::mime::is_supported_mime;
use crate::models::{ContentPart, GenerationRequest, ImagePart, Modality};
use crate::{Error, Result};

const RESPONSE_MODALITIES: [Modality; 2] = [Modality::Text, Modality::Image];

fn validate_prompt(prompt: &str) -> Result<()> {
    if prompt.trim().is_empty() {
        return Err(Error::InvalidInput("Prompt must not be empty".to_string()));
    }
    Ok(())
}

fn validate_source_image(image: &ImagePart) -> Result<()> {
    if image.is_empty() {
        return Err(Error::InvalidInput(
            "Source image has no content".to_string(),
        ));
    }
    if !is_supported_mime(image.mime_type()) {
        return Err(Error::InvalidInput(format!(
            "Unsupported source image type '{}'",
            image.mime_type()
        )));
    }
    Ok(())
}

pub fn build_create(prompt: &str) -> Result<GenerationRequest> {
    validate_prompt(prompt)?;

    Ok(GenerationRequest {
        parts: vec![ContentPart::Text(prompt.to_string())],
        response_modalities: RESPONSE_MODALITIES.to_vec(),
    })
}

pub fn build_edit(prompt: &str, source_image: ImagePart) -> Result<GenerationRequest> {
    validate_prompt(prompt)?;
    validate_source_image(&source_image)?;

    Ok(GenerationRequest {
        parts: vec![
            ContentPart::Image(source_image),
            ContentPart::Text(prompt.to_string()),
        ],
        response_modalities: RESPONSE_MODALITIES.to_vec(),
    })
}
