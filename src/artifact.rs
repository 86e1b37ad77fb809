//! Artifact persistence
//!
//! Validates generated image bytes and writes them to disk atomically: the
//! payload goes to a temporary file in the destination directory and is then
//! renamed into place, so the destination is either the complete new file or
//! untouched.

use crate::ai::mime::{detect_image_mime, image_format_for_mime};
use crate::models::{ImagePart, PersistedArtifact};
use crate::{Error, Result};
use image::ImageFormat;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactPersister;

impl ArtifactPersister {
    pub fn new() -> Self {
        Self
    }

    /// Validate `image` and write its bytes to `destination`.
    pub async fn persist(&self, image: &ImagePart, destination: &Path) -> Result<PersistedArtifact> {
        tokio::task::spawn_blocking({
            let image = image.clone();
            let destination = destination.to_path_buf();
            move || Self::persist_sync(&image, &destination)
        })
        .await
        .map_err(|e| Error::Invariant(format!("Persist task join error: {}", e)))?
    }

    /// Write the prompt next to an artifact (`out/a.png` -> `out/a.prompt.txt`).
    pub async fn write_prompt_sidecar(&self, prompt: &str, artifact_path: &Path) -> Result<PathBuf> {
        let sidecar = prompt_sidecar_path(artifact_path);
        tokio::task::spawn_blocking({
            let prompt = prompt.to_string();
            let sidecar = sidecar.clone();
            move || write_atomic(&sidecar, prompt.as_bytes())
        })
        .await
        .map_err(|e| Error::Invariant(format!("Sidecar task join error: {}", e)))??;
        Ok(sidecar)
    }

    fn persist_sync(image: &ImagePart, destination: &Path) -> Result<PersistedArtifact> {
        let format = validate_image(image)?;
        warn_on_extension_mismatch(destination, format);

        let bytes_written = write_atomic(destination, image.bytes())?;
        tracing::info!(
            "Image saved to {} ({} bytes)",
            destination.display(),
            bytes_written
        );

        Ok(PersistedArtifact {
            path: destination.to_path_buf(),
            bytes_written,
        })
    }
}

/// Decode `image` far enough to prove it is a well-formed image of its
/// declared format.
pub fn validate_image(image: &ImagePart) -> Result<ImageFormat> {
    let format = image_format_for_mime(image.mime_type()).ok_or_else(|| {
        Error::CorruptArtifact(format!("Unsupported image type '{}'", image.mime_type()))
    })?;

    match detect_image_mime(image.bytes()).and_then(image_format_for_mime) {
        Some(sniffed) if sniffed == format => {}
        Some(sniffed) => {
            return Err(Error::CorruptArtifact(format!(
                "Payload is {:?} but was declared as '{}'",
                sniffed,
                image.mime_type()
            )))
        }
        None => {
            return Err(Error::CorruptArtifact(format!(
                "Payload is not a recognizable '{}' image",
                image.mime_type()
            )))
        }
    }

    image::load_from_memory_with_format(image.bytes(), format)
        .map_err(|e| Error::CorruptArtifact(format!("Failed to decode image: {}", e)))?;

    Ok(format)
}

fn warn_on_extension_mismatch(destination: &Path, format: ImageFormat) {
    let Some(expected) = ImageFormat::from_path(destination).ok() else {
        return;
    };
    if expected != format {
        tracing::warn!(
            "Writing {:?} data to {} whose extension suggests {:?}",
            format,
            destination.display(),
            expected
        );
    }
}

pub fn prompt_sidecar_path(artifact_path: &Path) -> PathBuf {
    artifact_path.with_extension("prompt.txt")
}

/// Write `bytes` to `destination` via a sibling temp file and rename.
///
/// Missing parent directories are created. The temp file is removed on any
/// failure before the rename.
fn write_atomic(destination: &Path, bytes: &[u8]) -> Result<u64> {
    let persistence = |source: std::io::Error| Error::Persistence {
        path: destination.to_path_buf(),
        source,
    };

    if destination.file_name().is_none() {
        return Err(persistence(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "destination has no file name",
        )));
    }

    let parent = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(persistence)?;

    let mut temp = new_temp_file(parent).map_err(persistence)?;
    // Overwrites keep the mode of the file they replace.
    if let Ok(existing) = std::fs::metadata(destination) {
        temp.as_file()
            .set_permissions(existing.permissions())
            .map_err(persistence)?;
    }
    temp.write_all(bytes).map_err(persistence)?;
    temp.as_file().sync_all().map_err(persistence)?;
    temp.persist(destination).map_err(|e| persistence(e.error))?;

    Ok(bytes.len() as u64)
}

/// Temp file whose mode matches a plain `fs::write` (0o666 less the umask)
/// rather than tempfile's private 0o600.
#[cfg(unix)]
fn new_temp_file(parent: &Path) -> std::io::Result<NamedTempFile> {
    use std::os::unix::fs::PermissionsExt;

    tempfile::Builder::new()
        .permissions(std::fs::Permissions::from_mode(0o666))
        .tempfile_in(parent)
}

#[cfg(not(unix))]
fn new_temp_file(parent: &Path) -> std::io::Result<NamedTempFile> {
    NamedTempFile::new_in(parent)
}
