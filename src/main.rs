use anyhow::Result;
use clap::{Parser, Subcommand};
use image_generator::app::Orchestrator;
use image_generator::models::{Config, Outcome};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "image-generator")]
#[command(about = "Create and edit images with Gemini")]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create an image from a prompt.
    Create {
        /// The text prompt.
        prompt: String,
        /// Output path for the generated image.
        #[arg(short, long, default_value = "output/generated_image.png")]
        output: PathBuf,
        /// Model to use instead of the configured IMAGE_MODEL.
        #[arg(long)]
        model: Option<String>,
    },
    /// Edit an existing image.
    Edit {
        /// The text prompt for editing.
        prompt: String,
        /// Path to the base image to edit.
        image_path: PathBuf,
        /// Output path for the edited image.
        #[arg(short, long, default_value = "output/edited_image.png")]
        output: PathBuf,
        /// Model to use instead of the configured IMAGE_MODEL.
        #[arg(long)]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "image_generator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(e.exit_code());
        }
    };
    let orchestrator = Orchestrator::new(&config);

    let (prompt, output, result) = match args.command {
        Command::Create {
            prompt,
            output,
            model,
        } => {
            let model = model.unwrap_or_else(|| config.model.clone());
            let result = orchestrator.create(&prompt, &output, &model).await;
            (prompt, output, result)
        }
        Command::Edit {
            prompt,
            image_path,
            output,
            model,
        } => {
            let model = model.unwrap_or_else(|| config.model.clone());
            let result = orchestrator
                .edit(&prompt, &image_path, &output, &model)
                .await;
            (prompt, output, result)
        }
    };

    match result {
        Ok(outcome) => match report(&orchestrator, &prompt, &output, &outcome).await {
            Ok(()) => std::process::exit(outcome.exit_code()),
            Err(e) => {
                error!("Failed to save prompt next to image: {}", e);
                std::process::exit(e.exit_code());
            }
        },
        Err(e) => {
            error!("Generation failed: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

/// Log the outcome and, when an image was saved, write the prompt sidecar.
async fn report(
    orchestrator: &Orchestrator,
    prompt: &str,
    output: &Path,
    outcome: &Outcome,
) -> image_generator::Result<()> {
    match outcome {
        Outcome::Saved { artifact, text } => {
            info!("Image successfully saved to: {}", artifact.path.display());
            if let Some(text) = text {
                info!("Model says: {}", text);
            }
            let sidecar = orchestrator
                .persister()
                .write_prompt_sidecar(prompt, output)
                .await?;
            info!("Prompt saved to: {}", sidecar.display());
        }
        Outcome::NoImage {
            text,
            finish_reason,
        } => {
            warn!(
                "No image produced (finish reason: {}); model says: {}",
                finish_reason.as_deref().unwrap_or("unspecified"),
                text.as_deref().unwrap_or("<no text>")
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image_generator::ai::MockGenerationClient;
    use image_generator::models::PersistedArtifact;
    use image_generator::Error;
    use tempfile::tempdir;

    fn saved(path: &Path) -> Outcome {
        Outcome::Saved {
            artifact: PersistedArtifact {
                path: path.to_path_buf(),
                bytes_written: 3,
            },
            text: None,
        }
    }

    #[test]
    fn test_create_defaults() {
        let args = CliArgs::try_parse_from(["image-generator", "create", "a red circle"]).unwrap();
        match args.command {
            Command::Create {
                prompt,
                output,
                model,
            } => {
                assert_eq!(prompt, "a red circle");
                assert_eq!(output, PathBuf::from("output/generated_image.png"));
                assert!(model.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_edit_arguments() {
        let args = CliArgs::try_parse_from([
            "image-generator",
            "edit",
            "make it blue",
            "in.png",
            "-o",
            "out/b.png",
            "--model",
            "gemini-2.5-flash-image",
        ])
        .unwrap();
        match args.command {
            Command::Edit {
                prompt,
                image_path,
                output,
                model,
            } => {
                assert_eq!(prompt, "make it blue");
                assert_eq!(image_path, PathBuf::from("in.png"));
                assert_eq!(output, PathBuf::from("out/b.png"));
                assert_eq!(model.as_deref(), Some("gemini-2.5-flash-image"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_edit_requires_image_path() {
        assert!(CliArgs::try_parse_from(["image-generator", "edit", "prompt"]).is_err());
    }

    #[tokio::test]
    async fn test_report_writes_prompt_sidecar() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("a.png");
        let orchestrator = Orchestrator::with_service(Box::new(MockGenerationClient::new()));

        report(&orchestrator, "a red circle", &output, &saved(&output))
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("a.prompt.txt")).unwrap(),
            "a red circle"
        );
    }

    #[tokio::test]
    async fn test_blocked_sidecar_fails_with_persistence_exit_code() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("a.png");
        std::fs::create_dir(dir.path().join("a.prompt.txt")).unwrap();
        let orchestrator = Orchestrator::with_service(Box::new(MockGenerationClient::new()));

        let err = report(&orchestrator, "a red circle", &output, &saved(&output))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Persistence { .. }));
        assert_eq!(err.exit_code(), 8);
    }

    #[tokio::test]
    async fn test_no_image_report_writes_nothing() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("a.png");
        let orchestrator = Orchestrator::with_service(Box::new(MockGenerationClient::new()));
        let outcome = Outcome::NoImage {
            text: Some("I can't help with that".to_string()),
            finish_reason: Some("STOP".to_string()),
        };

        report(&orchestrator, "refuse this", &output, &outcome)
            .await
            .unwrap();

        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }
}
