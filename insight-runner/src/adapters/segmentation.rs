//! Lung segmentation through an external command.
//!
//! The segmentation network is a PyTorch checkpoint; the runner hands each
//! plane to a separate process and reads the mask back. Every call gets its
//! own scratch directory and child process, both gone when the call returns.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use volview_insight_common::WireImage;

use super::{AdapterError, SegmentationAdapter};
use crate::config::SegmentationConfig;

pub struct CommandSegmentationAdapter {
    model_path: PathBuf,
    command: String,
    args: Vec<String>,
}

impl CommandSegmentationAdapter {
    pub fn new(model_path: impl Into<PathBuf>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            model_path: model_path.into(),
            command: command.into(),
            args,
        }
    }

    pub fn from_config(config: &SegmentationConfig) -> Self {
        Self::new(&config.model_path, &config.command, config.args.clone())
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    fn run(&self, input: &Path, output: &Path) -> Result<(), AdapterError> {
        let result = Command::new(&self.command)
            .args(&self.args)
            .arg("--model")
            .arg(&self.model_path)
            .arg("--input")
            .arg(input)
            .arg("--output")
            .arg(output)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| AdapterError::Backend(format!("Failed to start '{}': {}", self.command, e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(AdapterError::Backend(format!(
                "Segmentation command exited with {}: {}",
                result.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

impl SegmentationAdapter for CommandSegmentationAdapter {
    fn segment(&self, image: &WireImage) -> Result<WireImage, AdapterError> {
        if !self.model_path.exists() {
            return Err(AdapterError::MissingArtifact {
                path: self.model_path.display().to_string(),
            });
        }

        let scratch = tempfile::tempdir()
            .map_err(|e| AdapterError::Backend(format!("Failed to create scratch dir: {}", e)))?;
        let input = scratch.path().join("input.json");
        let output = scratch.path().join("output.json");

        let payload = serde_json::to_vec(image).map_err(|e| AdapterError::InvalidImage(e.to_string()))?;
        std::fs::write(&input, payload).map_err(|e| AdapterError::Backend(e.to_string()))?;

        tracing::debug!(
            command = %self.command,
            model = %self.model_path.display(),
            dimensions = ?image.dimensions,
            "Running lung segmentation"
        );
        self.run(&input, &output)?;

        let bytes = std::fs::read(&output)
            .map_err(|e| AdapterError::Backend(format!("Segmentation produced no output: {}", e)))?;
        let mask: WireImage = serde_json::from_slice(&bytes)
            .map_err(|e| AdapterError::InvalidImage(format!("Unreadable segmentation output: {}", e)))?;

        if mask.dimensions != image.dimensions {
            return Err(AdapterError::InvalidImage(format!(
                "Segmentation returned dimensions {:?} for input {:?}",
                mask.dimensions, image.dimensions
            )));
        }

        Ok(mask)
    }
}
