use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

use dam_compliance::errors::ValidationError;
use dam_compliance::implementations::config::AnalyzerConfig;
use dam_compliance::models::common::MediaType;
use dam_compliance::models::input::AnalysisInput;

use crate::cli::ui;

pub mod analyze;
pub mod schema;
pub mod validate;

/// Configuration from `--config`, or the defaults
pub fn load_config(path: Option<&Path>) -> Result<AnalyzerConfig> {
    match path {
        Some(path) => {
            ui::print_info(&format!("Using configuration: {}", path.display()));
            AnalyzerConfig::from_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))
        }
        None => Ok(AnalyzerConfig::default()),
    }
}

/// Read and validate the image and metadata files
pub fn load_input(
    image_path: &Path,
    metadata_path: Option<&Path>,
    media_type: Option<&str>,
    max_image_bytes: usize,
) -> Result<AnalysisInput> {
    let image = fs::read(image_path)
        .map_err(|e| anyhow!("Failed to read image {}: {}", image_path.display(), e))?;

    let declared = media_type.map(MediaType::from_name).transpose()?;

    let metadata = match metadata_path {
        Some(path) => {
            let content = fs::read_to_string(path)
                .map_err(|e| anyhow!("Failed to read metadata {}: {}", path.display(), e))?;
            if content.trim().is_empty() {
                None
            } else {
                let value: Value = serde_json::from_str(&content)
                    .map_err(|e| ValidationError::InvalidMetadata(e.to_string()))?;
                Some(value)
            }
        }
        None => None,
    };

    Ok(AnalysisInput::with_size_limit(image, declared, metadata, max_image_bytes)?)
}
