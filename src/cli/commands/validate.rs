use anyhow::Result;
use std::path::Path;

use dam_compliance::implementations::config::AnalyzerConfig;

use crate::cli::commands::load_input;
use crate::cli::{ui, OutputFormat};

/// Input validation command. Never calls the model.
pub fn execute(
    config: &AnalyzerConfig,
    image_path: &Path,
    metadata_path: Option<&Path>,
    media_type: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let input = load_input(image_path, metadata_path, media_type, config.limits.max_image_bytes)?;
    let missing = input.missing_recommended_fields();

    if format == OutputFormat::Json {
        let report =
            serde_json::json!({
            "valid": true,
            "media_type": input.media_type().mime(),
            "image_bytes": input.image().len(),
            "metadata_fields": input.metadata().keys().collect::<Vec<_>>(),
            "missing_recommended_fields": missing,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    ui::print_header("Validating Input");
    ui::print_result("Image", &image_path.display().to_string());
    ui::print_result("Media type", input.media_type().mime());
    ui::print_result("Size", &format!("{} bytes", input.image().len()));
    ui::print_result("Metadata fields", &input.metadata().len().to_string());

    for field in &missing {
        ui::print_warning(&format!("Recommended metadata field '{}' is missing", field));
    }
    if !input.has_metadata() {
        ui::print_warning(
            "No metadata supplied; metadata checks will be reported as missing information",
        );
    }
    ui::print_success("Input is valid");
    Ok(())
}
