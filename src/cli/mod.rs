use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;
pub mod ui;

#[derive(Parser)]
#[command(
    name = "damc",
    about = "Checks digital assets against a compliance job aid using a multimodal model",
    version,
    author,
    long_about = None
)]
pub struct DamCli {
    /// Sets the log level (error, warn, info, debug, trace)
    #[arg(short, long, global = true, default_value = "info")]
    pub log_level: String,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(long, global = true, default_value = "text")]
    pub output_format: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the three-step compliance analysis on an image
    Analyze {
        /// Path to the image (JPEG or PNG)
        #[arg(short, long)]
        image: PathBuf,

        /// Path to a JSON file with component metadata
        #[arg(short, long)]
        metadata: Option<PathBuf>,

        /// Declared media type (jpeg, png); detected from the file when omitted
        #[arg(long)]
        media_type: Option<String>,

        /// Ask before running without metadata
        #[arg(long, default_value = "false")]
        interactive: bool,
    },

    /// Validate an image and its metadata without calling the model
    Validate {
        /// Path to the image (JPEG or PNG)
        #[arg(short, long)]
        image: PathBuf,

        /// Path to a JSON file with component metadata
        #[arg(short, long)]
        metadata: Option<PathBuf>,

        /// Declared media type (jpeg, png)
        #[arg(long)]
        media_type: Option<String>,
    },

    /// Print the checklist schema used for Step 2
    Schema {
        /// Print the Step 3 findings schema instead
        #[arg(long, default_value = "false")]
        findings: bool,
    },
}

/// Rendering selected with `--output-format`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(anyhow::anyhow!(
                "Unknown output format '{}', expected text or json",
                other
            )),
        }
    }
}
