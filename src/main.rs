use clap::Parser;
use log::info;
use anyhow::Result;

mod cli;
use cli::{Commands, DamCli, OutputFormat};

#[tokio::main]
async fn main() -> Result<()> {
    // Environment variables from .env, if present
    dotenv::dotenv().ok();

    // Parse the command line arguments
    let cli = DamCli::parse();

    // Setup logging
    setup_logging(&cli.log_level);

    let format = OutputFormat::parse(&cli.output_format)?;
    let config = cli::commands::load_config(cli.config.as_deref())?;

    match &cli.command {
        Commands::Analyze { image, metadata, media_type, interactive } => {
            let completed = cli::commands::analyze::execute(
                &config,
                image,
                metadata.as_deref(),
                media_type.as_deref(),
                *interactive,
                format
            ).await?;
            if !completed {
                std::process::exit(1);
            }
        }

        Commands::Validate { image, metadata, media_type } => {
            cli::commands::validate::execute(
                &config,
                image,
                metadata.as_deref(),
                media_type.as_deref(),
                format
            )?;
        }

        Commands::Schema { findings } => {
            cli::commands::schema::execute(&config, *findings)?;
        }
    }

    Ok(())
}

fn setup_logging(log_level: &str) {
    // Set up the logger based on the log level
    let level = match log_level.to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    };

    env_logger::Builder::new().filter_level(level).init();

    info!("Logger initialized with level: {}", log_level);
}
