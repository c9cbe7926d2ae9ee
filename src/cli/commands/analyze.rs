use anyhow::{anyhow, Result};
use colored::*;
use std::path::Path;
use std::sync::Arc;

use dam_compliance::errors::{RecoverableError, WorkflowError};
use dam_compliance::implementations::config::AnalyzerConfig;
use dam_compliance::implementations::GeminiOrchestrator;
use dam_compliance::models::step_output::{Step1Output, Step2Output, Step3Output};
use dam_compliance::models::workflow::{RunStatus, WorkflowResult, WorkflowState};

use crate::cli::commands::load_input;
use crate::cli::{ui, OutputFormat};

/// Runs the three-step analysis. Returns whether the run completed.
pub async fn execute(
    config: &AnalyzerConfig,
    image_path: &Path,
    metadata_path: Option<&Path>,
    media_type: Option<&str>,
    interactive: bool,
    format: OutputFormat,
) -> Result<bool> {
    let input = load_input(image_path, metadata_path, media_type, config.limits.max_image_bytes)?;

    if !input.has_metadata() {
        ui::print_warning("No metadata supplied; metadata-dependent checks cannot be evaluated");
        if interactive && !ui::confirm_action("Continue without metadata?")? {
            ui::print_info("Analysis cancelled.");
            return Ok(false);
        }
    } else {
        for field in input.missing_recommended_fields() {
            ui::print_warning(&format!("Recommended metadata field '{}' is missing", field));
        }
    }

    let spinner = ui::spinner_with_message("Starting analysis...");
    let progress = spinner.clone();
    let orchestrator = GeminiOrchestrator::from_config(config)?.with_observer(
        Arc::new(move |state: &WorkflowState| {
            if let Some(step) = state.running_step() {
                progress.set_message(format!("Running {}...", step));
            }
        })
    );

    let cancel = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let outcome = orchestrator.run_cancellable(&input, cancel).await;
    spinner.finish_and_clear();

    let result = match outcome {
        Ok(result) => result,
        Err(WorkflowError::Cancelled { step }) => {
            ui::print_warning(&format!("Analysis cancelled during {}", step));
            return Ok(false);
        }
        Err(err) => return Err(anyhow!(err)),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => render_text(&result),
    }
    Ok(result.is_completed())
}

fn render_text(result: &WorkflowResult) {
    if let Some(step1) = &result.step1 {
        render_step1(step1);
    }
    if let Some(step2) = &result.step2 {
        render_step2(step2);
    }
    if let Some(step3) = &result.step3 {
        render_step3(step3);
    }

    ui::print_header("Run Status");
    ui::print_result("Started", &result.started_at.to_rfc3339());
    ui::print_result("Elapsed", &format!("{} ms", result.elapsed_ms));
    match &result.status {
        RunStatus::Completed => ui::print_success("All three steps completed"),
        RunStatus::FailedAtStep { step, reason } => {
            ui::print_error(&format!("Failed at {}: {}", step, reason));
            if let Some(hint) = reason.recovery_strategy() {
                ui::print_info(&hint);
            }
        }
    }
}

fn render_step1(output: &Step1Output) {
    ui::print_header("Step 1: DAM Analysis");
    ui::print_text(&output.notes);
    if !output.job_aid_assessment.is_empty() {
        println!("\n{}", "Preliminary assessment:".bold());
        for (area, assessment) in &output.job_aid_assessment {
            let notes = assessment.issues.join("; ");
            ui::print_item_status(
                area,
                assessment.assessment,
                Some(notes.as_str()).filter(|n| !n.is_empty()),
            );
        }
    }
    if !output.next_steps.is_empty() {
        println!("\n{}", "Next steps:".bold());
        for (i, step) in output.next_steps.iter().enumerate() {
            println!("  {}. {}", i + 1, step);
        }
    }
}

fn render_step2(output: &Step2Output) {
    ui::print_header("Step 2: Job Aid Assessment");
    for (path, item) in output.checklist.items() {
        ui::print_item_status(&path, item.status, item.notes.as_deref());
    }
    println!();
    ui::print_text(&output.assessment_summary);
}

fn render_step3(output: &Step3Output) {
    ui::print_header("Step 3: Findings");
    ui::print_check_status(output.findings.check_status);
    println!();
    ui::print_text(&output.narrative);
    if output.narrative_synthesized {
        ui::print_info("The report above was generated from the structured findings.");
    }
    if output.findings_synthesized {
        ui::print_warning("The structured findings were read from the report text.");
    }
}
