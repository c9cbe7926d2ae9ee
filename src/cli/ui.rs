use colored::*;
use console::Term;
use dialoguer::{theme::ColorfulTheme, Confirm};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use textwrap::wrap;

use dam_compliance::models::common::{CheckStatus, ItemStatus};

/// UI theme for consistent appearance
pub fn get_theme() -> ColorfulTheme {
    ColorfulTheme::default()
}

fn term_width() -> usize {
    let width = Term::stdout().size().1 as usize;
    if width == 0 { 80 } else { width }
}

/// Print a section header
pub fn print_header(title: &str) {
    let title = format!(" {} ", title);
    println!("\n{}\n", title.bold().white().on_blue());
}

/// Print text with proper wrapping
pub fn print_text(text: &str) {
    let width = term_width();
    for line in text.lines() {
        if line.starts_with('#')
            || line.chars().all(|c| !c.is_lowercase()) && !line.trim().is_empty()
        {
            println!("{}", line.bold());
        } else if line.trim_start().starts_with('-') {
            println!("{}", line);
        } else {
            for wrapped_line in wrap(line, width.saturating_sub(10).max(20)) {
                println!("{}", wrapped_line);
            }
        }
    }
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "ERROR:".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "WARNING:".yellow().bold(), message);
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "SUCCESS:".green().bold(), message);
}

/// Print information
pub fn print_info(message: &str) {
    println!("{} {}", "INFO:".blue().bold(), message);
}

/// Print a formatted result
pub fn print_result(label: &str, value: &str) {
    println!("{}: {}", label.bold(), value);
}

/// Overall check status with color
pub fn print_check_status(status: CheckStatus) {
    match status {
        CheckStatus::Passed => println!("{}", "✓ PASSED".green().bold()),
        CheckStatus::Failed => println!("{}", "✗ FAILED".red().bold()),
        CheckStatus::Partial => println!("{}", "? PARTIAL".yellow().bold()),
    }
}

/// One checklist line, colored by status
pub fn print_item_status(path: &str, status: ItemStatus, notes: Option<&str>) {
    let label = match status {
        ItemStatus::Pass => "PASS".green(),
        ItemStatus::Fail => "FAIL".red(),
        ItemStatus::Partial => "PARTIAL".yellow(),
        ItemStatus::Blank => "not evaluated".dimmed(),
    };
    match notes {
        Some(notes) => println!("  {:<60} {} ({})", path, label, notes),
        None => println!("  {:<60} {}", path, label),
    }
}

/// Confirm an action with the user
pub fn confirm_action(prompt: &str) -> std::io::Result<bool> {
    Confirm::with_theme(&get_theme())
        .with_prompt(prompt)
        .default(true)
        .interact()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
}

/// Display a spinner while waiting for an operation to complete
pub fn spinner_with_message(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} {msg}")
    {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
