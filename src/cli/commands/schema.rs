use anyhow::Result;

use dam_compliance::implementations::config::AnalyzerConfig;
use dam_compliance::models::findings::findings_json_schema;

use crate::cli::ui;

/// Print the job aid (or the Step 3 findings schema) as JSON
pub fn execute(config: &AnalyzerConfig, findings: bool) -> Result<()> {
    if findings {
        println!("{}", serde_json::to_string_pretty(&findings_json_schema())?);
        return Ok(());
    }

    let job_aid = config.analyzer_options().job_aid;
    ui::print_info(&format!(
        "{} checklist items in {} categories",
        job_aid.item_count(),
        job_aid.categories.len()
    ));
    println!("{}", serde_json::to_string_pretty(&job_aid.to_prompt_json())?);
    Ok(())
}
