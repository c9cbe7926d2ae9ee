use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::StepError;
use crate::models::checklist::JobAidSchema;
use crate::models::findings::findings_json_schema;
use crate::models::input::AnalysisInput;
use crate::models::step_output::{Step1Output, Step2Output};

/// Prompt text for each step.
///
/// Templates are opaque configuration; only their `{{placeholder}}`
/// markers are interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptTemplates {
    /// Prepended to every step prompt
    pub role: String,
    /// Placeholders: `metadata`
    pub step1: String,
    /// Placeholders: `metadata`, `step1_results`, `job_aid_schema`
    pub step2: String,
    /// Placeholders: `metadata`, `step1_results`, `step2_results`, `findings_schema`
    pub step3: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            role: DEFAULT_ROLE.trim().to_string(),
            step1: DEFAULT_STEP1.trim().to_string(),
            step2: DEFAULT_STEP2.trim().to_string(),
            step3: DEFAULT_STEP3.trim().to_string(),
        }
    }
}

impl PromptTemplates {
    pub fn validate(&self) -> Result<(), String> {
        for (name, template) in [
            ("step1", &self.step1),
            ("step2", &self.step2),
            ("step3", &self.step3),
        ] {
            if template.trim().is_empty() {
                return Err(format!("prompt template '{}' is empty", name));
            }
        }
        Ok(())
    }

    pub fn step1_prompt(&self, input: &AnalysisInput) -> Result<String, StepError> {
        let mut params = HashMap::new();
        params.insert("metadata", input.metadata_block());
        self.compose(&self.step1, &params)
    }

    pub fn step2_prompt(
        &self,
        input: &AnalysisInput,
        step1: &Step1Output,
        job_aid: &JobAidSchema,
    ) -> Result<String, StepError> {
        let mut params = HashMap::new();
        params.insert("metadata", input.metadata_block());
        params.insert("step1_results", to_pretty_json(step1)?);
        params.insert("job_aid_schema", to_pretty_json(&job_aid.to_prompt_json())?);
        self.compose(&self.step2, &params)
    }

    pub fn step3_prompt(
        &self,
        input: &AnalysisInput,
        step1: &Step1Output,
        step2: &Step2Output,
    ) -> Result<String, StepError> {
        let step2_view =
            serde_json::json!({
            "checklist": step2.checklist.to_json(),
            "overall_assessment": step2.overall_assessment,
            "assessment_summary": step2.assessment_summary,
            "not_evaluated": step2.unstated_items,
        });

        let mut params = HashMap::new();
        params.insert("metadata", input.metadata_block());
        params.insert("step1_results", to_pretty_json(step1)?);
        params.insert("step2_results", to_pretty_json(&step2_view)?);
        params.insert("findings_schema", to_pretty_json(&findings_json_schema())?);
        self.compose(&self.step3, &params)
    }

    fn compose(&self, template: &str, params: &HashMap<&str, String>) -> Result<String, StepError> {
        let body = render_template(template, params)?;
        if self.role.trim().is_empty() {
            Ok(body)
        } else {
            Ok(format!("{}\n\n{}", self.role.trim(), body))
        }
    }
}

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("placeholder pattern is valid")
});

/// Replace `{{key}}` markers; a marker without a value is an error
pub fn render_template(
    template: &str,
    params: &HashMap<&str, String>,
) -> Result<String, StepError> {
    if template.trim().is_empty() {
        return Err(StepError::PromptAssembly("template is empty".to_string()));
    }

    let marker = &*PLACEHOLDER;
    let unresolved: Vec<String> = marker
        .captures_iter(template)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|name| !params.contains_key(name.as_str()))
        .collect();
    if !unresolved.is_empty() {
        return Err(StepError::PromptAssembly(format!(
            "no value for placeholder(s): {}",
            unresolved.join(", ")
        )));
    }

    let rendered = marker.replace_all(template, |caps: &regex::Captures| {
        caps.get(1)
            .and_then(|m| params.get(m.as_str()))
            .cloned()
            .unwrap_or_default()
    });
    Ok(rendered.into_owned())
}

fn to_pretty_json<T: Serialize>(value: &T) -> Result<String, StepError> {
    serde_json::to_string_pretty(value).map_err(|e| StepError::PromptAssembly(e.to_string()))
}

const DEFAULT_ROLE: &str =
    r#"
You are a professional Digital Asset Management (DAM) analyst with expertise in compliance assessment and quality control.
You evaluate digital assets for brand consistency, technical quality, legal compliance and metadata completeness,
and you report findings objectively in both technical and non-technical terms.
"#;

const DEFAULT_STEP1: &str =
    r#"
{{metadata}}

TASK:
Analyze the provided image and metadata for compliance with Digital Asset Management standards:
1. Examine the image for visual quality issues (blurriness, lighting, composition)
2. Assess technical specifications (resolution, file format, color profile)
3. Evaluate compliance with brand guidelines and legal requirements
4. Review metadata completeness and accuracy

OUTPUT INSTRUCTIONS:
Reply with a single JSON object in a ```json fenced block with exactly these fields:

```json
{
  "notes": "Detailed observations about the image and metadata",
  "job_aid_assessment": {
    "visual_quality": { "assessment": "PASS | FAIL | PARTIAL", "issues": [] },
    "technical_specifications": { "assessment": "PASS | FAIL | PARTIAL", "issues": [] },
    "brand_compliance": { "assessment": "PASS | FAIL | PARTIAL", "issues": [] },
    "metadata_completeness": { "assessment": "PASS | FAIL | PARTIAL", "issues": [] }
  },
  "human_readable_section": "Professional summary of findings",
  "next_steps": ["Recommended action"]
}
```

If you cannot produce JSON, use the headings NOTES, JOB AID ASSESSMENT, HUMAN-READABLE SECTION and NEXT STEPS.
"#;

const DEFAULT_STEP2: &str =
    r#"
{{metadata}}

STEP 1 RESULTS:
```json
{{step1_results}}
```

Using the image and the Step 1 results, complete the Digital Component Analysis Job Aid below.
For every item give an "assessment" of PASS, FAIL or PARTIAL and "notes" with your observations.
If information is missing or cannot be determined from the image and metadata, leave the assessment blank.
Never guess a status you cannot support.

DIGITAL COMPONENT ANALYSIS JOB AID:
```json
{{job_aid_schema}}
```

Reply with the completed job aid as one valid JSON object following the schema exactly.
"#;

const DEFAULT_STEP3: &str =
    r#"
{{metadata}}

STEP 1 RESULTS:
```json
{{step1_results}}
```

STEP 2 RESULTS:
```json
{{step2_results}}
```

Based on the completed job aid, produce a findings report in two formats.

1. STRUCTURED JSON OUTPUT in a ```json fenced block following this schema exactly:
```json
{{findings_schema}}
```
Set check_status to FAILED when issues_detected is not empty. Use PARTIAL only when nothing blocking
was found but the assessment could not be completed. Every item left blank in Step 2 belongs in
missing_information.

2. HUMAN-READABLE REPORT: after the JSON block, write a line "HUMAN-READABLE REPORT:" followed by a
professional communication with the overall status, the issues by category, the missing information
and actionable recommendations.

Both outputs must agree with each other and with the Step 2 assessment.
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_known_placeholders() {
        let mut params = HashMap::new();
        params.insert("name", "hero.png".to_string());
        let out = render_template("Analyze {{name}} now, {{ name }}.", &params).unwrap();
        assert_eq!(out, "Analyze hero.png now, hero.png.");
    }

    #[test]
    fn unknown_placeholder_is_prompt_assembly_error() {
        let params = HashMap::new();
        let err = render_template("Hello {{missing}}", &params).unwrap_err();
        assert!(matches!(err, StepError::PromptAssembly(msg) if msg.contains("missing")));
    }

    #[test]
    fn values_containing_braces_are_not_reinterpreted() {
        let mut params = HashMap::new();
        params.insert("metadata", "{{component_id}}".to_string());
        let out = render_template("M: {{metadata}}", &params).unwrap();
        assert_eq!(out, "M: {{component_id}}");
    }

    #[test]
    fn default_templates_are_valid() {
        let templates = PromptTemplates::default();
        assert!(templates.validate().is_ok());
        assert!(templates.step3.contains("HUMAN-READABLE REPORT:"));
    }
}
