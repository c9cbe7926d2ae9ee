use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::common::CheckStatus;

/// Heading used when the report has to be built from the findings
pub const SYNTHESIZED_REPORT_TITLE: &str = "DIGITAL ASSET COMPLIANCE ASSESSMENT REPORT";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingInfo {
    pub field: String,
    pub description: String,
    #[serde(default)]
    pub action: String,
}

/// Machine-readable Step 3 findings.
///
/// The field names are part of the external contract and must not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Findings {
    pub component_id: String,
    pub component_name: String,
    pub check_status: CheckStatus,
    pub issues_detected: Vec<Issue>,
    pub missing_information: Vec<MissingInfo>,
    pub recommendations: Vec<String>,
}

impl Findings {
    /// Apply the status rule: any issue fails the check, `PARTIAL` survives only
    /// when the model reported it and nothing blocking was found.
    pub fn derive_status(issues: &[Issue], reported: Option<CheckStatus>) -> CheckStatus {
        if !issues.is_empty() {
            CheckStatus::Failed
        } else if reported == Some(CheckStatus::Partial) {
            CheckStatus::Partial
        } else {
            CheckStatus::Passed
        }
    }

    /// Re-derive `check_status`, returning whether it changed
    pub fn normalize_status(&mut self) -> bool {
        let derived = Self::derive_status(&self.issues_detected, Some(self.check_status));
        let changed = derived != self.check_status;
        self.check_status = derived;
        changed
    }

    pub fn is_empty(&self) -> bool {
        self.component_id.is_empty() &&
            self.component_name.is_empty() &&
            self.issues_detected.is_empty() &&
            self.missing_information.is_empty() &&
            self.recommendations.is_empty()
    }
}

/// JSON Schema of the findings object, embedded in the Step 3 prompt
pub fn findings_json_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "component_id": { "type": "string", "description": "Unique identifier for the digital component" },
            "component_name": { "type": "string", "description": "Name of the digital component" },
            "check_status": {
                "type": "string",
                "enum": ["PASSED", "FAILED", "PARTIAL"],
                "description": "Overall status of the compliance check"
            },
            "issues_detected": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "category": { "type": "string" },
                        "description": { "type": "string" },
                        "action": { "type": "string" }
                    },
                    "required": ["category", "description", "action"]
                }
            },
            "missing_information": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "field": { "type": "string" },
                        "description": { "type": "string" },
                        "action": { "type": "string" }
                    },
                    "required": ["field", "description", "action"]
                }
            },
            "recommendations": { "type": "array", "items": { "type": "string" } }
        },
        "required": [
            "component_id",
            "component_name",
            "check_status",
            "issues_detected",
            "missing_information",
            "recommendations",
        ]
    })
}

/// Build a complete narrative from the findings alone.
///
/// Pure function of its input so that extraction stays repeatable.
pub fn render_report(findings: &Findings) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push(SYNTHESIZED_REPORT_TITLE.to_string());
    lines.push(String::new());
    lines.push(format!("Component: {}", or_unknown(&findings.component_name)));
    lines.push(format!("Component ID: {}", or_unknown(&findings.component_id)));
    lines.push(format!("Status: {}", findings.check_status));
    lines.push(String::new());

    lines.push("Summary:".to_string());
    lines.push(match findings.check_status {
        CheckStatus::Passed => {
            "The digital component passed all compliance checks. No issues were identified."
                .to_string()
        }
        CheckStatus::Failed => format!(
            "The digital component failed the compliance assessment with {} issue(s) detected and {} piece(s) of missing information.",
            findings.issues_detected.len(),
            findings.missing_information.len()
        ),
        CheckStatus::Partial => {
            "The assessment was completed with limitations. Review the findings below."
                .to_string()
        }
    });
    lines.push(String::new());

    lines.push(format!("Issues Detected: {}", findings.issues_detected.len()));
    for (i, issue) in findings.issues_detected.iter().enumerate() {
        lines.push(format!("{}. [{}] {}", i + 1, issue.category, issue.description));
        if !issue.action.is_empty() {
            lines.push(format!("   Action: {}", issue.action));
        }
    }
    lines.push(String::new());

    lines.push(format!("Missing Information: {}", findings.missing_information.len()));
    for (i, missing) in findings.missing_information.iter().enumerate() {
        lines.push(format!("{}. [{}] {}", i + 1, missing.field, missing.description));
        if !missing.action.is_empty() {
            lines.push(format!("   Action: {}", missing.action));
        }
    }
    lines.push(String::new());

    lines.push("Recommendations:".to_string());
    if findings.recommendations.is_empty() {
        lines.push("No further recommendations.".to_string());
    }
    for (i, rec) in findings.recommendations.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, rec));
    }

    lines.join("\n")
}

fn or_unknown(value: &str) -> &str {
    if value.trim().is_empty() { "Unknown" } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(status: CheckStatus, issues: usize) -> Findings {
        Findings {
            component_id: "IMG-1".into(),
            component_name: "Hero".into(),
            check_status: status,
            issues_detected: (0..issues)
                .map(|i| Issue {
                    category: "Visual Quality".into(),
                    description: format!("issue {}", i),
                    action: String::new(),
                })
                .collect(),
            missing_information: vec![],
            recommendations: vec![],
        }
    }

    #[test]
    fn issues_force_failed() {
        let mut f = sample(CheckStatus::Passed, 1);
        assert!(f.normalize_status());
        assert_eq!(f.check_status, CheckStatus::Failed);
    }

    #[test]
    fn partial_only_when_reported_without_issues() {
        assert_eq!(Findings::derive_status(&[], Some(CheckStatus::Partial)), CheckStatus::Partial);
        assert_eq!(Findings::derive_status(&[], Some(CheckStatus::Failed)), CheckStatus::Passed);
        assert_eq!(Findings::derive_status(&[], None), CheckStatus::Passed);
        let f = sample(CheckStatus::Partial, 2);
        assert_eq!(
            Findings::derive_status(&f.issues_detected, Some(CheckStatus::Partial)),
            CheckStatus::Failed
        );
    }

    #[test]
    fn findings_serialize_with_contract_keys() {
        let value = serde_json::to_value(sample(CheckStatus::Failed, 1)).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 6);
        assert_eq!(value["check_status"], "FAILED");
        assert_eq!(value["issues_detected"][0]["category"], "Visual Quality");
    }

    #[test]
    fn report_is_deterministic_and_complete() {
        let f = sample(CheckStatus::Failed, 2);
        let a = render_report(&f);
        assert_eq!(a, render_report(&f));
        assert!(a.starts_with(SYNTHESIZED_REPORT_TITLE));
        assert!(a.contains("Status: FAILED"));
        assert!(a.contains("2. [Visual Quality] issue 1"));
    }
}
