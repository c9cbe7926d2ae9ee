use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::checklist::{Checklist, OverallAssessment};
use crate::models::common::ItemStatus;
use crate::models::findings::Findings;

/// Preliminary verdict for one compliance area in Step 1
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AreaAssessment {
    pub assessment: ItemStatus,
    #[serde(default)]
    pub issues: Vec<String>,
}

/// Result of Step 1 (DAM Analysis)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step1Output {
    /// Free-text analysis notes, never empty
    pub notes: String,
    pub job_aid_assessment: BTreeMap<String, AreaAssessment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_readable_section: Option<String>,
    pub next_steps: Vec<String>,
    /// Fields the reply did not provide
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<String>,
}

/// Result of Step 2 (Job Aid Assessment)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step2Output {
    pub checklist: Checklist,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_assessment: Option<OverallAssessment>,
    pub assessment_summary: String,
    /// Checklist paths the reply left unstated (all blank in `checklist`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unstated_items: Vec<String>,
}

/// Result of Step 3 (Findings Transmission).
///
/// Both the findings and the narrative are always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step3Output {
    pub findings: Findings,
    pub narrative: String,
    /// The narrative was built from the findings rather than taken from the reply
    pub narrative_synthesized: bool,
    /// The findings were read from the prose rather than from a JSON block
    pub findings_synthesized: bool,
}
