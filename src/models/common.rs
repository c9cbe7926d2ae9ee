use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::ValidationError;

/// Raster formats the model service accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
}

impl MediaType {
    pub fn mime(&self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
        }
    }

    /// Parse a MIME type or file extension
    pub fn from_name(name: &str) -> Result<Self, ValidationError> {
        match name.trim().to_lowercase().as_str() {
            "image/jpeg" | "image/jpg" | "jpeg" | "jpg" => Ok(MediaType::Jpeg),
            "image/png" | "png" => Ok(MediaType::Png),
            other => Err(ValidationError::UnsupportedMediaType(other.to_string())),
        }
    }

    /// Identify the format from its magic bytes
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
        if bytes.starts_with(PNG_SIGNATURE) {
            Some(MediaType::Png)
        } else if bytes.starts_with(&[0xff, 0xd8, 0xff]) {
            Some(MediaType::Jpeg)
        } else {
            None
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mime())
    }
}

/// The three dependent steps of an analysis run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WorkflowStep {
    DamAnalysis,
    JobAidAssessment,
    FindingsTransmission,
}

impl WorkflowStep {
    pub const ALL: [WorkflowStep; 3] = [
        WorkflowStep::DamAnalysis,
        WorkflowStep::JobAidAssessment,
        WorkflowStep::FindingsTransmission,
    ];

    pub fn number(&self) -> u8 {
        match self {
            WorkflowStep::DamAnalysis => 1,
            WorkflowStep::JobAidAssessment => 2,
            WorkflowStep::FindingsTransmission => 3,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            WorkflowStep::DamAnalysis => "DAM Analysis",
            WorkflowStep::JobAidAssessment => "Job Aid Assessment",
            WorkflowStep::FindingsTransmission => "Findings Transmission",
        }
    }

    pub fn next(&self) -> Option<WorkflowStep> {
        match self {
            WorkflowStep::DamAnalysis => Some(WorkflowStep::JobAidAssessment),
            WorkflowStep::JobAidAssessment => Some(WorkflowStep::FindingsTransmission),
            WorkflowStep::FindingsTransmission => None,
        }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Step {} ({})", self.number(), self.name())
    }
}

/// Status of one checklist item.
///
/// `Blank` means the item was not evaluated because the reply did not
/// state a status for it. It is never replaced by a guessed pass or fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ItemStatus {
    Pass,
    Fail,
    Partial,
    #[default]
    Blank,
}

impl ItemStatus {
    /// Interpret a status spelling found in a model reply.
    ///
    /// Returns `None` for text that is not a recognisable status.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw
            .trim()
            .trim_matches('*')
            .trim()
            .to_uppercase()
            .replace(&[' ', '-'][..], "_");
        match normalized.as_str() {
            "PASS" | "PASSED" => Some(ItemStatus::Pass),
            "FAIL" | "FAILED" => Some(ItemStatus::Fail),
            "PARTIAL" | "NEEDS_REVIEW" => Some(ItemStatus::Partial),
            "" | "BLANK" | "N/A" | "NA" | "NOT_EVALUATED" | "UNKNOWN" => Some(ItemStatus::Blank),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pass => "PASS",
            ItemStatus::Fail => "FAIL",
            ItemStatus::Partial => "PARTIAL",
            ItemStatus::Blank => "",
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, ItemStatus::Blank)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemStatus::Blank => write!(f, "(blank)"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

impl Serialize for ItemStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ItemStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ItemStatus::parse(&raw).ok_or_else(|| {
            serde::de::Error::custom(format!("unrecognised checklist status: {}", raw))
        })
    }
}

/// Overall status of the findings produced in Step 3
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    Passed,
    Failed,
    Partial,
}

impl CheckStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "PASSED" | "PASS" => Some(CheckStatus::Passed),
            "FAILED" | "FAIL" => Some(CheckStatus::Failed),
            "PARTIAL" => Some(CheckStatus::Partial),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Passed => "PASSED",
            CheckStatus::Failed => "FAILED",
            CheckStatus::Partial => "PARTIAL",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
