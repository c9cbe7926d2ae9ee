use serde::Serialize;
use serde_json::{Map, Value};

use crate::models::checklist::JobAidSchema;

/// Outcome of pulling a step's fields out of a model reply.
///
/// `Structured` always validates fully against the step's schema.
/// `PartiallyStructured` never claims that it does.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExtractedRecord {
    Structured(Map<String, Value>),
    PartiallyStructured {
        fields: Map<String, Value>,
        missing: Vec<String>,
    },
    Unparseable(String),
}

impl ExtractedRecord {
    pub fn is_structured(&self) -> bool {
        matches!(self, ExtractedRecord::Structured(_))
    }

    pub fn is_unparseable(&self) -> bool {
        matches!(self, ExtractedRecord::Unparseable(_))
    }

    pub fn fields(&self) -> Option<&Map<String, Value>> {
        match self {
            ExtractedRecord::Structured(fields) => Some(fields),
            ExtractedRecord::PartiallyStructured { fields, .. } => Some(fields),
            ExtractedRecord::Unparseable(_) => None,
        }
    }

    pub fn missing(&self) -> &[String] {
        match self {
            ExtractedRecord::PartiallyStructured { missing, .. } => missing,
            _ => &[],
        }
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            ExtractedRecord::Structured(_) => "Structured",
            ExtractedRecord::PartiallyStructured { .. } => "PartiallyStructured",
            ExtractedRecord::Unparseable(_) => "Unparseable",
        }
    }
}

/// Expected reply shape for one step
#[derive(Debug, Clone, Copy)]
pub enum StepSchema<'a> {
    /// Step 1: narrative plus a preliminary job aid block
    Analysis,
    /// Step 2: the full checklist
    Checklist(&'a JobAidSchema),
    /// Step 3: findings JSON plus a human-readable report
    Findings,
}
