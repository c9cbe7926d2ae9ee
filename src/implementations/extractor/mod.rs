//! Turning free-form model replies into step records.
//!
//! Extraction is a pure function of the reply text and the expected schema:
//! the same reply always yields the same record.

pub mod json;
pub mod sections;
pub mod analysis;
pub mod checklist;
pub mod findings;

use log::debug;

use crate::models::input::ModelReply;
use crate::models::record::{ExtractedRecord, StepSchema};

pub use analysis::extract_analysis;
pub use checklist::extract_checklist;
pub use findings::extract_findings;

/// Extract the record a step expects from `reply`
pub fn extract(reply: &ModelReply, schema: &StepSchema<'_>) -> ExtractedRecord {
    let record = match schema {
        StepSchema::Analysis => extract_analysis(&reply.text),
        StepSchema::Checklist(job_aid) => extract_checklist(&reply.text, job_aid),
        StepSchema::Findings => extract_findings(&reply.text),
    };
    debug!(
        "Extracted {} record from {} chars ({} missing)",
        record.variant_name(),
        reply.text.len(),
        record.missing().len()
    );
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::checklist::JobAidSchema;

    #[test]
    fn dispatches_on_schema() {
        let reply = ModelReply::new("no structure at all");
        assert!(extract(&reply, &StepSchema::Analysis).is_unparseable());
        let schema = JobAidSchema::default();
        assert!(extract(&reply, &StepSchema::Checklist(&schema)).is_unparseable());
        assert!(extract(&reply, &StepSchema::Findings).is_unparseable());
    }
}
