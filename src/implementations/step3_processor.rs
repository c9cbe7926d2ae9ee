use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde_json::Value;

use crate::config::AnalyzerOptions;
use crate::errors::StepError;
use crate::implementations::extractor::extract;
use crate::implementations::extractor::findings::{
    FINDINGS,
    FINDINGS_SYNTHESIZED,
    NARRATIVE_SYNTHESIZED,
    REPORT,
};
use crate::models::common::WorkflowStep;
use crate::models::findings::{render_report, Findings};
use crate::models::input::{AnalysisInput, ModelRequest};
use crate::models::record::{ExtractedRecord, StepSchema};
use crate::models::step_output::Step3Output;
use crate::traits::{ModelGateway, PriorOutputs, StepProcessor};

/// Step 3 (Findings Transmission): machine-readable findings plus a report.
///
/// A successful output always carries both. `check_status` is re-derived
/// from the issues so the model cannot pass a component it reported issues on.
pub struct Step3Processor<G: ModelGateway> {
    gateway: Arc<G>,
    options: Arc<AnalyzerOptions>,
}

impl<G: ModelGateway> Step3Processor<G> {
    pub fn new(gateway: Arc<G>, options: Arc<AnalyzerOptions>) -> Self {
        Self { gateway, options }
    }

    pub fn normalize(&self, record: &ExtractedRecord) -> Result<Step3Output, StepError> {
        let Some(fields) = record.fields() else {
            return Err(StepError::ExtractionInsufficient(
                "neither findings JSON nor a report could be read from the Step 3 reply".to_string(),
            ));
        };

        let mut findings = fields
            .get(FINDINGS)
            .cloned()
            .map(serde_json::from_value::<Findings>)
            .transpose()
            .map_err(|e| {
                StepError::ExtractionInsufficient(format!("findings are malformed: {}", e))
            })?
            .ok_or_else(|| StepError::ExtractionInsufficient("findings are missing".to_string()))?;

        let mut narrative = fields
            .get(REPORT)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let mut narrative_synthesized = flag(fields.get(NARRATIVE_SYNTHESIZED));
        let findings_synthesized = flag(fields.get(FINDINGS_SYNTHESIZED));

        let reported = findings.check_status;
        if findings.normalize_status() {
            warn!(
                "Model reported {} with {} issue(s), corrected to {}",
                reported,
                findings.issues_detected.len(),
                findings.check_status
            );
            if narrative_synthesized {
                narrative = render_report(&findings);
            }
        }

        if narrative.trim().is_empty() {
            narrative = render_report(&findings);
            narrative_synthesized = true;
        }

        Ok(Step3Output {
            findings,
            narrative,
            narrative_synthesized,
            findings_synthesized,
        })
    }
}

#[async_trait]
impl<G: ModelGateway> StepProcessor for Step3Processor<G> {
    type Output = Step3Output;

    fn step(&self) -> WorkflowStep {
        WorkflowStep::FindingsTransmission
    }

    async fn run(
        &self,
        input: &AnalysisInput,
        prior: &PriorOutputs<'_>,
    ) -> Result<Step3Output, StepError> {
        let step1 = prior.require_step1()?;
        let step2 = prior.require_step2()?;
        let prompt = self.options.prompts.step3_prompt(input, step1, step2)?;
        debug!("{} prompt assembled ({} characters)", self.step(), prompt.len());

        let request = ModelRequest::for_input(input, prompt, self.options.generation.clone())
            .map_err(|e| StepError::PromptAssembly(e.to_string()))?;
        let reply = self.gateway.invoke(request).await?;

        let record = extract(&reply, &StepSchema::Findings);
        let output = self.normalize(&record)?;
        info!(
            "{} status {}: {} issue(s), {} missing field(s), {} recommendation(s)",
            self.step(),
            output.findings.check_status,
            output.findings.issues_detected.len(),
            output.findings.missing_information.len(),
            output.findings.recommendations.len()
        );
        if output.narrative_synthesized || output.findings_synthesized {
            debug!(
                "{} synthesized parts (narrative: {}, findings: {})",
                self.step(),
                output.narrative_synthesized,
                output.findings_synthesized
            );
        }
        Ok(output)
    }
}

fn flag(value: Option<&Value>) -> bool {
    value.and_then(Value::as_bool).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TransportError;
    use crate::implementations::extractor::extract_findings;
    use crate::models::common::CheckStatus;
    use crate::models::findings::SYNTHESIZED_REPORT_TITLE;
    use crate::models::input::ModelReply;

    struct NoGateway;

    #[async_trait]
    impl ModelGateway for NoGateway {
        async fn invoke(&self, _request: ModelRequest) -> Result<ModelReply, TransportError> {
            Err(TransportError::fatal("not used"))
        }
    }

    fn processor() -> Step3Processor<NoGateway> {
        Step3Processor::new(Arc::new(NoGateway), Arc::new(AnalyzerOptions::default()))
    }

    #[test]
    fn passed_with_issues_becomes_failed() {
        let text =
            r#"{"component_id": "IMG-2", "component_name": "Card", "check_status": "PASSED",
                "issues_detected": [{"category": "Metadata", "description": "No rights", "action": "Add rights"}],
                "missing_information": [], "recommendations": []}"#;
        let output = processor().normalize(&extract_findings(text)).unwrap();
        assert_eq!(output.findings.check_status, CheckStatus::Failed);
        assert!(output.narrative_synthesized);
        assert!(output.narrative.contains("Status: FAILED"));
    }

    #[test]
    fn partial_survives_without_issues() {
        let text =
            r#"{"component_id": "IMG-2", "component_name": "Card", "check_status": "PARTIAL",
                "issues_detected": [], "missing_information": [], "recommendations": []}
HUMAN-READABLE REPORT:
Could not verify colour profile."#;
        let output = processor().normalize(&extract_findings(text)).unwrap();
        assert_eq!(output.findings.check_status, CheckStatus::Partial);
        assert!(!output.narrative_synthesized);
        assert_eq!(output.narrative, "Could not verify colour profile.");
    }

    #[test]
    fn json_only_reply_gets_a_synthesized_report() {
        let text =
            r#"{"component_id": "IMG-2", "component_name": "Card", "check_status": "PASSED",
                "issues_detected": [], "missing_information": [], "recommendations": ["Archive"]}"#;
        let output = processor().normalize(&extract_findings(text)).unwrap();
        assert!(output.narrative.starts_with(SYNTHESIZED_REPORT_TITLE));
        assert!(!output.findings_synthesized);
    }

    #[test]
    fn failed_with_a_bare_string_issue_stays_failed() {
        let text = r#"{"component_id": "IMG-2", "component_name": "Card", "check_status": "FAILED",
                "issues_detected": "Usage rights are missing", "missing_information": [], "recommendations": []}
HUMAN-READABLE REPORT:
Usage rights are missing, so the card cannot be published."#;
        let output = processor().normalize(&extract_findings(text)).unwrap();
        assert_eq!(output.findings.check_status, CheckStatus::Failed);
        assert_eq!(output.findings.issues_detected.len(), 1);
        assert!(!output.narrative_synthesized);
    }

    #[test]
    fn unparseable_reply_is_insufficient() {
        let record = extract_findings("I'm unable to evaluate this image.");
        assert!(matches!(
            processor().normalize(&record),
            Err(StepError::ExtractionInsufficient(_))
        ));
    }
}
