use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde_json::{Map, Value};

use crate::config::AnalyzerOptions;
use crate::errors::StepError;
use crate::implementations::extractor::analysis::{
    HUMAN_READABLE_SECTION,
    JOB_AID_ASSESSMENT,
    NEXT_STEPS,
    NOTES,
};
use crate::implementations::extractor::{extract, json::locate_object};
use crate::models::common::WorkflowStep;
use crate::models::input::{AnalysisInput, ModelRequest};
use crate::models::record::{ExtractedRecord, StepSchema};
use crate::models::step_output::{AreaAssessment, Step1Output};
use crate::traits::{ModelGateway, PriorOutputs, StepProcessor};

/// Step 1 (DAM Analysis): a first look at the image and its metadata.
///
/// Only the narrative is required. A job aid block that cannot be read is
/// downgraded to an empty assessment.
pub struct Step1Processor<G: ModelGateway> {
    gateway: Arc<G>,
    options: Arc<AnalyzerOptions>,
}

impl<G: ModelGateway> Step1Processor<G> {
    pub fn new(gateway: Arc<G>, options: Arc<AnalyzerOptions>) -> Self {
        Self { gateway, options }
    }

    /// Build the typed output from a reply's text
    pub fn normalize(
        &self,
        text: &str,
        record: &ExtractedRecord,
    ) -> Result<Step1Output, StepError> {
        if text.trim().is_empty() {
            return Err(StepError::ExtractionInsufficient("Step 1 reply was empty".to_string()));
        }

        let empty = Map::new();
        let fields = record.fields().unwrap_or(&empty);

        let human_readable_section = string_field(fields, HUMAN_READABLE_SECTION);
        let notes = string_field(fields, NOTES)
            .or_else(|| human_readable_section.clone())
            .or_else(|| prose_outside_json(text))
            .unwrap_or_else(|| text.trim().to_string());

        let job_aid_assessment = match fields.get(JOB_AID_ASSESSMENT) {
            Some(value) => {
                serde_json::from_value::<BTreeMap<String, AreaAssessment>>(value.clone())
                    .unwrap_or_else(|e| {
                        warn!(
                            "Step 1 job aid block could not be read ({}), using an empty assessment",
                            e
                        );
                        BTreeMap::new()
                    })
            }
            None => BTreeMap::new(),
        };

        let next_steps = fields
            .get(NEXT_STEPS)
            .and_then(Value::as_array)
            .map(|steps| {
                steps
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let missing_fields = match record {
            ExtractedRecord::Unparseable(_) => {
                [NOTES, JOB_AID_ASSESSMENT, HUMAN_READABLE_SECTION, NEXT_STEPS]
                    .iter()
                    .map(|f| f.to_string())
                    .collect()
            }
            other => other.missing().to_vec(),
        };

        Ok(Step1Output {
            notes,
            job_aid_assessment,
            human_readable_section,
            next_steps,
            missing_fields,
        })
    }
}

#[async_trait]
impl<G: ModelGateway> StepProcessor for Step1Processor<G> {
    type Output = Step1Output;

    fn step(&self) -> WorkflowStep {
        WorkflowStep::DamAnalysis
    }

    async fn run(
        &self,
        input: &AnalysisInput,
        _prior: &PriorOutputs<'_>,
    ) -> Result<Step1Output, StepError> {
        let prompt = self.options.prompts.step1_prompt(input)?;
        debug!("{} prompt assembled ({} characters)", self.step(), prompt.len());

        let request = ModelRequest::for_input(input, prompt, self.options.generation.clone())
            .map_err(|e| StepError::PromptAssembly(e.to_string()))?;
        let reply = self.gateway.invoke(request).await?;

        let record = extract(&reply, &StepSchema::Analysis);
        let output = self.normalize(&reply.text, &record)?;
        info!(
            "{} produced {} area assessment(s) and {} next step(s)",
            self.step(),
            output.job_aid_assessment.len(),
            output.next_steps.len()
        );
        Ok(output)
    }
}

fn string_field(fields: &Map<String, Value>, name: &str) -> Option<String> {
    fields
        .get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// The reply with its JSON document cut out, if anything remains
fn prose_outside_json(text: &str) -> Option<String> {
    let found = locate_object(text, |_| true)?;
    let prose = format!("{}\n{}", text[..found.span.start].trim(), text[found.span.end..].trim());
    let prose = prose.trim();
    if prose.is_empty() { None } else { Some(prose.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::implementations::extractor::extract_analysis;
    use crate::models::common::ItemStatus;
    use crate::models::input::ModelReply;
    use crate::errors::TransportError;

    struct NoGateway;

    #[async_trait]
    impl ModelGateway for NoGateway {
        async fn invoke(&self, _request: ModelRequest) -> Result<ModelReply, TransportError> {
            Err(TransportError::fatal("not used"))
        }
    }

    fn processor() -> Step1Processor<NoGateway> {
        Step1Processor::new(Arc::new(NoGateway), Arc::new(AnalyzerOptions::default()))
    }

    #[test]
    fn empty_reply_is_insufficient() {
        let err = processor().normalize("   ", &extract_analysis("   ")).unwrap_err();
        assert!(matches!(err, StepError::ExtractionInsufficient(_)));
    }

    #[test]
    fn free_prose_becomes_notes() {
        let text = "The photo shows a red chair on a white background.";
        let output = processor().normalize(text, &extract_analysis(text)).unwrap();
        assert_eq!(output.notes, text);
        assert!(output.job_aid_assessment.is_empty());
        assert_eq!(output.missing_fields.len(), 4);
    }

    #[test]
    fn notes_fall_back_to_text_around_json() {
        let text =
            "Overall the banner looks clean.\n```json\n{\"job_aid_assessment\": {\"visual_quality\": \"PASS\"}}\n```";
        let output = processor().normalize(text, &extract_analysis(text)).unwrap();
        assert_eq!(output.notes, "Overall the banner looks clean.");
        assert_eq!(output.job_aid_assessment["visual_quality"].assessment, ItemStatus::Pass);
        assert!(output.missing_fields.contains(&NOTES.to_string()));
    }
}
