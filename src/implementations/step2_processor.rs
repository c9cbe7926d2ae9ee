use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};

use crate::config::AnalyzerOptions;
use crate::errors::StepError;
use crate::implementations::extractor::checklist::{checklist_from_fields, overall_from_fields};
use crate::implementations::extractor::extract;
use crate::models::checklist::assessment_summary;
use crate::models::common::WorkflowStep;
use crate::models::input::{AnalysisInput, ModelRequest};
use crate::models::record::{ExtractedRecord, StepSchema};
use crate::models::step_output::Step2Output;
use crate::traits::{ModelGateway, PriorOutputs, StepProcessor};

/// Step 2 (Job Aid Assessment): the full checklist, with Step 1 as context.
///
/// The checklist is the whole point of this step, so a reply it cannot be
/// read from fails the step.
pub struct Step2Processor<G: ModelGateway> {
    gateway: Arc<G>,
    options: Arc<AnalyzerOptions>,
}

impl<G: ModelGateway> Step2Processor<G> {
    pub fn new(gateway: Arc<G>, options: Arc<AnalyzerOptions>) -> Self {
        Self { gateway, options }
    }

    pub fn normalize(&self, record: &ExtractedRecord) -> Result<Step2Output, StepError> {
        let Some(fields) = record.fields() else {
            return Err(StepError::ExtractionInsufficient(
                "no checklist could be read from the Step 2 reply".to_string(),
            ));
        };

        let checklist = checklist_from_fields(fields, &self.options.job_aid);
        let overall_assessment = overall_from_fields(fields);
        let assessment_summary = assessment_summary(overall_assessment.as_ref(), &checklist);

        Ok(Step2Output {
            checklist,
            overall_assessment,
            assessment_summary,
            unstated_items: record.missing().to_vec(),
        })
    }
}

#[async_trait]
impl<G: ModelGateway> StepProcessor for Step2Processor<G> {
    type Output = Step2Output;

    fn step(&self) -> WorkflowStep {
        WorkflowStep::JobAidAssessment
    }

    async fn run(
        &self,
        input: &AnalysisInput,
        prior: &PriorOutputs<'_>,
    ) -> Result<Step2Output, StepError> {
        let step1 = prior.require_step1()?;
        let prompt = self.options.prompts.step2_prompt(input, step1, &self.options.job_aid)?;
        debug!("{} prompt assembled ({} characters)", self.step(), prompt.len());

        let request = ModelRequest::for_input(input, prompt, self.options.generation.clone())
            .map_err(|e| StepError::PromptAssembly(e.to_string()))?;
        let reply = self.gateway.invoke(request).await?;

        let record = extract(&reply, &StepSchema::Checklist(&self.options.job_aid));
        let output = self.normalize(&record)?;
        let counts = output.checklist.counts();
        info!(
            "{} checklist: {} pass, {} fail, {} partial, {} blank ({} unstated)",
            self.step(),
            counts.pass,
            counts.fail,
            counts.partial,
            counts.blank,
            output.unstated_items.len()
        );
        Ok(output)
    }
}
