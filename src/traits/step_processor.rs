use async_trait::async_trait;

use crate::errors::StepError;
use crate::models::common::WorkflowStep;
use crate::models::input::AnalysisInput;
use crate::models::step_output::{Step1Output, Step2Output};

/// Outputs of the steps that already finished, borrowed from the orchestrator
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorOutputs<'a> {
    pub step1: Option<&'a Step1Output>,
    pub step2: Option<&'a Step2Output>,
}

impl<'a> PriorOutputs<'a> {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn require_step1(&self) -> Result<&'a Step1Output, StepError> {
        self.step1.ok_or_else(|| StepError::PromptAssembly("Step 1 output is required".to_string()))
    }

    pub fn require_step2(&self) -> Result<&'a Step2Output, StepError> {
        self.step2.ok_or_else(|| StepError::PromptAssembly("Step 2 output is required".to_string()))
    }
}

/// One step of the workflow: assemble a prompt, call the gateway once,
/// extract and normalize the reply.
#[async_trait]
pub trait StepProcessor: Send + Sync {
    type Output: Send;

    fn step(&self) -> WorkflowStep;

    async fn run(
        &self,
        input: &AnalysisInput,
        prior: &PriorOutputs<'_>,
    ) -> Result<Self::Output, StepError>;
}
