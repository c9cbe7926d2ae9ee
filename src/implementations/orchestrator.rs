use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use log::{error, info, warn};

use crate::config::AnalyzerOptions;
use crate::errors::{StepError, WorkflowError};
use crate::implementations::config::{AnalyzerConfig, ConfigError};
use crate::implementations::gemini_transport::GeminiTransport;
use crate::implementations::retrying_gateway::RetryingGateway;
use crate::implementations::step1_processor::Step1Processor;
use crate::implementations::step2_processor::Step2Processor;
use crate::implementations::step3_processor::Step3Processor;
use crate::models::common::WorkflowStep;
use crate::models::input::AnalysisInput;
use crate::models::step_output::{Step1Output, Step2Output, Step3Output};
use crate::models::workflow::{RunStatus, WorkflowEvent, WorkflowResult, WorkflowState};
use crate::traits::{ModelGateway, PriorOutputs, StepProcessor};

/// Called on every state change of a run
pub type StateObserver = Arc<dyn Fn(&WorkflowState) + Send + Sync>;

/// Runs the three steps in order for one input at a time.
///
/// Holds no per-run state, so one orchestrator can serve concurrent runs.
pub struct Orchestrator<G: ModelGateway> {
    step1: Step1Processor<G>,
    step2: Step2Processor<G>,
    step3: Step3Processor<G>,
    observer: Option<StateObserver>,
}

/// The production wiring: Gemini over HTTP behind the retrying gateway
pub type GeminiOrchestrator = Orchestrator<RetryingGateway<GeminiTransport>>;

impl GeminiOrchestrator {
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, ConfigError> {
        let transport = GeminiTransport::from_config(config)?;
        let gateway = RetryingGateway::new(transport, config.retry.clone());
        Ok(Orchestrator::new(Arc::new(gateway), config.analyzer_options()))
    }
}

/// Outputs a run has produced so far
#[derive(Default)]
struct Produced {
    step1: Option<Step1Output>,
    step2: Option<Step2Output>,
    step3: Option<Step3Output>,
}

impl<G: ModelGateway> Orchestrator<G> {
    pub fn new(gateway: Arc<G>, options: AnalyzerOptions) -> Self {
        let options = Arc::new(options);
        Self {
            step1: Step1Processor::new(Arc::clone(&gateway), Arc::clone(&options)),
            step2: Step2Processor::new(Arc::clone(&gateway), Arc::clone(&options)),
            step3: Step3Processor::new(gateway, options),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: StateObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Run all three steps. A failing step halts the run; outputs of the
    /// steps before it are kept in the result.
    pub async fn run(&self, input: &AnalysisInput) -> WorkflowResult {
        let mut state = WorkflowState::NotStarted;
        self.drive(input, &mut state).await
    }

    /// Like [`run`](Self::run), but gives up as soon as `cancel` resolves.
    ///
    /// The in-flight model call is abandoned and nothing the run produced is
    /// returned.
    pub async fn run_cancellable<C>(
        &self,
        input: &AnalysisInput,
        cancel: C,
    ) -> Result<WorkflowResult, WorkflowError>
    where
        C: Future<Output = ()>,
    {
        let mut state = WorkflowState::NotStarted;
        let outcome = {
            let drive = self.drive(input, &mut state);
            tokio::pin!(drive);
            tokio::pin!(cancel);
            tokio::select! {
                result = &mut drive => Some(result),
                _ = &mut cancel => None,
            }
        };

        match outcome {
            Some(result) => Ok(result),
            None => {
                let step = state.running_step().unwrap_or(WorkflowStep::DamAnalysis);
                warn!("Run cancelled while {} was running", step);
                Err(WorkflowError::Cancelled { step })
            }
        }
    }

    /// Runs whichever step the state names until the state is terminal.
    async fn drive(&self, input: &AnalysisInput, state: &mut WorkflowState) -> WorkflowResult {
        let started_at = Utc::now();
        let timer = Instant::now();
        let mut produced = Produced::default();
        let mut failure: Option<(WorkflowStep, StepError)> = None;

        info!(
            "Starting compliance analysis ({} bytes, {}, {} metadata field(s))",
            input.image().len(),
            input.media_type(),
            input.metadata().len()
        );
        if let Err(err) = self.advance(state, &WorkflowEvent::Start) {
            failure = Some((WorkflowStep::DamAnalysis, err));
        }

        while let Some(step) = state.running_step() {
            let event = match self.run_step(step, input, &mut produced).await {
                Ok(()) => WorkflowEvent::StepSucceeded(step),
                Err(err) => {
                    error!("{} failed: {}", step, err);
                    let event = WorkflowEvent::StepFailed(step, err.to_string());
                    failure = Some((step, err));
                    event
                }
            };
            if let Err(err) = self.advance(state, &event) {
                failure = Some((step, err));
            }
        }

        let status = match failure {
            Some((step, reason)) => RunStatus::FailedAtStep { step, reason },
            None => RunStatus::Completed,
        };

        let elapsed_ms = timer.elapsed().as_millis() as u64;
        info!("Analysis {} in {} ms", state, elapsed_ms);

        WorkflowResult {
            step1: produced.step1,
            step2: produced.step2,
            step3: produced.step3,
            status,
            state: state.clone(),
            started_at,
            elapsed_ms,
        }
    }

    async fn run_step(
        &self,
        step: WorkflowStep,
        input: &AnalysisInput,
        produced: &mut Produced,
    ) -> Result<(), StepError> {
        match step {
            WorkflowStep::DamAnalysis => {
                let output = self.step1.run(input, &PriorOutputs::none()).await?;
                produced.step1 = Some(output);
            }
            WorkflowStep::JobAidAssessment => {
                let prior = PriorOutputs {
                    step1: produced.step1.as_ref(),
                    step2: None,
                };
                let output = self.step2.run(input, &prior).await?;
                produced.step2 = Some(output);
            }
            WorkflowStep::FindingsTransmission => {
                let prior = PriorOutputs {
                    step1: produced.step1.as_ref(),
                    step2: produced.step2.as_ref(),
                };
                let output = self.step3.run(input, &prior).await?;
                produced.step3 = Some(output);
            }
        }
        Ok(())
    }

    /// Apply `event` through the transition table. An event the table
    /// rejects fails the run at the step that was running.
    fn advance(&self, state: &mut WorkflowState, event: &WorkflowEvent) -> Result<(), StepError> {
        let outcome = state.transition(event);
        let rejected = outcome.as_ref().err().map(|err| StepError::Orchestration(err.to_string()));

        let next = match outcome {
            Ok(next) => next,
            Err(err) => {
                error!("{}", err);
                WorkflowState::Failed {
                    step: state.running_step().unwrap_or(WorkflowStep::DamAnalysis),
                    reason: err.to_string(),
                }
            }
        };
        info!("Workflow {} -> {}", state, next);
        *state = next;
        if let Some(observer) = &self.observer {
            observer(state);
        }

        match rejected {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TransportError;
    use crate::models::input::{ModelReply, ModelRequest};
    use async_trait::async_trait;

    struct NoGateway;

    #[async_trait]
    impl ModelGateway for NoGateway {
        async fn invoke(&self, _request: ModelRequest) -> Result<ModelReply, TransportError> {
            Err(TransportError::fatal("not used"))
        }
    }

    fn orchestrator() -> Orchestrator<NoGateway> {
        Orchestrator::new(Arc::new(NoGateway), AnalyzerOptions::default())
    }

    #[test]
    fn rejected_event_fails_the_running_step() {
        let mut state = WorkflowState::Step1Running;
        let err = orchestrator()
            .advance(
                &mut state,
                &WorkflowEvent::StepSucceeded(WorkflowStep::FindingsTransmission),
            )
            .unwrap_err();

        assert!(matches!(err, StepError::Orchestration(_)));
        assert!(matches!(
            state,
            WorkflowState::Failed {
                step: WorkflowStep::DamAnalysis,
                ..
            }
        ));
        assert!(state.running_step().is_none());
    }

    #[test]
    fn accepted_event_moves_to_the_next_state() {
        let mut state = WorkflowState::NotStarted;
        orchestrator()
            .advance(&mut state, &WorkflowEvent::Start)
            .unwrap();
        assert_eq!(state, WorkflowState::Step1Running);
    }
}
