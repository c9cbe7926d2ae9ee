use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::{StepError, WorkflowError};
use crate::models::common::WorkflowStep;
use crate::models::step_output::{Step1Output, Step2Output, Step3Output};

/// Where a run currently is
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state")]
pub enum WorkflowState {
    NotStarted,
    Step1Running,
    Step2Running,
    Step3Running,
    Completed,
    /// Absorbing: nothing follows a failure
    Failed {
        step: WorkflowStep,
        reason: String,
    },
}

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    Start,
    StepSucceeded(WorkflowStep),
    StepFailed(WorkflowStep, String),
}

impl WorkflowState {
    /// Transition table.
    ///
    /// A step starts only after its predecessor succeeded; any running step
    /// may fail; terminal states accept no events.
    pub fn transition(&self, event: &WorkflowEvent) -> Result<WorkflowState, WorkflowError> {
        use WorkflowEvent as E;
        use WorkflowState as S;
        use WorkflowStep::*;

        let next = match (self, event) {
            (S::NotStarted, E::Start) => S::Step1Running,
            (S::Step1Running, E::StepSucceeded(DamAnalysis)) => S::Step2Running,
            (S::Step2Running, E::StepSucceeded(JobAidAssessment)) => S::Step3Running,
            (S::Step3Running, E::StepSucceeded(FindingsTransmission)) => S::Completed,
            (running, E::StepFailed(step, reason)) if running.running_step() == Some(*step) => {
                S::Failed { step: *step, reason: reason.clone() }
            }
            (state, event) => {
                return Err(WorkflowError::InvalidTransition(format!(
                    "{:?} cannot follow {}",
                    event, state
                )));
            }
        };
        Ok(next)
    }

    pub fn running_step(&self) -> Option<WorkflowStep> {
        match self {
            WorkflowState::Step1Running => Some(WorkflowStep::DamAnalysis),
            WorkflowState::Step2Running => Some(WorkflowStep::JobAidAssessment),
            WorkflowState::Step3Running => Some(WorkflowStep::FindingsTransmission),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::Completed | WorkflowState::Failed { .. })
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowState::NotStarted => write!(f, "not started"),
            WorkflowState::Completed => write!(f, "completed"),
            WorkflowState::Failed { step, reason } => write!(f, "failed at {}: {}", step, reason),
            running => {
                match running.running_step() {
                    Some(step) => write!(f, "running {}", step),
                    None => write!(f, "{:?}", running),
                }
            }
        }
    }
}

/// Overall outcome of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status")]
pub enum RunStatus {
    Completed,
    FailedAtStep {
        step: WorkflowStep,
        reason: StepError,
    },
}

/// Everything a run produced. Partial outputs are kept when a step fails.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    pub step1: Option<Step1Output>,
    pub step2: Option<Step2Output>,
    pub step3: Option<Step3Output>,
    pub status: RunStatus,
    pub state: WorkflowState,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl WorkflowResult {
    pub fn is_completed(&self) -> bool {
        matches!(self.status, RunStatus::Completed)
    }

    pub fn failed_step(&self) -> Option<WorkflowStep> {
        match &self.status {
            RunStatus::FailedAtStep { step, .. } => Some(*step),
            RunStatus::Completed => None,
        }
    }

    /// The failure as a `WorkflowError`, if the run did not complete
    pub fn error(&self) -> Option<WorkflowError> {
        match &self.status {
            RunStatus::FailedAtStep { step, reason } => {
                Some(WorkflowError::FailedAtStep { step: *step, cause: reason.clone() })
            }
            RunStatus::Completed => None,
        }
    }
}
