pub mod common;
pub mod input;
pub mod record;
pub mod checklist;
pub mod findings;
pub mod step_output;
pub mod workflow;

// Re-export common model types
pub use common::{CheckStatus, ItemStatus, MediaType, WorkflowStep};
pub use input::{AnalysisInput, ModelReply, ModelRequest};
pub use record::{ExtractedRecord, StepSchema};
pub use checklist::{Checklist, JobAidSchema, OverallAssessment};
pub use findings::{Findings, Issue, MissingInfo};
pub use step_output::{AreaAssessment, Step1Output, Step2Output, Step3Output};
pub use workflow::{RunStatus, WorkflowEvent, WorkflowResult, WorkflowState};
