pub mod models;
pub mod traits;
pub mod errors;
pub mod config;
pub mod implementations;
#[cfg(test)]
pub mod tests;

// Re-export core components
pub use config::{AnalyzerOptions, GenerationParams, RetryPolicy};
pub use errors::{
    DamError,
    DamResult,
    RecoverableError,
    StepError,
    TransportError,
    TransportErrorKind,
    ValidationError,
    WorkflowError,
};
pub use implementations::config::{AnalyzerConfig, ConfigError};
pub use implementations::extractor::extract;
pub use implementations::{GeminiOrchestrator, GeminiTransport, Orchestrator, RetryingGateway};
pub use models::{
    common::{ CheckStatus, ItemStatus, MediaType, WorkflowStep },
    input::{ AnalysisInput, ModelReply, ModelRequest },
    record::{ ExtractedRecord, StepSchema },
    checklist::{ Checklist, JobAidSchema, OverallAssessment },
    findings::{ Findings, Issue, MissingInfo },
    step_output::{ Step1Output, Step2Output, Step3Output },
    workflow::{ RunStatus, WorkflowResult, WorkflowState },
};
pub use traits::{ModelGateway, ModelTransport, PriorOutputs, StepProcessor};
