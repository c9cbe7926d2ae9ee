use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::models::common::WorkflowStep;

/// Input rejected before any remote call is made
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum ValidationError {
    #[error("Image bytes cannot be empty")]
    EmptyImage,

    #[error("Prompt text cannot be empty")]
    EmptyPrompt,

    #[error("Unsupported media type: {0}. Supported types are image/jpeg and image/png")]
    UnsupportedMediaType(String),

    #[error("Declared media type {declared} does not match detected type {detected}")]
    MediaTypeMismatch { declared: String, detected: String },

    #[error("Image is {size} bytes, which exceeds the {limit} byte limit")]
    ImageTooLarge { size: usize, limit: usize },

    #[error("Metadata must be a JSON object: {0}")]
    InvalidMetadata(String),
}

/// Failure classes reported at the Gateway boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TransportErrorKind {
    /// Timeouts, dropped connections, 5xx responses
    Transient,
    /// The service asked us to slow down
    RateLimited,
    /// Retries were exhausted
    Unavailable,
    /// The service rejected the input itself (e.g. content-policy block)
    Malformed,
    /// Anything retrying cannot fix: auth, bad endpoint, undecodable reply
    Fatal,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportErrorKind::Transient => "Transient",
            TransportErrorKind::RateLimited => "RateLimited",
            TransportErrorKind::Unavailable => "Unavailable",
            TransportErrorKind::Malformed => "Malformed",
            TransportErrorKind::Fatal => "Fatal",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Transient, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::RateLimited, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Malformed, message)
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Fatal, message)
    }
}

/// Why a single step could not produce its output
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum StepError {
    #[error("Prompt assembly failed: {0}")]
    PromptAssembly(String),

    #[error("Reply was insufficient for this step: {0}")]
    ExtractionInsufficient(String),

    #[error("Gateway error: {0}")]
    Gateway(TransportError),

    #[error("Workflow state error: {0}")]
    Orchestration(String),
}

impl From<TransportError> for StepError {
    fn from(err: TransportError) -> Self {
        StepError::Gateway(err)
    }
}

/// Orchestration-level halt
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum WorkflowError {
    #[error("Invalid analysis input: {0}")]
    InvalidInput(#[from] ValidationError),

    #[error("Workflow failed at {step}: {cause}")]
    FailedAtStep { step: WorkflowStep, cause: StepError },

    #[error("Workflow cancelled while {step} was running")]
    Cancelled { step: WorkflowStep },

    #[error("Invalid workflow transition: {0}")]
    InvalidTransition(String),
}

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum DamError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Step error: {0}")]
    Step(#[from] StepError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::implementations::config::ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

/// Result type specific to DAM compliance operations
pub type DamResult<T> = Result<T, DamError>;

/// Recoverable vs. non-recoverable errors
pub trait RecoverableError {
    /// Whether repeating the same operation may succeed
    fn is_recoverable(&self) -> bool;
    /// A short hint for the person running the analysis
    fn recovery_strategy(&self) -> Option<String>;
}

impl RecoverableError for TransportError {
    fn is_recoverable(&self) -> bool {
        matches!(self.kind, TransportErrorKind::Transient | TransportErrorKind::RateLimited)
    }

    fn recovery_strategy(&self) -> Option<String> {
        let hint = match self.kind {
            TransportErrorKind::Transient => "Check your network connection and try again",
            TransportErrorKind::RateLimited => "Wait a few minutes before retrying",
            TransportErrorKind::Unavailable => {
                "The AI service is temporarily unavailable, try again later"
            }
            TransportErrorKind::Malformed => {
                "The content was rejected by the service, try a different image"
            }
            TransportErrorKind::Fatal => {
                "Verify the API key, endpoint and model in your configuration"
            }
        };
        Some(hint.to_string())
    }
}

impl RecoverableError for ValidationError {
    fn is_recoverable(&self) -> bool {
        false
    }

    fn recovery_strategy(&self) -> Option<String> {
        let hint = match self {
            ValidationError::EmptyImage | ValidationError::EmptyPrompt => return None,
            ValidationError::UnsupportedMediaType(_)
            | ValidationError::MediaTypeMismatch { .. } => {
                "Convert the image to JPEG or PNG and check the file extension"
            }
            ValidationError::ImageTooLarge { .. } => "Compress or resize the image",
            ValidationError::InvalidMetadata(_) => {
                "Provide metadata as a JSON object, e.g. {\"component_id\": \"...\"}"
            }
        };
        Some(hint.to_string())
    }
}

impl RecoverableError for StepError {
    fn is_recoverable(&self) -> bool {
        match self {
            StepError::Gateway(err) => err.is_recoverable(),
            _ => false,
        }
    }

    fn recovery_strategy(&self) -> Option<String> {
        match self {
            StepError::Gateway(err) => err.recovery_strategy(),
            StepError::ExtractionInsufficient(_) => {
                Some("Re-run the analysis; the model reply could not be used".to_string())
            }
            StepError::PromptAssembly(_) => {
                Some("Check the prompt templates in your configuration".to_string())
            }
            StepError::Orchestration(_) => None,
        }
    }
}
