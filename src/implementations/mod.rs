pub mod config;
pub mod prompts;
pub mod gemini_transport;
pub mod retrying_gateway;
pub mod extractor;
pub mod step1_processor;
pub mod step2_processor;
pub mod step3_processor;
pub mod orchestrator;

pub use orchestrator::{GeminiOrchestrator, Orchestrator, StateObserver};
pub use retrying_gateway::RetryingGateway;
pub use gemini_transport::GeminiTransport;
