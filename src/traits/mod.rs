pub mod model_gateway;
pub mod step_processor;

// Re-export traits
pub use model_gateway::{ModelGateway, ModelTransport};
pub use step_processor::{PriorOutputs, StepProcessor};
