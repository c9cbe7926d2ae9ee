use async_trait::async_trait;

use crate::errors::TransportError;
use crate::models::input::{ModelReply, ModelRequest};

/// A single attempt at the remote multimodal model.
///
/// Implementations classify every failure into a `TransportErrorKind`
/// and never retry on their own.
#[async_trait]
pub trait ModelTransport: Send + Sync {
    /// Send one request and wait for the reply text
    async fn send(&self, request: &ModelRequest) -> Result<ModelReply, TransportError>;

    /// Model identifier, for logging
    fn model_name(&self) -> &str;
}

/// Image + prompt in, text out, with retry and timeout policy applied
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn invoke(&self, request: ModelRequest) -> Result<ModelReply, TransportError>;
}
