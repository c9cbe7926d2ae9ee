use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::time::{sleep, timeout};

use crate::config::RetryPolicy;
use crate::errors::{RecoverableError, TransportError, TransportErrorKind};
use crate::models::input::{ModelReply, ModelRequest};
use crate::traits::{ModelGateway, ModelTransport};

/// Gateway that wraps a transport with a per-attempt deadline and
/// exponential backoff for Transient and RateLimited failures.
///
/// Malformed, Fatal and transport-reported Unavailable errors are returned
/// as-is after a single attempt. Exhausting the retry ceiling yields
/// `Unavailable`.
pub struct RetryingGateway<T: ModelTransport> {
    transport: T,
    policy: RetryPolicy,
}

impl<T: ModelTransport> RetryingGateway<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn attempt(&self, request: &ModelRequest) -> Result<ModelReply, TransportError> {
        let deadline = self.policy.call_timeout();
        match timeout(deadline, self.transport.send(request)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::transient(format!(
                "call timed out after {:?}",
                deadline
            ))),
        }
    }
}

#[async_trait]
impl<T: ModelTransport> ModelGateway for RetryingGateway<T> {
    async fn invoke(&self, request: ModelRequest) -> Result<ModelReply, TransportError> {
        let max_attempts = self.policy.max_attempts();
        let mut last_error: Option<TransportError> = None;

        debug!(
            "Invoking {} (prompt length: {} characters, image: {} bytes, {})",
            self.transport.model_name(),
            request.prompt().len(),
            request.image().len(),
            request.media_type()
        );

        for attempt in 0..max_attempts {
            match self.attempt(&request).await {
                Ok(reply) => {
                    info!(
                        "Model replied on attempt {}/{} in {:?} ({} characters)",
                        attempt + 1,
                        max_attempts,
                        reply.latency,
                        reply.text.len()
                    );
                    return Ok(reply);
                }
                Err(err) if err.is_recoverable() => {
                    if attempt + 1 < max_attempts {
                        let delay = self.policy.backoff(attempt);
                        warn!(
                            "Attempt {}/{} failed ({}), retrying in {:?}",
                            attempt + 1,
                            max_attempts,
                            err,
                            delay
                        );
                        sleep(delay).await;
                    } else {
                        warn!(
                            "Attempt {}/{} failed ({}), giving up",
                            attempt + 1,
                            max_attempts,
                            err
                        );
                    }
                    last_error = Some(err);
                }
                Err(err) => {
                    warn!(
                        "Attempt {}/{} failed with non-retryable error: {}",
                        attempt + 1,
                        max_attempts,
                        err
                    );
                    return Err(err);
                }
            }
        }

        let cause = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempt was made".to_string());
        Err(TransportError::new(
            TransportErrorKind::Unavailable,
            format!("gave up after {} attempts, last error: {}", max_attempts, cause),
        ))
    }
}
