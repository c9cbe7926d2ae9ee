use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::models::checklist::JobAidSchema;

/// Retry and timeout policy for Gateway calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt for Transient/RateLimited failures
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Jitter applied to each delay, as a fraction of it (0.25 = ±25%)
    pub jitter_ratio: f64,
    /// Wall-clock ceiling for a single attempt
    pub call_timeout_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 8000,
            jitter_ratio: 0.25,
            call_timeout_secs: 120,
        }
    }
}

impl RetryPolicy {
    /// Same ceilings as the default policy but without any waiting between attempts
    pub fn without_delay() -> Self {
        Self {
            base_delay_ms: 0,
            max_delay_ms: 0,
            jitter_ratio: 0.0,
            ..Self::default()
        }
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay before retry number `retry` (0-based): base * 2^retry, capped, with jitter
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponential = (self.base_delay_ms as f64) * 2f64.powi(retry.min(30) as i32);
        let capped = exponential.min(self.max_delay_ms as f64);

        let jitter_range = capped * self.jitter_ratio.clamp(0.0, 1.0);
        let jitter = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };

        Duration::from_millis((capped + jitter).max(0.0) as u64)
    }
}

/// Generation parameters sent with every model request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    pub max_output_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_output_tokens: Some(8192),
            temperature: Some(0.1),
        }
    }
}

/// Immutable options shared by the Step Processors of one analyzer
#[derive(Debug, Clone)]
pub struct AnalyzerOptions {
    pub generation: GenerationParams,
    pub job_aid: JobAidSchema,
    pub prompts: crate::implementations::prompts::PromptTemplates,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            generation: GenerationParams::default(),
            job_aid: JobAidSchema::default(),
            prompts: crate::implementations::prompts::PromptTemplates::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy { jitter_ratio: 0.0, ..RetryPolicy::default() };
        assert_eq!(policy.backoff(0), Duration::from_millis(1000));
        assert_eq!(policy.backoff(1), Duration::from_millis(2000));
        assert_eq!(policy.backoff(2), Duration::from_millis(4000));
        assert_eq!(policy.backoff(5), Duration::from_millis(8000));
    }

    #[test]
    fn jitter_stays_within_ratio() {
        let policy = RetryPolicy::default();
        for _ in 0..50 {
            let delay = policy.backoff(1).as_millis();
            assert!((1500..=2500).contains(&delay), "delay {} out of range", delay);
        }
    }

    #[test]
    fn without_delay_keeps_retry_ceiling() {
        let policy = RetryPolicy::without_delay();
        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(policy.backoff(3), Duration::ZERO);
    }
}
