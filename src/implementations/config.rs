use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::{AnalyzerOptions, GenerationParams, RetryPolicy};
use crate::implementations::prompts::PromptTemplates;
use crate::models::checklist::JobAidSchema;
use crate::models::input::DEFAULT_MAX_IMAGE_BYTES;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Missing required API key: {0}")]
    MissingApiKey(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

pub const DEFAULT_API_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";

/// Environment variables checked for the API key, in order
pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ModelConfig {
    /// API key for the model service
    pub api_key: Option<String>,

    /// Base URL of the generative language API
    pub api_endpoint: String,

    /// Model identifier
    pub model: String,

    /// Optional system instruction sent with every request
    pub system_instruction: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            system_instruction: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest accepted image in bytes
    pub max_image_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self { max_image_bytes: DEFAULT_MAX_IMAGE_BYTES }
    }
}

/// Analyzer configuration as read from YAML. Every section is optional.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub model: ModelConfig,
    pub generation: GenerationParams,
    pub retry: RetryPolicy,
    pub prompts: PromptTemplates,
    /// Replaces the built-in job aid when present
    pub job_aid: Option<JobAidSchema>,
    pub limits: LimitsConfig,
}

impl AnalyzerConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: AnalyzerConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(job_aid) = &self.job_aid {
            job_aid.validate().map_err(ConfigError::InvalidValue)?;
        }
        self.prompts.validate().map_err(ConfigError::InvalidValue)?;

        if !(0.0..=1.0).contains(&self.retry.jitter_ratio) {
            return Err(ConfigError::InvalidValue(format!(
                "retry.jitter_ratio must be between 0 and 1, got {}",
                self.retry.jitter_ratio
            )));
        }
        if self.retry.call_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "retry.call_timeout_secs must be positive".to_string(),
            ));
        }
        if self.limits.max_image_bytes == 0 {
            return Err(ConfigError::InvalidValue(
                "limits.max_image_bytes must be positive".to_string(),
            ));
        }
        if let Some(t) = self.generation.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::InvalidValue(format!(
                    "generation.temperature out of range: {}",
                    t
                )));
            }
        }
        Ok(())
    }

    /// Get the API key, checking environment variables if not in config
    pub fn get_api_key(&self) -> Result<String, ConfigError> {
        use log::debug;

        if let Some(api_key) = self.model.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            debug!("Using API key from config");
            return Ok(api_key.clone());
        }

        for env_var in API_KEY_ENV_VARS {
            match std::env::var(env_var) {
                Ok(key) if !key.trim().is_empty() => {
                    debug!("Using API key from {}", env_var);
                    return Ok(key);
                }
                _ => debug!("{} not set", env_var),
            }
        }

        Err(ConfigError::MissingApiKey(format!(
            "set model.api_key in the config or one of {}",
            API_KEY_ENV_VARS.join(", ")
        )))
    }

    /// Options handed to the Step Processors
    pub fn analyzer_options(&self) -> AnalyzerOptions {
        AnalyzerOptions {
            generation: self.generation.clone(),
            job_aid: self.job_aid.clone().unwrap_or_default(),
            prompts: self.prompts.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_gives_defaults() {
        let config = AnalyzerConfig::from_yaml("{}").unwrap();
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.model.model, DEFAULT_MODEL);
        assert_eq!(config.limits.max_image_bytes, 10 * 1024 * 1024);
        assert_eq!(config.analyzer_options().job_aid, JobAidSchema::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let yaml = "retry:\n  max_retries: 5\nmodel:\n  model: gemini-1.5-flash\n";
        let config = AnalyzerConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.model.model, "gemini-1.5-flash");
        assert_eq!(config.model.api_endpoint, DEFAULT_API_ENDPOINT);
    }

    #[test]
    fn job_aid_override_is_validated() {
        let yaml = "job_aid:\n  categories: []\n";
        assert!(matches!(AnalyzerConfig::from_yaml(yaml), Err(ConfigError::InvalidValue(_))));

        let yaml =
            "job_aid:\n  categories:\n    - name: qc\n      subcategories:\n        - name: visual\n          items: [clarity]\n";
        let config = AnalyzerConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.analyzer_options().job_aid.item_paths(), vec!["qc.visual.clarity"]);
    }

    #[test]
    fn config_key_wins_over_environment() {
        let mut config = AnalyzerConfig::default();
        config.model.api_key = Some("from-config".to_string());
        assert_eq!(config.get_api_key().unwrap(), "from-config");
    }

    #[test]
    fn invalid_jitter_is_rejected() {
        let yaml = "retry:\n  jitter_ratio: 1.5\n";
        assert!(matches!(AnalyzerConfig::from_yaml(yaml), Err(ConfigError::InvalidValue(_))));
    }
}
