//! NLU model configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::application::errors::ConfigError;

/// Classifier hyperparameters read from `nlu_model_config.yml`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct NluModelConfig {
    pub language: String,
    pub lowercase: bool,
    /// Longest n-gram used as a feature
    pub max_ngram: usize,
    /// Additive smoothing for unseen feature counts
    pub smoothing: f64,
    /// Predictions below this confidence are reported without an intent
    pub fallback_threshold: f64,
}

impl Default for NluModelConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            lowercase: true,
            max_ngram: 2,
            smoothing: 1.0,
            fallback_threshold: 0.0,
        }
    }
}

impl NluModelConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_ngram == 0 {
            return Err(ConfigError::InvalidValue("max-ngram must be at least 1".to_string()));
        }
        if self.smoothing <= 0.0 {
            return Err(ConfigError::InvalidValue("smoothing must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.fallback_threshold) {
            return Err(ConfigError::InvalidValue(
                "fallback-threshold must be within 0..=1".to_string(),
            ));
        }
        Ok(())
    }
}
