//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::application::errors::ConfigError;

/// Bot configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub params: ParamsConfig,
    #[serde(default)]
    pub connectors: ConnectorsConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which run mode to execute and how
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ParamsConfig {
    pub mode: String,
    /// Train dialogue interactively instead of in batch
    #[serde(default)]
    pub online: bool,
    #[serde(default)]
    pub channel: ChannelKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelKind {
    #[default]
    Console,
    Webhook,
}

/// Chat platform credentials
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConnectorsConfig {
    pub developer_token: Option<String>,
    pub client_token: Option<String>,
    pub verification_token: Option<String>,
    /// Base URL of the platform's send API; replies are only returned inline when unset
    pub api_base: Option<String>,
}

/// Filesystem layout
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PathsConfig {
    pub nlu_data: PathBuf,
    pub nlu_config: PathBuf,
    pub nlu_models: PathBuf,
    pub nlu_model_name: String,
    pub domain: PathBuf,
    pub stories: PathBuf,
    pub dialogue_model: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct WebhookConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for ParamsConfig {
    fn default() -> Self {
        Self {
            mode: "run-bot".to_string(),
            online: false,
            channel: ChannelKind::Console,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            nlu_data: PathBuf::from("data/nlu_intents/"),
            nlu_config: PathBuf::from("nlu_model_config.yml"),
            nlu_models: PathBuf::from("models/nlu"),
            nlu_model_name: "intents".to_string(),
            domain: PathBuf::from("dynamo_domain.yml"),
            stories: PathBuf::from("data/dialogue_stories/stories.md"),
            dialogue_model: PathBuf::from("models/dialogue"),
        }
    }
}

impl PathsConfig {
    /// Where `train-nlu` leaves the classifier and `run-bot` picks it up
    pub fn nlu_model_dir(&self) -> PathBuf {
        self.nlu_models.join("default").join(&self.nlu_model_name)
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5004,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }

    /// Load the file if it exists, otherwise start from defaults; env vars win either way
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::load(path)?
        } else {
            Config::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(mode) = var("BOT_MODE") {
            self.params.mode = mode;
        }
        if let Some(token) = var("BOT_DEVELOPER_TOKEN") {
            self.connectors.developer_token = Some(token);
        }
        if let Some(token) = var("BOT_CLIENT_TOKEN") {
            self.connectors.client_token = Some(token);
        }
        if let Some(token) = var("BOT_VERIFICATION_TOKEN") {
            self.connectors.verification_token = Some(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_fills_defaults() {
        let config = Config::from_yaml("params:\n  mode: train-nlu\n").unwrap();
        assert_eq!(config.params.mode, "train-nlu");
        assert!(!config.params.online);
        assert_eq!(config.params.channel, ChannelKind::Console);
        assert_eq!(config.webhook.port, 5004);
        assert_eq!(config.paths.nlu_model_dir(), PathBuf::from("models/nlu/default/intents"));
        assert!(config.connectors.developer_token.is_none());
    }

    #[test]
    fn test_connectors_section() {
        let yaml = r#"
params:
  mode: run-bot
  channel: webhook
connectors:
  developer-token: dev-123
  client-token: client-456
  verification-token: verify-789
webhook:
  port: 8080
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.params.channel, ChannelKind::Webhook);
        assert_eq!(config.connectors.developer_token.as_deref(), Some("dev-123"));
        assert_eq!(config.connectors.client_token.as_deref(), Some("client-456"));
        assert_eq!(config.connectors.verification_token.as_deref(), Some("verify-789"));
        assert_eq!(config.webhook.port, 8080);
        assert_eq!(config.webhook.host, "0.0.0.0");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            "BOT_MODE" => Some("train-dialogue".to_string()),
            "BOT_CLIENT_TOKEN" => Some("from-env".to_string()),
            _ => None,
        });
        assert_eq!(config.params.mode, "train-dialogue");
        assert_eq!(config.connectors.client_token.as_deref(), Some("from-env"));
        assert!(config.connectors.verification_token.is_none());
    }

    #[test]
    fn test_invalid_yaml_is_parse_error() {
        let err = Config::from_yaml("params: [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("nope.yaml")).unwrap();
        assert_eq!(config.paths.domain, PathBuf::from("dynamo_domain.yml"));
    }
}
