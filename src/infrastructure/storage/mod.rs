//! File-based artifact storage
//!
//! A trained model is a directory of JSON files plus a `metadata.json`
//! describing what produced it.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::application::errors::BotError;

pub const METADATA_FILE: &str = "metadata.json";

/// Describes a persisted artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub kind: String,
    pub fingerprint: String,
    pub trained_at: DateTime<Utc>,
    pub version: String,
    #[serde(default)]
    pub extra: serde_json::Value,
}

impl ArtifactMetadata {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            fingerprint: uuid::Uuid::new_v4().to_string(),
            trained_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            extra: serde_json::Value::Null,
        }
    }

    pub fn with_extra(mut self, extra: serde_json::Value) -> Self {
        self.extra = extra;
        self
    }
}

/// Serialize `value` as pretty JSON into `dir/file`, creating `dir` if needed
pub fn write_json<T: Serialize>(dir: &Path, file: &str, value: &T) -> Result<(), BotError> {
    std::fs::create_dir_all(dir)?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| BotError::Artifact(format!("Failed to serialize {}: {}", file, e)))?;
    std::fs::write(dir.join(file), json)?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<T, BotError> {
    let path = dir.join(file);
    let content = std::fs::read_to_string(&path)
        .map_err(|e| BotError::Artifact(format!("Failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&content)
        .map_err(|e| BotError::Artifact(format!("Failed to parse {}: {}", path.display(), e)))
}

pub fn write_metadata(dir: &Path, metadata: &ArtifactMetadata) -> Result<(), BotError> {
    write_json(dir, METADATA_FILE, metadata)
}

/// Read the metadata and check it was written by the expected kind of trainer
pub fn read_metadata(dir: &Path, expected_kind: &str) -> Result<ArtifactMetadata, BotError> {
    if !dir.is_dir() {
        return Err(BotError::Artifact(format!(
            "No trained model at {}, train it first",
            dir.display()
        )));
    }
    let metadata: ArtifactMetadata = read_json(dir, METADATA_FILE)?;
    if metadata.kind != expected_kind {
        return Err(BotError::Artifact(format!(
            "{} holds a '{}' model, expected '{}'",
            dir.display(),
            metadata.kind,
            expected_kind
        )));
    }
    Ok(metadata)
}
