//! NLU trainer

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::application::errors::BotError;
use crate::domain::entities::TrainingData;
use crate::domain::traits::NluTrainer;
use crate::infrastructure::storage::{self, ArtifactMetadata};
use super::classifier::{EntityLookup, IntentClassifier};
use super::config::NluModelConfig;

pub const NLU_KIND: &str = "nlu";
pub const MODEL_FILE: &str = "intent_classifier.json";
/// Project directory the model is stored under
pub const DEFAULT_PROJECT: &str = "default";

/// Everything the interpreter needs at runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NluModel {
    pub config: NluModelConfig,
    pub classifier: IntentClassifier,
    pub entities: EntityLookup,
}

/// Trains an [`NluModel`] and persists it as `<models>/default/<name>`
pub struct IntentTrainer {
    config: NluModelConfig,
    model: Option<NluModel>,
}

impl IntentTrainer {
    pub fn new(config: NluModelConfig) -> Self {
        Self { config, model: None }
    }
}

impl NluTrainer for IntentTrainer {
    fn train(&mut self, data: &TrainingData) -> Result<(), BotError> {
        if data.is_empty() {
            return Err(BotError::TrainingData("cannot train on an empty data set".to_string()));
        }
        tracing::info!("Training NLU model on {} examples", data.len());

        let classifier = IntentClassifier::train(data, &self.config);
        let entities = EntityLookup::train(data);
        tracing::info!(
            "Finished NLU training: {} intents, {} entity values",
            classifier.intents().len(),
            entities.len()
        );

        self.model = Some(NluModel {
            config: self.config.clone(),
            classifier,
            entities,
        });
        Ok(())
    }

    fn persist(&self, models_dir: &Path, fixed_model_name: &str) -> Result<PathBuf, BotError> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| BotError::Training("NLU model must be trained before it is persisted".to_string()))?;

        let dir = models_dir.join(DEFAULT_PROJECT).join(fixed_model_name);
        storage::write_json(&dir, MODEL_FILE, model)?;
        let metadata = ArtifactMetadata::new(NLU_KIND).with_extra(serde_json::json!({
            "language": model.config.language,
            "intents": model.classifier.intents(),
        }));
        storage::write_metadata(&dir, &metadata)?;

        tracing::info!("Persisted NLU model to {}", dir.display());
        Ok(dir)
    }
}
