//! Interpreters turning user text into intents and entities

use std::path::Path;

use crate::application::errors::BotError;
use crate::domain::entities::{Entity, IntentMatch, ParseResult};
use crate::domain::traits::Interpreter;
use crate::infrastructure::data::stories::parse_user_step;
use crate::infrastructure::storage;
use super::trainer::{NluModel, MODEL_FILE, NLU_KIND};

/// Interpreter backed by a trained [`NluModel`]
pub struct NluInterpreter {
    model: NluModel,
}

impl NluInterpreter {
    pub fn new(model: NluModel) -> Self {
        Self { model }
    }

    /// Load a model written by `IntentTrainer::persist`
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, BotError> {
        let dir = dir.as_ref();
        let metadata = storage::read_metadata(dir, NLU_KIND)?;
        let model: NluModel = storage::read_json(dir, MODEL_FILE)?;
        tracing::info!("Loaded NLU model {} from {}", metadata.fingerprint, dir.display());
        Ok(Self::new(model))
    }
}

impl Interpreter for NluInterpreter {
    fn parse(&self, text: &str) -> ParseResult {
        let ranking = self.model.classifier.rank(text);
        let intent = ranking
            .first()
            .filter(|top| top.confidence >= self.model.config.fallback_threshold)
            .cloned();
        if intent.is_none() {
            tracing::debug!("No intent above threshold for '{}'", text);
        }

        ParseResult {
            text: text.to_string(),
            intent,
            entities: self.model.entities.extract(text),
            intent_ranking: ranking,
        }
    }
}

/// Reads `/intent{"entity": "value"}` directly, without a model
#[derive(Debug, Clone, Default)]
pub struct RegexInterpreter;

impl RegexInterpreter {
    pub fn new() -> Self {
        Self
    }
}

impl Interpreter for RegexInterpreter {
    fn parse(&self, text: &str) -> ParseResult {
        let trimmed = text.trim();
        let Some(body) = trimmed.strip_prefix('/') else {
            return ParseResult::empty(text);
        };

        match parse_user_step(body) {
            Ok((intent, entities)) => {
                let intent = IntentMatch { name: intent, confidence: 1.0 };
                ParseResult {
                    text: text.to_string(),
                    intent: Some(intent.clone()),
                    entities: entities
                        .into_iter()
                        .map(|(name, value)| Entity::new(name, value, 0, 0))
                        .collect(),
                    intent_ranking: vec![intent],
                }
            }
            Err(e) => {
                tracing::warn!("Could not parse '{}': {}", text, e);
                ParseResult::empty(text)
            }
        }
    }
}
