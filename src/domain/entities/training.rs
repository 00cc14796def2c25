use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::Entity;

/// A labeled NLU example
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NluExample {
    pub text: String,
    pub intent: String,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

impl NluExample {
    pub fn new(text: impl Into<String>, intent: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            intent: intent.into(),
            entities: Vec::new(),
        }
    }

    pub fn with_entities(mut self, entities: Vec<Entity>) -> Self {
        self.entities = entities;
        self
    }
}

/// Loaded NLU training set, in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingData {
    pub examples: Vec<NluExample>,
}

impl TrainingData {
    pub fn new(examples: Vec<NluExample>) -> Self {
        Self { examples }
    }

    pub fn merge(&mut self, other: TrainingData) {
        self.examples.extend(other.examples);
    }

    pub fn intents(&self) -> BTreeSet<&str> {
        self.examples.iter().map(|e| e.intent.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }
}
