//! Turns dialogue states into fixed-size feature vectors

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::domain::entities::{history_window, DialogueState, DomainSpec};

/// One-hot encoding of intent, entities and previous action per state,
/// concatenated over the history window and left-padded with zeros
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateFeaturizer {
    intents: Vec<String>,
    entities: Vec<String>,
    actions: Vec<String>,
    max_history: usize,
}

impl StateFeaturizer {
    pub fn new(domain: &DomainSpec, max_history: usize) -> Self {
        Self {
            intents: domain.intents.clone(),
            entities: domain.entities.clone(),
            actions: domain.action_names(),
            max_history: max_history.max(1),
        }
    }

    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    pub fn action_index(&self, name: &str) -> Option<usize> {
        self.actions.iter().position(|a| a == name)
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    pub fn state_dim(&self) -> usize {
        self.intents.len() + self.entities.len() + self.actions.len()
    }

    pub fn input_dim(&self) -> usize {
        self.state_dim() * self.max_history
    }

    pub fn encode(&self, history: &[DialogueState]) -> Array1<f64> {
        let mut features = Array1::zeros(self.input_dim());
        let window = history_window(history, self.max_history);
        let offset = self.max_history - window.len();

        for (slot, state) in window.iter().enumerate() {
            let base = (offset + slot) * self.state_dim();
            if let Some(i) = state.intent.as_ref().and_then(|n| self.intents.iter().position(|x| x == n)) {
                features[base + i] = 1.0;
            }
            for entity in &state.entities {
                if let Some(i) = self.entities.iter().position(|x| x == entity) {
                    features[base + self.intents.len() + i] = 1.0;
                }
            }
            if let Some(i) = state.prev_action.as_deref().and_then(|a| self.action_index(a)) {
                features[base + self.intents.len() + self.entities.len() + i] = 1.0;
            }
        }
        features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, s};

    #[test]
    fn test_encode_pads_short_history() {
        let domain = DomainSpec {
            intents: vec!["greet".to_string(), "bye".to_string()],
            entities: vec!["name".to_string()],
            actions: vec!["utter_greet".to_string()],
            ..Default::default()
        };
        let featurizer = StateFeaturizer::new(&domain, 2);
        assert_eq!(featurizer.state_dim(), 6);

        let state = DialogueState {
            intent: Some("bye".to_string()),
            entities: vec!["name".to_string()],
            prev_action: Some("utter_greet".to_string()),
        };
        let features = featurizer.encode(&[state]);
        assert_eq!(features.len(), 12);
        assert!(features.slice(s![..6]).iter().all(|&f| f == 0.0));
        assert_eq!(features.slice(s![6..]), arr1(&[0.0, 1.0, 1.0, 0.0, 0.0, 1.0]));
    }
}
