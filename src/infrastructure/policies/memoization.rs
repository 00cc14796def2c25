//! Exact-match policy

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::application::errors::BotError;
use crate::domain::entities::{history_window, DialogueState, PolicyParams};
use crate::infrastructure::storage;
use super::featurizer::StateFeaturizer;
use super::traits::{Policy, TrainingSample};

pub const MEMOIZATION: &str = "memoization";

/// Remembers which action followed each history seen in training
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoizationPolicy {
    max_history: usize,
    lookup: BTreeMap<String, String>,
}

impl MemoizationPolicy {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history: max_history.max(1),
            lookup: BTreeMap::new(),
        }
    }

    pub fn load(dir: &Path) -> Result<Self, BotError> {
        storage::read_json(dir, &format!("{}.json", MEMOIZATION))
    }

    fn key(&self, history: &[DialogueState]) -> String {
        history_window(history, self.max_history)
            .iter()
            .map(DialogueState::key)
            .collect::<Vec<_>>()
            .join(" || ")
    }

    /// The remembered action for this history, if any
    pub fn recall(&self, history: &[DialogueState]) -> Option<&str> {
        self.lookup.get(&self.key(history)).map(String::as_str)
    }
}

impl Policy for MemoizationPolicy {
    fn name(&self) -> &'static str {
        MEMOIZATION
    }

    fn train(
        &mut self,
        samples: &[TrainingSample],
        _featurizer: &StateFeaturizer,
        params: &PolicyParams,
    ) -> Result<(), BotError> {
        self.max_history = params.max_history.max(1);
        self.lookup.clear();
        let mut ambiguous = BTreeSet::new();

        for sample in samples {
            let key = self.key(&sample.history);
            if ambiguous.contains(&key) {
                continue;
            }
            match self.lookup.get(&key) {
                Some(_) if params.online => {
                    self.lookup.insert(key, sample.action.clone());
                }
                Some(existing) if existing != &sample.action => {
                    self.lookup.remove(&key);
                    ambiguous.insert(key);
                }
                Some(_) => {}
                None => {
                    self.lookup.insert(key, sample.action.clone());
                }
            }
        }

        tracing::debug!(
            "Memorized {} histories ({} ambiguous dropped)",
            self.lookup.len(),
            ambiguous.len()
        );
        Ok(())
    }

    fn predict(&self, history: &[DialogueState], featurizer: &StateFeaturizer) -> Array1<f64> {
        let mut probs = Array1::zeros(featurizer.actions().len());
        if let Some(i) = self.recall(history).and_then(|a| featurizer.action_index(a)) {
            probs[i] = 1.0;
        }
        probs
    }

    fn persist(&self, dir: &Path) -> Result<(), BotError> {
        storage::write_json(dir, &format!("{}.json", MEMOIZATION), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::DomainSpec;

    fn state(intent: &str, prev: &str) -> DialogueState {
        DialogueState {
            intent: Some(intent.to_string()),
            entities: Vec::new(),
            prev_action: Some(prev.to_string()),
        }
    }

    fn sample(history: Vec<DialogueState>, action: &str) -> TrainingSample {
        TrainingSample { history, action: action.to_string() }
    }

    #[test]
    fn test_recalls_and_drops_conflicts() {
        let domain = DomainSpec {
            intents: vec!["greet".to_string(), "bye".to_string()],
            actions: vec!["utter_greet".to_string(), "utter_bye".to_string()],
            ..Default::default()
        };
        let featurizer = StateFeaturizer::new(&domain, 2);
        let greet = vec![state("greet", "action_listen")];
        let bye = vec![state("bye", "action_listen")];

        let mut policy = MemoizationPolicy::new(2);
        policy
            .train(
                &[
                    sample(greet.clone(), "utter_greet"),
                    sample(bye.clone(), "utter_bye"),
                    sample(bye.clone(), "utter_greet"),
                    sample(bye.clone(), "utter_bye"),
                ],
                &featurizer,
                &PolicyParams::default(),
            )
            .unwrap();

        assert_eq!(policy.lookup.len(), 1);
        assert_eq!(policy.recall(&greet), Some("utter_greet"));
        assert_eq!(policy.recall(&bye), None);

        let probs = policy.predict(&greet, &featurizer);
        assert_eq!(probs[featurizer.action_index("utter_greet").unwrap()], 1.0);
        assert_eq!(probs.sum(), 1.0);
    }

    #[test]
    fn test_online_training_prefers_latest() {
        let featurizer = StateFeaturizer::new(&DomainSpec::default(), 2);
        let params = PolicyParams { online: true, ..Default::default() };
        let history = vec![state("greet", "action_listen")];
        let mut policy = MemoizationPolicy::new(2);
        policy
            .train(
                &[sample(history.clone(), "utter_greet"), sample(history.clone(), "utter_bye")],
                &featurizer,
                &params,
            )
            .unwrap();
        assert_eq!(policy.recall(&history), Some("utter_bye"));
    }

    #[test]
    fn test_only_window_matters() {
        let mut policy = MemoizationPolicy::new(1);
        let featurizer = StateFeaturizer::new(&DomainSpec::default(), 1);
        let mut params = PolicyParams::default();
        params.max_history = 1;
        policy
            .train(&[sample(vec![state("a", "x"), state("b", "y")], "action_listen")], &featurizer, &params)
            .unwrap();

        assert_eq!(policy.recall(&[state("z", "w"), state("b", "y")]), Some("action_listen"));
    }
}
