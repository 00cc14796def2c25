//! Runs every policy and keeps the most confident answer

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::application::errors::BotError;
use crate::domain::entities::{DialogueState, DomainSpec, PolicyParams, ACTION_LISTEN};
use crate::infrastructure::storage;
use super::featurizer::StateFeaturizer;
use super::memoization::{MemoizationPolicy, MEMOIZATION};
use super::neural::{NeuralPolicy, NEURAL};
use super::traits::{Policy, TrainingSample};

pub const POLICY_METADATA_FILE: &str = "policy_metadata.json";

#[derive(Debug, Serialize, Deserialize)]
struct EnsembleMetadata {
    policies: Vec<String>,
    featurizer: StateFeaturizer,
}

/// Chosen next action
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub action: String,
    pub confidence: f64,
    pub policy: &'static str,
}

pub struct PolicyEnsemble {
    policies: Vec<Box<dyn Policy>>,
    featurizer: StateFeaturizer,
}

impl PolicyEnsemble {
    pub fn new(policies: Vec<Box<dyn Policy>>, featurizer: StateFeaturizer) -> Self {
        Self { policies, featurizer }
    }

    /// Memoization backed by the neural policy
    pub fn default_for(domain: &DomainSpec, max_history: usize) -> Self {
        Self::new(
            vec![
                Box::new(MemoizationPolicy::new(max_history)),
                Box::new(NeuralPolicy::default()),
            ],
            StateFeaturizer::new(domain, max_history),
        )
    }

    pub fn featurizer(&self) -> &StateFeaturizer {
        &self.featurizer
    }

    pub fn policy_names(&self) -> Vec<&'static str> {
        self.policies.iter().map(|p| p.name()).collect()
    }

    /// Train all policies; the featurizer is rebuilt for the params' history window
    pub fn train(
        &mut self,
        domain: &DomainSpec,
        samples: &[TrainingSample],
        params: &PolicyParams,
    ) -> Result<(), BotError> {
        self.featurizer = StateFeaturizer::new(domain, params.max_history);
        for policy in &mut self.policies {
            tracing::info!("Training policy '{}'", policy.name());
            policy.train(samples, &self.featurizer, params)?;
        }
        Ok(())
    }

    /// Highest confidence across policies; earlier policies win ties.
    /// Falls back to listening when no policy has an opinion.
    pub fn predict(&self, history: &[DialogueState]) -> Prediction {
        let mut best = Prediction {
            action: ACTION_LISTEN.to_string(),
            confidence: 0.0,
            policy: "fallback",
        };

        for policy in &self.policies {
            let probs = policy.predict(history, &self.featurizer);
            for (i, &p) in probs.iter().enumerate() {
                if p > best.confidence {
                    if let Some(action) = self.featurizer.actions().get(i) {
                        best = Prediction {
                            action: action.clone(),
                            confidence: p,
                            policy: policy.name(),
                        };
                    }
                }
            }
        }
        best
    }

    pub fn persist(&self, dir: &Path) -> Result<(), BotError> {
        let metadata = EnsembleMetadata {
            policies: self.policy_names().into_iter().map(str::to_string).collect(),
            featurizer: self.featurizer.clone(),
        };
        storage::write_json(dir, POLICY_METADATA_FILE, &metadata)?;
        for policy in &self.policies {
            policy.persist(dir)?;
        }
        Ok(())
    }

    pub fn load(dir: &Path) -> Result<Self, BotError> {
        let metadata: EnsembleMetadata = storage::read_json(dir, POLICY_METADATA_FILE)?;
        let mut policies: Vec<Box<dyn Policy>> = Vec::with_capacity(metadata.policies.len());
        for name in &metadata.policies {
            let policy: Box<dyn Policy> = match name.as_str() {
                MEMOIZATION => Box::new(MemoizationPolicy::load(dir)?),
                NEURAL => Box::new(NeuralPolicy::load(dir)?),
                other => {
                    return Err(BotError::Artifact(format!("unknown policy '{}' in {}", other, dir.display())))
                }
            };
            policies.push(policy);
        }
        Ok(Self::new(policies, metadata.featurizer))
    }
}
