use serde::{Deserialize, Serialize};

/// Hyperparameters for unattended dialogue training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PolicyParams {
    /// Number of past states the policies look at
    pub max_history: usize,
    /// Number of randomly glued story pairs added to the training set
    pub augmentation_factor: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub validation_split: f64,
    /// Seed for augmentation, shuffling and weight init
    pub seed: u64,
    /// Later samples override earlier ones instead of being dropped as ambiguous
    #[serde(default)]
    pub online: bool,
}

impl Default for PolicyParams {
    fn default() -> Self {
        Self {
            max_history: 2,
            augmentation_factor: 50,
            epochs: 500,
            batch_size: 50,
            validation_split: 0.2,
            seed: 42,
            online: false,
        }
    }
}

/// Hyperparameters for training with corrective feedback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OnlineParams {
    pub max_history: usize,
    pub epochs: usize,
    pub batch_size: usize,
    /// Only the most recent samples are kept when retraining
    pub max_training_samples: usize,
    pub seed: u64,
}

impl Default for OnlineParams {
    fn default() -> Self {
        Self {
            max_history: 2,
            epochs: 200,
            batch_size: 50,
            max_training_samples: 300,
            seed: 42,
        }
    }
}

impl OnlineParams {
    /// Batch parameters used for each retraining round
    pub fn as_policy_params(&self) -> PolicyParams {
        PolicyParams {
            max_history: self.max_history,
            augmentation_factor: 0,
            epochs: self.epochs,
            batch_size: self.batch_size,
            validation_split: 0.0,
            seed: self.seed,
            online: true,
        }
    }
}
