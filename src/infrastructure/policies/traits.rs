use std::path::Path;

use ndarray::Array1;

use crate::application::errors::BotError;
use crate::domain::entities::{DialogueState, PolicyParams};
use super::featurizer::StateFeaturizer;

/// State history paired with the action taken after it
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSample {
    pub history: Vec<DialogueState>,
    pub action: String,
}

/// Policy trait - picks the next action from the conversation history
pub trait Policy: Send + Sync {
    /// Name used in logs and as the persisted file stem
    fn name(&self) -> &'static str;

    fn train(
        &mut self,
        samples: &[TrainingSample],
        featurizer: &StateFeaturizer,
        params: &PolicyParams,
    ) -> Result<(), BotError>;

    /// Probability for every action, in `featurizer.actions()` order
    fn predict(&self, history: &[DialogueState], featurizer: &StateFeaturizer) -> Array1<f64>;

    fn persist(&self, dir: &Path) -> Result<(), BotError>;
}
