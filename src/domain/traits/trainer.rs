use std::path::{Path, PathBuf};

use crate::application::errors::BotError;
use crate::domain::entities::{PolicyParams, Story, TrainingData};

/// Trains an intent classifier and writes it to disk
pub trait NluTrainer {
    fn train(&mut self, data: &TrainingData) -> Result<(), BotError>;

    /// Persist under `models_dir` using `fixed_model_name` and return the artifact directory
    fn persist(&self, models_dir: &Path, fixed_model_name: &str) -> Result<PathBuf, BotError>;
}

/// Trains dialogue policies from stories and writes them to disk
pub trait DialogueTrainer {
    fn train(&mut self, stories: &[Story], params: &PolicyParams) -> Result<(), BotError>;

    /// Persist to exactly `path`
    fn persist(&self, path: &Path) -> Result<(), BotError>;
}
