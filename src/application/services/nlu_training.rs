//! NLU training orchestration

use std::path::{Path, PathBuf};

use crate::application::errors::BotError;
use crate::domain::traits::NluTrainer;
use crate::infrastructure::data::load_data;
use crate::infrastructure::nlu::NluModelConfig;

/// Load examples, train, persist once under `fixed_model_name`, return the artifact path.
/// Loader and trainer failures are returned as they are.
pub fn train_nlu<T, F>(
    data_dir: &Path,
    model_config: &Path,
    models_dir: &Path,
    fixed_model_name: &str,
    make_trainer: F,
) -> Result<PathBuf, BotError>
where
    T: NluTrainer,
    F: FnOnce(NluModelConfig) -> T,
{
    let training_data = load_data(data_dir)?;
    let config = NluModelConfig::load(model_config)?;
    let mut trainer = make_trainer(config);
    trainer.train(&training_data)?;
    let model_directory = trainer.persist(models_dir, fixed_model_name)?;
    Ok(model_directory)
}
