//! Dialogue policy training orchestration

use std::path::{Path, PathBuf};

use crate::application::agent::{Agent, OnlineSummary};
use crate::application::errors::BotError;
use crate::domain::entities::{DomainSpec, OnlineParams, PolicyParams};
use crate::domain::traits::{DialogueTrainer, InteractiveChannel};
use crate::infrastructure::data::{load_domain, load_stories};

/// Train unattended on the stories and persist exactly once at `model_path`
pub fn train_dialogue<T, F>(
    domain_file: &Path,
    training_data_file: &Path,
    model_path: &Path,
    params: &PolicyParams,
    make_trainer: F,
) -> Result<PathBuf, BotError>
where
    T: DialogueTrainer,
    F: FnOnce(DomainSpec) -> T,
{
    let domain = load_domain(domain_file)?;
    let mut agent = make_trainer(domain);
    let training_data = load_stories(training_data_file)?;

    agent.train(&training_data, params)?;
    agent.persist(model_path)?;
    Ok(model_path.to_path_buf())
}

/// Train with a human correcting the bot over `channel`. Returns the agent
/// without persisting it.
pub async fn train_dialogue_online(
    domain_file: &Path,
    training_data_file: &Path,
    make_agent: impl FnOnce(DomainSpec) -> Agent,
    channel: &dyn InteractiveChannel,
    params: &OnlineParams,
) -> Result<(Agent, OnlineSummary), BotError> {
    let domain = load_domain(domain_file)?;
    let mut agent = make_agent(domain);
    let training_data = load_stories(training_data_file)?;

    let summary = agent.train_online(&training_data, channel, params).await?;
    Ok((agent, summary))
}
