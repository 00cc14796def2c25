//! Run mode dispatch

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::application::errors::{BotError, ConfigError};

/// The fixed set of things one process invocation can do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    TrainNlu,
    TrainDialogue,
    RunBot,
}

impl RunMode {
    pub const ALL: [RunMode; 3] = [RunMode::TrainNlu, RunMode::TrainDialogue, RunMode::RunBot];

    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::TrainNlu => "train-nlu",
            RunMode::TrainDialogue => "train-dialogue",
            RunMode::RunBot => "run-bot",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        RunMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == name)
            .ok_or_else(|| {
                let known: Vec<&str> = RunMode::ALL.iter().map(RunMode::as_str).collect();
                ConfigError::InvalidValue(format!(
                    "unknown mode '{}' (expected one of: {})",
                    name,
                    known.join(", ")
                ))
            })
    }
}

/// Result of a dispatched mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    NluModel(PathBuf),
    DialogueModel(PathBuf),
    Served,
}

/// The three orchestration functions a mode can map to
pub trait Orchestrator {
    fn train_nlu(&mut self) -> Result<Outcome, BotError>;
    fn train_dialogue(&mut self) -> Result<Outcome, BotError>;
    fn run_bot(&mut self) -> Result<Outcome, BotError>;
}

/// Parse `mode_name` and run the matching orchestration exactly once.
/// Unknown names fail before anything runs.
pub fn dispatch(mode_name: &str, orchestrator: &mut dyn Orchestrator) -> Result<Outcome, BotError> {
    let mode: RunMode = mode_name.parse()?;
    tracing::info!("Running mode {}", mode);

    match mode {
        RunMode::TrainNlu => orchestrator.train_nlu(),
        RunMode::TrainDialogue => orchestrator.train_dialogue(),
        RunMode::RunBot => orchestrator.run_bot(),
    }
}
