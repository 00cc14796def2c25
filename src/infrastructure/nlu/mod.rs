//! Built-in NLU engine: intent classifier, entity lookup and interpreters

pub mod classifier;
pub mod config;
pub mod interpreter;
pub mod trainer;

pub use config::NluModelConfig;
pub use interpreter::{NluInterpreter, RegexInterpreter};
pub use trainer::IntentTrainer;
