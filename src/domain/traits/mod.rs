//! Domain traits - Abstractions for infrastructure implementations

pub mod channel;
pub mod interpreter;
pub mod trainer;

pub use channel::{InputChannel, InteractiveChannel, MessageHandler};
pub use interpreter::Interpreter;
pub use trainer::{DialogueTrainer, NluTrainer};
