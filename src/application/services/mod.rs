//! Application services - Training and serving orchestration

pub mod bot_runtime;
pub mod dialogue_training;
pub mod nlu_training;

pub use bot_runtime::{run_bot, ChannelFactory, ChannelSelection, ConnectorCredentials, WebhookSettings};
pub use dialogue_training::{train_dialogue, train_dialogue_online};
pub use nlu_training::train_nlu;
