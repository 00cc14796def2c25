use std::sync::Arc;

use async_trait::async_trait;

use crate::application::errors::BotError;
use crate::domain::entities::{BotReply, UserMessage};

/// Receives user messages from a channel and produces replies
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: UserMessage) -> Result<Vec<BotReply>, BotError>;
}

/// InputChannel trait - abstraction for messaging platform adapters
#[async_trait]
pub trait InputChannel: Send + Sync {
    /// Channel name used in logs and on incoming messages
    fn name(&self) -> &str;

    /// Feed incoming messages to the handler until the channel closes
    async fn start(&self, handler: Arc<dyn MessageHandler>) -> Result<(), BotError>;
}

/// Two-way prompt channel used while training with a human in the loop
#[async_trait]
pub trait InteractiveChannel: Send + Sync {
    /// Show a prompt and wait for one line. `None` means the input is closed.
    async fn ask(&self, prompt: &str) -> Result<Option<String>, BotError>;

    /// Print text to the trainer
    async fn say(&self, text: &str) -> Result<(), BotError>;
}
