//! Console adapter for local interactive use

use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::sync::Mutex;

use crate::application::errors::BotError;
use crate::domain::entities::{UserMessage, DEFAULT_SENDER};
use crate::domain::traits::{InputChannel, InteractiveChannel, MessageHandler};

pub const CONSOLE_CHANNEL: &str = "console";

/// Reads user lines and prints bot replies prefixed with `[BOT]`
pub struct ConsoleAdapter<R, W> {
    reader: Mutex<R>,
    writer: Mutex<W>,
    sender_id: String,
}

impl ConsoleAdapter<BufReader<Stdin>, Stdout> {
    pub fn new() -> Self {
        Self::with_io(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl Default for ConsoleAdapter<BufReader<Stdin>, Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, W> ConsoleAdapter<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn with_io(reader: R, writer: W) -> Self {
        Self {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            sender_id: DEFAULT_SENDER.to_string(),
        }
    }

    async fn write(&self, text: &str) -> Result<(), BotError> {
        let mut writer = self.writer.lock().await;
        writer.write_all(text.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    pub async fn read_line(&self, prompt: &str) -> Result<Option<String>, BotError> {
        self.write(prompt).await?;
        let mut input = String::new();
        let read = self.reader.lock().await.read_line(&mut input).await?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(input.trim().to_string()))
    }
}

#[async_trait]
impl<R, W> InputChannel for ConsoleAdapter<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    fn name(&self) -> &str {
        CONSOLE_CHANNEL
    }

    async fn start(&self, handler: Arc<dyn MessageHandler>) -> Result<(), BotError> {
        tracing::info!("Starting console channel, end input to quit");

        while let Some(input) = self.read_line("> ").await? {
            if input.is_empty() {
                continue;
            }

            let message = UserMessage::new(&self.sender_id, input).with_channel(CONSOLE_CHANNEL);
            match handler.handle(message).await {
                Ok(replies) => {
                    for reply in replies {
                        self.write(&format!("[BOT] {}\n", reply.text)).await?;
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to handle message: {}", e);
                }
            }
        }

        tracing::info!("Console input closed");
        Ok(())
    }
}

#[async_trait]
impl<R, W> InteractiveChannel for ConsoleAdapter<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn ask(&self, prompt: &str) -> Result<Option<String>, BotError> {
        self.read_line(&format!("{} ", prompt)).await
    }

    async fn say(&self, text: &str) -> Result<(), BotError> {
        self.write(&format!("{}\n", text)).await
    }
}
