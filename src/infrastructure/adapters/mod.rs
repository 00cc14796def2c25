//! Input channels

pub mod console;
pub mod webhook;

pub use console::ConsoleAdapter;
pub use webhook::WebhookChannel;

use crate::application::services::{ChannelFactory, ConnectorCredentials, WebhookSettings};
use crate::domain::traits::InputChannel;

/// Builds the real console and webhook channels
pub struct DefaultChannelFactory;

impl ChannelFactory for DefaultChannelFactory {
    fn console(&self) -> Box<dyn InputChannel> {
        Box::new(ConsoleAdapter::new())
    }

    fn webhook(&self, credentials: ConnectorCredentials, settings: WebhookSettings) -> Box<dyn InputChannel> {
        Box::new(WebhookChannel::new(credentials, settings))
    }
}
