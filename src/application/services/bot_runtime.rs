//! Bot runtime orchestration

use std::path::Path;
use std::sync::Arc;

use crate::application::agent::Agent;
use crate::application::errors::BotError;
use crate::domain::traits::{InputChannel, Interpreter, MessageHandler};

/// Chat platform credentials, passed to the webhook channel as given
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorCredentials {
    pub developer_token: String,
    pub client_token: String,
    pub verification_token: String,
}

/// Where the webhook listens and where replies are pushed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookSettings {
    pub host: String,
    pub port: u16,
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSelection {
    Console,
    Webhook {
        credentials: ConnectorCredentials,
        settings: WebhookSettings,
    },
}

/// Builds input channels
pub trait ChannelFactory {
    fn console(&self) -> Box<dyn InputChannel>;

    fn webhook(&self, credentials: ConnectorCredentials, settings: WebhookSettings) -> Box<dyn InputChannel>;
}

/// Build exactly one channel for the selection
pub fn select_channel(selection: ChannelSelection, factory: &dyn ChannelFactory) -> Box<dyn InputChannel> {
    match selection {
        ChannelSelection::Console => factory.console(),
        ChannelSelection::Webhook { credentials, settings } => factory.webhook(credentials, settings),
    }
}

/// Load the persisted dialogue model and serve it over the selected channel.
/// Blocks until the channel stops.
pub async fn run_bot(
    model_path: &Path,
    interpreter: Arc<dyn Interpreter>,
    selection: ChannelSelection,
    factory: &dyn ChannelFactory,
) -> Result<(), BotError> {
    let agent = Agent::load(model_path, interpreter)?;
    let channel = select_channel(selection, factory);
    tracing::info!("Serving bot on the {} channel", channel.name());

    let handler: Arc<dyn MessageHandler> = Arc::new(agent);
    channel.start(handler).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::agent::tests::{domain, fast_params, stories};
    use crate::domain::entities::UserMessage;
    use crate::domain::traits::DialogueTrainer;
    use crate::infrastructure::nlu::RegexInterpreter;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Sends one scripted message and records the replies
    struct ScriptedChannel {
        name: &'static str,
        replies: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl InputChannel for ScriptedChannel {
        fn name(&self) -> &str {
            self.name
        }

        async fn start(&self, handler: Arc<dyn MessageHandler>) -> Result<(), BotError> {
            let replies = handler.handle(UserMessage::new("tester", "/greet")).await?;
            self.replies.lock().unwrap().extend(replies.into_iter().map(|r| r.text));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingFactory {
        built: Mutex<Vec<String>>,
        credentials: Mutex<Option<ConnectorCredentials>>,
        replies: Arc<Mutex<Vec<String>>>,
    }

    impl ChannelFactory for RecordingFactory {
        fn console(&self) -> Box<dyn InputChannel> {
            self.built.lock().unwrap().push("console".to_string());
            Box::new(ScriptedChannel { name: "console", replies: self.replies.clone() })
        }

        fn webhook(&self, credentials: ConnectorCredentials, _settings: WebhookSettings) -> Box<dyn InputChannel> {
            self.built.lock().unwrap().push("webhook".to_string());
            *self.credentials.lock().unwrap() = Some(credentials);
            Box::new(ScriptedChannel { name: "webhook", replies: self.replies.clone() })
        }
    }

    fn credentials() -> ConnectorCredentials {
        ConnectorCredentials {
            developer_token: "dev-Token ".to_string(),
            client_token: "client/Token".to_string(),
            verification_token: "verify".to_string(),
        }
    }

    fn persisted_model() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let mut agent = Agent::new(domain(), Arc::new(RegexInterpreter::new()), 2);
        agent.train(&stories(), &fast_params()).unwrap();
        agent.persist(dir.path()).unwrap();
        dir
    }

    #[test]
    fn test_console_never_builds_webhook() {
        let factory = RecordingFactory::default();
        let channel = select_channel(ChannelSelection::Console, &factory);
        assert_eq!(channel.name(), "console");
        assert_eq!(*factory.built.lock().unwrap(), vec!["console"]);
        assert!(factory.credentials.lock().unwrap().is_none());
    }

    #[test]
    fn test_webhook_gets_credentials_unmodified() {
        let factory = RecordingFactory::default();
        let selection = ChannelSelection::Webhook {
            credentials: credentials(),
            settings: WebhookSettings { host: "127.0.0.1".to_string(), port: 5004, api_base: None },
        };
        let channel = select_channel(selection, &factory);
        assert_eq!(channel.name(), "webhook");
        assert_eq!(*factory.built.lock().unwrap(), vec!["webhook"]);
        assert_eq!(factory.credentials.lock().unwrap().as_ref(), Some(&credentials()));
    }

    #[tokio::test]
    async fn test_run_bot_serves_loaded_model() {
        let model = persisted_model();
        let factory = RecordingFactory::default();
        run_bot(model.path(), Arc::new(RegexInterpreter::new()), ChannelSelection::Console, &factory)
            .await
            .unwrap();
        assert_eq!(*factory.replies.lock().unwrap(), vec!["Hello!"]);
    }

    #[tokio::test]
    async fn test_run_bot_requires_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let factory = RecordingFactory::default();
        let err = run_bot(
            &dir.path().join("missing"),
            Arc::new(RegexInterpreter::new()),
            ChannelSelection::Console,
            &factory,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BotError::Artifact(_)));
        assert!(factory.built.lock().unwrap().is_empty());
    }
}
