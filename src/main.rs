use clap::{Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;

mod domain;
mod application;
mod infrastructure;

use application::agent::Agent;
use application::dispatcher::{self, Orchestrator, Outcome};
use application::errors::{BotError, ConfigError};
use application::services::{self, ChannelSelection, ConnectorCredentials, WebhookSettings};
use domain::entities::{OnlineParams, PolicyParams};
use domain::traits::{DialogueTrainer, InteractiveChannel, Interpreter};
use infrastructure::adapters::{ConsoleAdapter, DefaultChannelFactory};
use infrastructure::config::{ChannelKind, Config};
use infrastructure::nlu::{IntentTrainer, NluInterpreter, RegexInterpreter};

#[derive(Parser)]
#[command(name = "dynamo-bot")]
#[command(about = "Train and serve a conversational bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml", global = true)]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one mode: train-nlu, train-dialogue or run-bot
    Run {
        /// Mode (overrides config)
        #[arg(short, long)]
        mode: Option<String>,
    },
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { mode } => {
            let config = Config::load_or_default(&cli.config);
            init_logging(config.as_ref().map(|c| c.logging.level.as_str()).unwrap_or("info"));

            let result = config
                .map_err(BotError::from)
                .and_then(|config| {
                    if !Path::new(&cli.config).exists() {
                        tracing::warn!("Config file {} not found, using defaults", cli.config);
                    }
                    run(config, mode)
                });

            match result {
                Ok(Outcome::NluModel(path)) => tracing::info!("NLU model ready at {}", path.display()),
                Ok(Outcome::DialogueModel(path)) => tracing::info!("Dialogue model ready at {}", path.display()),
                Ok(Outcome::Served) => tracing::info!("Bot stopped"),
                Err(e) => {
                    tracing::error!("{}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Version => {
            println!("dynamo-bot v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => {
            init_config();
        }
    }
}

fn init_logging(level: &str) {
    let level = level.parse::<tracing::Level>().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(level.into()),
        )
        .init();
}

fn run(config: Config, mode_override: Option<String>) -> Result<Outcome, BotError> {
    let mode = mode_override.unwrap_or_else(|| config.params.mode.clone());
    let mut app = App::new(config)?;
    dispatcher::dispatch(&mode, &mut app)
}

/// Runs the modes against the configured files
struct App {
    config: Config,
    rt: tokio::runtime::Runtime,
}

impl App {
    fn new(config: Config) -> Result<Self, BotError> {
        let rt = tokio::runtime::Runtime::new()?;
        Ok(Self { config, rt })
    }

    /// The trained NLU model if there is one, else `/intent{...}` parsing
    fn interpreter(&self) -> Result<Arc<dyn Interpreter>, BotError> {
        let dir = self.config.paths.nlu_model_dir();
        if dir.exists() {
            Ok(Arc::new(NluInterpreter::load(&dir)?))
        } else {
            tracing::warn!(
                "No NLU model at {}, only /intent messages will be understood",
                dir.display()
            );
            Ok(Arc::new(RegexInterpreter::new()))
        }
    }

    /// Online dialogue training over `channel`, persisted once at the end
    fn train_dialogue_online(&self, channel: &dyn InteractiveChannel) -> Result<Outcome, BotError> {
        let paths = &self.config.paths;
        let params = OnlineParams::default();
        let interpreter = self.interpreter()?;
        let (agent, summary) = self.rt.block_on(services::train_dialogue_online(
            &paths.domain,
            &paths.stories,
            |domain| Agent::new(domain, interpreter, params.max_history),
            channel,
            &params,
        ))?;
        tracing::info!(
            "Online session done after {} turns ({} corrected)",
            summary.turns,
            summary.corrections
        );
        agent.persist(&paths.dialogue_model)?;
        Ok(Outcome::DialogueModel(paths.dialogue_model.clone()))
    }
}

impl Orchestrator for App {
    fn train_nlu(&mut self) -> Result<Outcome, BotError> {
        let paths = &self.config.paths;
        let model_dir = services::train_nlu(
            &paths.nlu_data,
            &paths.nlu_config,
            &paths.nlu_models,
            &paths.nlu_model_name,
            IntentTrainer::new,
        )?;
        Ok(Outcome::NluModel(model_dir))
    }

    fn train_dialogue(&mut self) -> Result<Outcome, BotError> {
        if self.config.params.online {
            self.train_dialogue_online(&ConsoleAdapter::new())
        } else {
            let paths = &self.config.paths;
            let params = PolicyParams::default();
            let model_path = services::train_dialogue(
                &paths.domain,
                &paths.stories,
                &paths.dialogue_model,
                &params,
                |domain| Agent::new(domain, Arc::new(RegexInterpreter::new()), params.max_history),
            )?;
            Ok(Outcome::DialogueModel(model_path))
        }
    }

    fn run_bot(&mut self) -> Result<Outcome, BotError> {
        let selection = channel_selection(&self.config)?;
        let interpreter = self.interpreter()?;
        self.rt.block_on(services::run_bot(
            &self.config.paths.dialogue_model,
            interpreter,
            selection,
            &DefaultChannelFactory,
        ))?;
        Ok(Outcome::Served)
    }
}

fn channel_selection(config: &Config) -> Result<ChannelSelection, ConfigError> {
    match config.params.channel {
        ChannelKind::Console => Ok(ChannelSelection::Console),
        ChannelKind::Webhook => {
            let connectors = &config.connectors;
            let credentials = ConnectorCredentials {
                developer_token: required(&connectors.developer_token, "connectors.developer-token")?,
                client_token: required(&connectors.client_token, "connectors.client-token")?,
                verification_token: required(&connectors.verification_token, "connectors.verification-token")?,
            };
            let settings = WebhookSettings {
                host: config.webhook.host.clone(),
                port: config.webhook.port,
                api_base: connectors.api_base.clone(),
            };
            Ok(ChannelSelection::Webhook { credentials, settings })
        }
    }
}

fn required(value: &Option<String>, field: &str) -> Result<String, ConfigError> {
    value
        .clone()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingField(field.to_string()))
}

fn init_config() {
    let config = Config::default();
    match serde_yaml::to_string(&config) {
        Ok(yaml) => {
            println!("{}", yaml);
            println!("\nSave this to config.yaml and adjust as needed.");
        }
        Err(e) => {
            eprintln!("Failed to render default config: {}", e);
            std::process::exit(1);
        }
    }
}
