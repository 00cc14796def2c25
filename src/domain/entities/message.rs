use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sender id used when a channel has no notion of users
pub const DEFAULT_SENDER: &str = "default";

/// An entity span inside a piece of text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub start: usize,
    pub end: usize,
    pub value: String,
    pub entity: String,
}

impl Entity {
    pub fn new(entity: impl Into<String>, value: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            value: value.into(),
            entity: entity.into(),
        }
    }
}

/// Intent name with classifier confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentMatch {
    pub name: String,
    pub confidence: f64,
}

/// Output of an interpreter for one user utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    pub text: String,
    pub intent: Option<IntentMatch>,
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub intent_ranking: Vec<IntentMatch>,
}

impl ParseResult {
    pub fn empty(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            intent: None,
            entities: Vec::new(),
            intent_ranking: Vec::new(),
        }
    }

    pub fn intent_name(&self) -> Option<&str> {
        self.intent.as_ref().map(|i| i.name.as_str())
    }
}

/// Represents an incoming user message
#[derive(Debug, Clone)]
pub struct UserMessage {
    pub id: String,
    pub sender_id: String,
    pub text: String,
    pub channel: String,
    pub timestamp: DateTime<Utc>,
}

impl UserMessage {
    pub fn new(sender_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender_id: sender_id.into(),
            text: text.into(),
            channel: "unknown".to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }
}

/// Outgoing bot utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotReply {
    pub recipient_id: String,
    pub text: String,
}

impl BotReply {
    pub fn new(recipient_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            text: text.into(),
        }
    }
}
