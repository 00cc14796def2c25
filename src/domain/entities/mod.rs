//! Domain entities - Core conversational objects

pub mod message;
pub mod training;
pub mod story;
pub mod domain_spec;
pub mod tracker;
pub mod params;

pub use message::{BotReply, Entity, IntentMatch, ParseResult, UserMessage, DEFAULT_SENDER};
pub use training::{NluExample, TrainingData};
pub use story::{Story, StoryStep};
pub use domain_spec::{DomainSpec, SlotSpec, Template, ACTION_LISTEN, ACTION_RESTART};
pub use tracker::{history_window, DialogueState, Tracker};
pub use params::{OnlineParams, PolicyParams};
