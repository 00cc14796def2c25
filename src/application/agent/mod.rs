//! Dialogue agent - trains policies from stories and runs conversations

pub mod online;
pub mod samples;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use rand::seq::IndexedRandom;
use regex_lite::Regex;
use tokio::sync::Mutex;

use crate::application::errors::BotError;
use crate::domain::entities::{
    BotReply, DomainSpec, PolicyParams, Story, Tracker, UserMessage, ACTION_LISTEN, ACTION_RESTART,
};
use crate::domain::traits::{DialogueTrainer, Interpreter, MessageHandler};
use crate::infrastructure::data::load_domain;
use crate::infrastructure::policies::{PolicyEnsemble, Prediction, TrainingSample};
use crate::infrastructure::storage::{self, ArtifactMetadata};

pub use online::OnlineSummary;

pub const DIALOGUE_KIND: &str = "dialogue";
pub const DOMAIN_FILE: &str = "domain.yml";

/// Upper bound on bot actions between two user messages
pub const MAX_ACTIONS_PER_TURN: usize = 10;

/// Conversations kept in memory before the idlest one is dropped
pub const MAX_TRACKERS: usize = 10_000;

static SLOT_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z0-9_]+)\}").expect("slot placeholder regex"));

pub struct Agent {
    domain: DomainSpec,
    ensemble: PolicyEnsemble,
    interpreter: Arc<dyn Interpreter>,
    /// Tracker per sender with the time of its latest message
    trackers: Mutex<HashMap<String, (Tracker, DateTime<Utc>)>>,
    max_trackers: usize,
    trained_samples: usize,
}

impl Agent {
    /// Untrained agent with memoization and neural policies
    pub fn new(domain: DomainSpec, interpreter: Arc<dyn Interpreter>, max_history: usize) -> Self {
        let ensemble = PolicyEnsemble::default_for(&domain, max_history);
        Self::with_ensemble(domain, ensemble, interpreter)
    }

    pub fn with_ensemble(domain: DomainSpec, ensemble: PolicyEnsemble, interpreter: Arc<dyn Interpreter>) -> Self {
        Self {
            domain,
            ensemble,
            interpreter,
            trackers: Mutex::new(HashMap::new()),
            max_trackers: MAX_TRACKERS,
            trained_samples: 0,
        }
    }

    /// Load an agent written by [`DialogueTrainer::persist`]
    pub fn load(path: impl AsRef<Path>, interpreter: Arc<dyn Interpreter>) -> Result<Self, BotError> {
        let path = path.as_ref();
        let metadata = storage::read_metadata(path, DIALOGUE_KIND)?;
        let domain = load_domain(path.join(DOMAIN_FILE))?;
        let ensemble = PolicyEnsemble::load(path)?;
        tracing::info!(
            "Loaded dialogue model {} ({}) from {}",
            metadata.fingerprint,
            ensemble.policy_names().join(", "),
            path.display()
        );
        Ok(Self::with_ensemble(domain, ensemble, interpreter))
    }

    pub fn new_tracker(&self, sender_id: &str) -> Tracker {
        Tracker::new(sender_id, &self.domain)
    }

    pub(crate) fn train_on_samples(&mut self, samples: &[TrainingSample], params: &PolicyParams) -> Result<(), BotError> {
        self.ensemble.train(&self.domain, samples, params)?;
        self.trained_samples = samples.len();
        Ok(())
    }

    pub fn predict_next(&self, tracker: &Tracker) -> Prediction {
        self.ensemble.predict(&tracker.past_states())
    }

    /// Run an action against the tracker and return what the bot says, if anything
    pub fn execute_action(&self, action: &str, tracker: &mut Tracker) -> Option<String> {
        tracker.record_action(action);
        match action {
            ACTION_LISTEN => None,
            ACTION_RESTART => {
                tracker.restart();
                None
            }
            utter if utter.starts_with("utter_") => {
                let rendered = self.render_template(utter, tracker);
                if rendered.is_none() {
                    tracing::warn!("No template for '{}'", utter);
                }
                rendered
            }
            other => {
                tracing::warn!("Action '{}' has no implementation, skipping", other);
                None
            }
        }
    }

    fn render_template(&self, action: &str, tracker: &Tracker) -> Option<String> {
        let template = self.domain.templates_for(action).choose(&mut rand::rng())?;
        let slots = tracker.slots();
        let text = SLOT_PLACEHOLDER.replace_all(template.text(), |caps: &regex_lite::Captures| {
            let name = &caps[1];
            slots.get(name).cloned().unwrap_or_else(|| format!("{{{}}}", name))
        });
        Some(text.into_owned())
    }

    /// Predict and run actions until the bot listens again
    pub fn respond(&self, tracker: &mut Tracker) -> Vec<String> {
        let mut utterances = Vec::new();
        for _ in 0..MAX_ACTIONS_PER_TURN {
            let prediction = self.predict_next(tracker);
            tracing::debug!(
                "Predicted '{}' ({:.2}) by {}",
                prediction.action,
                prediction.confidence,
                prediction.policy
            );
            let done = prediction.action == ACTION_LISTEN;
            if let Some(text) = self.execute_action(&prediction.action, tracker) {
                utterances.push(text);
            }
            if done {
                return utterances;
            }
        }
        tracing::warn!("Reached {} actions without listening, forcing listen", MAX_ACTIONS_PER_TURN);
        tracker.record_action(ACTION_LISTEN);
        utterances
    }

    /// Interpret the text and apply it to the tracker as a user turn
    pub fn observe_user(&self, tracker: &mut Tracker, text: &str) {
        let parsed = self.interpreter.parse(text);
        let entities: BTreeMap<String, String> = parsed
            .entities
            .iter()
            .map(|e| (e.entity.clone(), e.value.clone()))
            .collect();
        tracing::debug!("Parsed '{}' as {:?}", text, parsed.intent_name());
        tracker.update_with_user(text, parsed.intent.map(|i| i.name), entities, &self.domain);
    }
}

impl DialogueTrainer for Agent {
    fn train(&mut self, stories: &[Story], params: &PolicyParams) -> Result<(), BotError> {
        let samples = samples::generate_samples(&self.domain, stories, params)?;
        self.train_on_samples(&samples, params)
    }

    fn persist(&self, path: &Path) -> Result<(), BotError> {
        std::fs::create_dir_all(path)?;
        let domain_yaml = serde_yaml::to_string(&self.domain)
            .map_err(|e| BotError::Artifact(format!("Failed to serialize domain: {}", e)))?;
        std::fs::write(path.join(DOMAIN_FILE), domain_yaml)?;
        self.ensemble.persist(path)?;

        let metadata = ArtifactMetadata::new(DIALOGUE_KIND).with_extra(serde_json::json!({
            "policies": self.ensemble.policy_names(),
            "max_history": self.ensemble.featurizer().max_history(),
            "training_samples": self.trained_samples,
        }));
        storage::write_metadata(path, &metadata)?;
        tracing::info!("Persisted dialogue model to {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl MessageHandler for Agent {
    async fn handle(&self, message: UserMessage) -> Result<Vec<BotReply>, BotError> {
        tracing::debug!(
            "Message {} from {} via {} at {}",
            message.id,
            message.sender_id,
            message.channel,
            message.timestamp
        );
        let mut trackers = self.trackers.lock().await;
        if !trackers.contains_key(&message.sender_id) && trackers.len() >= self.max_trackers {
            evict_idlest(&mut trackers);
        }
        let (tracker, last_seen) = trackers
            .entry(message.sender_id.clone())
            .or_insert_with(|| (Tracker::new(message.sender_id.clone(), &self.domain), message.timestamp));
        *last_seen = message.timestamp;

        self.observe_user(tracker, &message.text);
        let replies = self
            .respond(tracker)
            .into_iter()
            .map(|text| BotReply::new(message.sender_id.clone(), text))
            .collect();
        Ok(replies)
    }
}

fn evict_idlest(trackers: &mut HashMap<String, (Tracker, DateTime<Utc>)>) {
    let idlest = trackers
        .iter()
        .min_by_key(|(_, (_, seen))| *seen)
        .map(|(sender, _)| sender.clone());
    if let Some(sender) = idlest {
        trackers.remove(&sender);
        tracing::debug!("Dropped conversation state for {}", sender);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::entities::{SlotSpec, StoryStep, Template};
    use crate::infrastructure::nlu::RegexInterpreter;

    pub(crate) fn domain() -> DomainSpec {
        let mut domain = DomainSpec {
            intents: vec!["greet".to_string(), "inform".to_string(), "bye".to_string()],
            entities: vec!["name".to_string()],
            actions: vec!["utter_greet".to_string(), "utter_ack".to_string(), "utter_bye".to_string()],
            ..Default::default()
        };
        domain.slots.insert(
            "name".to_string(),
            SlotSpec { kind: "text".to_string(), initial_value: None },
        );
        for (action, text) in [("utter_greet", "Hello!"), ("utter_ack", "Nice to meet you, {name}"), ("utter_bye", "Bye")] {
            domain.templates.insert(action.to_string(), vec![Template::Text(text.to_string())]);
        }
        domain
    }

    pub(crate) fn stories() -> Vec<Story> {
        let mut inform = StoryStep::user("inform");
        if let StoryStep::User { entities, .. } = &mut inform {
            entities.insert("name".to_string(), "Ada".to_string());
        }
        vec![
            Story::new("greet")
                .with_step(StoryStep::user("greet"))
                .with_step(StoryStep::action("utter_greet"))
                .with_step(inform)
                .with_step(StoryStep::action("utter_ack")),
            Story::new("bye")
                .with_step(StoryStep::user("bye"))
                .with_step(StoryStep::action("utter_bye")),
        ]
    }

    pub(crate) fn fast_params() -> PolicyParams {
        PolicyParams {
            augmentation_factor: 5,
            epochs: 20,
            validation_split: 0.0,
            ..Default::default()
        }
    }

    fn trained_agent() -> Agent {
        let mut agent = Agent::new(domain(), Arc::new(RegexInterpreter::new()), 2);
        agent.train(&stories(), &fast_params()).unwrap();
        agent
    }

    #[tokio::test]
    async fn test_handle_message_follows_stories() {
        let agent = trained_agent();

        let replies = agent.handle(UserMessage::new("u1", "/greet")).await.unwrap();
        assert_eq!(replies, vec![BotReply::new("u1", "Hello!")]);

        let replies = agent.handle(UserMessage::new("u1", "/inform{\"name\": \"Ada\"}")).await.unwrap();
        assert_eq!(replies[0].text, "Nice to meet you, Ada");

        let replies = agent.handle(UserMessage::new("u2", "/bye")).await.unwrap();
        assert_eq!(replies, vec![BotReply::new("u2", "Bye")]);
    }

    #[test]
    fn test_execute_restart_resets_tracker() {
        let agent = trained_agent();
        let mut tracker = agent.new_tracker("u1");
        tracker.set_slot("name", "Ada");
        assert_eq!(agent.execute_action(ACTION_RESTART, &mut tracker), None);
        assert!(tracker.slots().is_empty());
    }

    #[test]
    fn test_missing_slot_keeps_placeholder() {
        let agent = trained_agent();
        let mut tracker = agent.new_tracker("u1");
        assert_eq!(
            agent.execute_action("utter_ack", &mut tracker).as_deref(),
            Some("Nice to meet you, {name}")
        );
    }

    #[tokio::test]
    async fn test_persist_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("dialogue");
        trained_agent().persist(&model_path).unwrap();

        let loaded = Agent::load(&model_path, Arc::new(RegexInterpreter::new())).unwrap();
        assert_eq!(loaded.domain, domain());
        let replies = loaded.handle(UserMessage::new("u1", "/greet")).await.unwrap();
        assert_eq!(replies[0].text, "Hello!");
    }

    #[tokio::test]
    async fn test_idlest_conversation_is_dropped_at_capacity() {
        let mut agent = trained_agent();
        agent.max_trackers = 2;
        let at = |sender: &str, secs_ago: i64| {
            let mut message = UserMessage::new(sender, "/greet");
            message.timestamp = Utc::now() - chrono::Duration::seconds(secs_ago);
            message
        };

        agent.handle(at("u1", 30)).await.unwrap();
        agent.handle(at("u2", 20)).await.unwrap();
        agent.handle(at("u1", 10)).await.unwrap();
        agent.handle(at("u3", 0)).await.unwrap();

        let trackers = agent.trackers.lock().await;
        assert_eq!(trackers.len(), 2);
        assert!(trackers.contains_key("u1"));
        assert!(trackers.contains_key("u3"));
    }

    #[test]
    fn test_load_missing_model() {
        let dir = tempfile::tempdir().unwrap();
        let result = Agent::load(dir.path().join("none"), Arc::new(RegexInterpreter::new()));
        assert!(matches!(result, Err(BotError::Artifact(_))));
    }
}
