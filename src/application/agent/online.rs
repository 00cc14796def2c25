//! Interactive training: the trainer chats with the bot and corrects it

use crate::application::errors::BotError;
use crate::domain::entities::{
    history_window, OnlineParams, Story, ACTION_LISTEN, DEFAULT_SENDER,
};
use crate::domain::traits::InteractiveChannel;
use crate::infrastructure::policies::TrainingSample;
use super::samples::generate_samples;
use super::{Agent, MAX_ACTIONS_PER_TURN};

pub const STOP_COMMAND: &str = "/stop";

/// What happened during an online session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OnlineSummary {
    pub turns: usize,
    pub corrections: usize,
}

enum Answer<T> {
    Value(T),
    Closed,
}

async fn ask_yes_no(channel: &dyn InteractiveChannel, prompt: &str) -> Result<Answer<bool>, BotError> {
    loop {
        let Some(reply) = channel.ask(&format!("{} (y/n)", prompt)).await? else {
            return Ok(Answer::Closed);
        };
        match reply.trim().to_lowercase().as_str() {
            "y" | "yes" => return Ok(Answer::Value(true)),
            "n" | "no" => return Ok(Answer::Value(false)),
            _ => channel.say("Please answer y or n").await?,
        }
    }
}

async fn ask_choice(
    channel: &dyn InteractiveChannel,
    prompt: &str,
    options: &[String],
) -> Result<Answer<String>, BotError> {
    let listing: Vec<String> = options
        .iter()
        .enumerate()
        .map(|(i, option)| format!("{:>3}. {}", i + 1, option))
        .collect();
    channel.say(&format!("{}\n{}", prompt, listing.join("\n"))).await?;

    loop {
        let Some(reply) = channel.ask("Number ->").await? else {
            return Ok(Answer::Closed);
        };
        match reply.trim().parse::<usize>() {
            Ok(n) if (1..=options.len()).contains(&n) => return Ok(Answer::Value(options[n - 1].clone())),
            _ => channel.say(&format!("Enter a number between 1 and {}", options.len())).await?,
        }
    }
}

impl Agent {
    /// Train on the stories, then keep learning from a trainer's corrections over
    /// `channel` until the input closes or the trainer types `/stop`.
    /// The agent is not persisted here.
    pub async fn train_online(
        &mut self,
        stories: &[Story],
        channel: &dyn InteractiveChannel,
        params: &OnlineParams,
    ) -> Result<OnlineSummary, BotError> {
        let policy_params = params.as_policy_params();
        let base_samples = generate_samples(&self.domain, stories, &policy_params)?;
        let initial = recent_samples(&base_samples, &[], params.max_training_samples);
        self.train_on_samples(&initial, &policy_params)?;

        let mut summary = OnlineSummary::default();
        let mut online_samples: Vec<TrainingSample> = Vec::new();
        let mut tracker = self.new_tracker(DEFAULT_SENDER);
        let intents = self.domain.intents.clone();
        let actions = self.domain.action_names();

        channel
            .say(&format!("Bot loaded. Type a message and press enter ({} to finish).", STOP_COMMAND))
            .await?;

        'session: loop {
            let Some(text) = channel.ask("Your input ->").await? else {
                break;
            };
            let text = text.trim().to_string();
            if text.is_empty() {
                continue;
            }
            if text == STOP_COMMAND {
                break;
            }

            summary.turns += 1;
            let mut corrected = false;
            let parsed = self.interpreter.parse(&text);

            let confirmed = match &parsed.intent {
                Some(intent) => {
                    let prompt = format!(
                        "Chatbot understood intent '{}' ({:.2}). Is that correct?",
                        intent.name, intent.confidence
                    );
                    match ask_yes_no(channel, &prompt).await? {
                        Answer::Value(ok) => ok,
                        Answer::Closed => break 'session,
                    }
                }
                None => false,
            };

            let intent = if confirmed {
                parsed.intent.as_ref().map(|i| i.name.clone())
            } else {
                corrected = true;
                match ask_choice(channel, "What intent is it?", &intents).await? {
                    Answer::Value(intent) => Some(intent),
                    Answer::Closed => break 'session,
                }
            };

            let entities = parsed
                .entities
                .iter()
                .map(|e| (e.entity.clone(), e.value.clone()))
                .collect();
            tracker.update_with_user(text.as_str(), intent, entities, &self.domain);

            let mut listened = false;
            for _ in 0..MAX_ACTIONS_PER_TURN {
                let prediction = self.predict_next(&tracker);
                let prompt = format!(
                    "The bot wants to run '{}' ({:.2}). Is that correct?",
                    prediction.action, prediction.confidence
                );
                let action = match ask_yes_no(channel, &prompt).await? {
                    Answer::Value(true) => prediction.action,
                    Answer::Value(false) => {
                        corrected = true;
                        match ask_choice(channel, "What is the next action of the bot?", &actions).await? {
                            Answer::Value(action) => action,
                            Answer::Closed => break 'session,
                        }
                    }
                    Answer::Closed => break 'session,
                };

                online_samples.push(TrainingSample {
                    history: history_window(&tracker.past_states(), params.max_history).to_vec(),
                    action: action.clone(),
                });

                if let Some(utterance) = self.execute_action(&action, &mut tracker) {
                    channel.say(&format!("[BOT] {}", utterance)).await?;
                }
                if action == ACTION_LISTEN {
                    listened = true;
                    break;
                }
            }
            if !listened {
                tracker.record_action(ACTION_LISTEN);
            }

            if corrected {
                summary.corrections += 1;
                let combined = recent_samples(&base_samples, &online_samples, params.max_training_samples);
                tracing::info!("Retraining on {} samples after correction", combined.len());
                self.train_on_samples(&combined, &policy_params)?;
                channel.say(&format!("Retrained on {} samples", combined.len())).await?;
            }
        }

        tracing::info!(
            "Online training finished: {} turns, {} corrections",
            summary.turns,
            summary.corrections
        );
        Ok(summary)
    }
}

/// Story samples followed by online samples, keeping only the newest `max`
fn recent_samples(base: &[TrainingSample], online: &[TrainingSample], max: usize) -> Vec<TrainingSample> {
    let all: Vec<&TrainingSample> = base.iter().chain(online).collect();
    let skip = all.len().saturating_sub(max.max(1));
    all.into_iter().skip(skip).cloned().collect()
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::application::agent::tests::{domain, stories};
    use crate::domain::entities::{DialogueState, UserMessage};
    use crate::domain::traits::MessageHandler;
    use crate::infrastructure::nlu::RegexInterpreter;

    /// Replays scripted answers and records everything said
    struct ScriptedChannel {
        answers: Mutex<VecDeque<String>>,
        said: Mutex<Vec<String>>,
    }

    impl ScriptedChannel {
        fn new(answers: &[&str]) -> Self {
            Self {
                answers: Mutex::new(answers.iter().map(|a| a.to_string()).collect()),
                said: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl InteractiveChannel for ScriptedChannel {
        async fn ask(&self, _prompt: &str) -> Result<Option<String>, BotError> {
            Ok(self.answers.lock().unwrap().pop_front())
        }

        async fn say(&self, text: &str) -> Result<(), BotError> {
            self.said.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn params() -> OnlineParams {
        OnlineParams { epochs: 10, ..Default::default() }
    }

    #[tokio::test]
    async fn test_confirmed_session_does_not_retrain() {
        let mut agent = Agent::new(domain(), Arc::new(RegexInterpreter::new()), 2);
        let channel = ScriptedChannel::new(&["/greet", "y", "y", "y", STOP_COMMAND]);

        let summary = agent.train_online(&stories(), &channel, &params()).await.unwrap();
        assert_eq!(summary, OnlineSummary { turns: 1, corrections: 0 });
        assert!(channel.said.lock().unwrap().iter().any(|s| s == "[BOT] Hello!"));
    }

    #[tokio::test]
    async fn test_correction_is_learned() {
        let mut agent = Agent::new(domain(), Arc::new(RegexInterpreter::new()), 2);
        // "hello" has no intent: pick greet (1), reject utter_greet for utter_bye,
        // then reject whatever follows in favour of listening (1)
        let utter_bye = (domain().action_names().iter().position(|a| a == "utter_bye").unwrap() + 1).to_string();
        let channel = ScriptedChannel::new(&["hello", "1", "n", &utter_bye, "n", "1"]);

        let summary = agent.train_online(&stories(), &channel, &params()).await.unwrap();
        assert_eq!(summary.turns, 1);
        assert_eq!(summary.corrections, 1);

        // the memorized correction now answers greet with utter_bye
        let replies = agent.handle(UserMessage::new("someone", "/greet")).await.unwrap();
        assert_eq!(replies[0].text, "Bye");
    }

    #[tokio::test]
    async fn test_closed_input_ends_session() {
        let mut agent = Agent::new(domain(), Arc::new(RegexInterpreter::new()), 2);
        let channel = ScriptedChannel::new(&["/greet"]);
        let summary = agent.train_online(&stories(), &channel, &params()).await.unwrap();
        assert_eq!(summary.turns, 1);
        assert_eq!(summary.corrections, 0);
    }

    #[tokio::test]
    async fn test_initial_training_respects_sample_cap() {
        let mut agent = Agent::new(domain(), Arc::new(RegexInterpreter::new()), 2);
        let channel = ScriptedChannel::new(&[]);
        let params = OnlineParams { max_training_samples: 2, ..params() };

        let summary = agent.train_online(&stories(), &channel, &params).await.unwrap();
        assert_eq!(summary, OnlineSummary::default());
        assert_eq!(agent.trained_samples, 2);
    }

    #[test]
    fn test_recent_samples_keeps_newest() {
        let sample = |action: &str| TrainingSample { history: vec![DialogueState::default()], action: action.to_string() };
        let base = vec![sample("a"), sample("b")];
        let online = vec![sample("c")];
        let kept: Vec<String> = recent_samples(&base, &online, 2).into_iter().map(|s| s.action).collect();
        assert_eq!(kept, vec!["b", "c"]);
    }
}
