//! Turns stories into policy training samples

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::application::errors::BotError;
use crate::domain::entities::{
    history_window, DomainSpec, PolicyParams, Story, StoryStep, Tracker, ACTION_LISTEN, ACTION_RESTART,
};
use crate::infrastructure::policies::TrainingSample;

/// Fail on intents or actions the domain does not declare
pub fn check_stories(domain: &DomainSpec, stories: &[Story]) -> Result<(), BotError> {
    for story in stories {
        for step in &story.steps {
            match step {
                StoryStep::User { intent, .. } if !domain.has_intent(intent) => {
                    return Err(BotError::Training(format!(
                        "story '{}' uses intent '{}' which is not in the domain",
                        story.name, intent
                    )));
                }
                StoryStep::Action(action) if !domain.has_action(action) => {
                    return Err(BotError::Training(format!(
                        "story '{}' uses action '{}' which is not in the domain",
                        story.name, action
                    )));
                }
                _ => {}
            }
        }
    }
    Ok(())
}

/// Stories plus `augmentation_factor` random pairs glued end to end
pub fn augment(stories: &[Story], augmentation_factor: usize, seed: u64) -> Vec<Story> {
    let mut all = stories.to_vec();
    if stories.len() < 2 || augmentation_factor == 0 {
        return all;
    }
    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..augmentation_factor {
        let first = &stories[rng.random_range(0..stories.len())];
        let second = &stories[rng.random_range(0..stories.len())];
        all.push(first.glue(second));
    }
    all
}

/// Replay one story and record the state window before every action, including
/// the implicit `action_listen` after each bot turn
pub fn replay(domain: &DomainSpec, story: &Story, max_history: usize) -> Vec<TrainingSample> {
    let mut tracker = Tracker::new(story.name.clone(), domain);
    let mut samples = Vec::new();

    for step in &story.steps {
        match step {
            StoryStep::User { intent, entities } => {
                if tracker.latest_action() != Some(ACTION_LISTEN) {
                    act(&mut tracker, ACTION_LISTEN, &mut samples, max_history);
                }
                tracker.update_with_user(format!("/{}", intent), Some(intent.clone()), entities.clone(), domain);
            }
            StoryStep::Action(action) => act(&mut tracker, action, &mut samples, max_history),
        }
    }
    if tracker.latest_action() != Some(ACTION_LISTEN) {
        act(&mut tracker, ACTION_LISTEN, &mut samples, max_history);
    }
    samples
}

fn act(tracker: &mut Tracker, action: &str, samples: &mut Vec<TrainingSample>, max_history: usize) {
    samples.push(TrainingSample {
        history: history_window(&tracker.past_states(), max_history).to_vec(),
        action: action.to_string(),
    });
    tracker.record_action(action);
    if action == ACTION_RESTART {
        tracker.restart();
    }
}

pub fn generate_samples(
    domain: &DomainSpec,
    stories: &[Story],
    params: &PolicyParams,
) -> Result<Vec<TrainingSample>, BotError> {
    check_stories(domain, stories)?;
    let stories = augment(stories, params.augmentation_factor, params.seed);
    let samples: Vec<TrainingSample> = stories
        .iter()
        .flat_map(|story| replay(domain, story, params.max_history))
        .collect();

    if samples.is_empty() {
        return Err(BotError::Training("stories produced no training samples".to_string()));
    }
    tracing::info!("Generated {} training samples from {} stories", samples.len(), stories.len());
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain() -> DomainSpec {
        DomainSpec {
            intents: vec!["greet".to_string(), "bye".to_string()],
            actions: vec!["utter_greet".to_string(), "utter_bye".to_string()],
            ..Default::default()
        }
    }

    fn greet_story() -> Story {
        Story::new("greet")
            .with_step(StoryStep::user("greet"))
            .with_step(StoryStep::action("utter_greet"))
            .with_step(StoryStep::user("bye"))
            .with_step(StoryStep::action("utter_bye"))
    }

    #[test]
    fn test_replay_inserts_listen_between_turns() {
        let samples = replay(&domain(), &greet_story(), 2);
        let actions: Vec<&str> = samples.iter().map(|s| s.action.as_str()).collect();
        assert_eq!(actions, vec!["utter_greet", ACTION_LISTEN, "utter_bye", ACTION_LISTEN]);

        let last_state = samples[2].history.last().unwrap();
        assert_eq!(last_state.intent.as_deref(), Some("bye"));
        assert_eq!(last_state.prev_action.as_deref(), Some(ACTION_LISTEN));
        assert!(samples.iter().all(|s| s.history.len() <= 2));
    }

    #[test]
    fn test_unknown_action_fails() {
        let story = Story::new("bad").with_step(StoryStep::user("greet")).with_step(StoryStep::action("utter_nope"));
        let err = generate_samples(&domain(), &[story], &PolicyParams::default()).unwrap_err();
        assert!(matches!(err, BotError::Training(_)));
    }

    #[test]
    fn test_augment_counts() {
        let stories = vec![greet_story(), Story::new("bye").with_step(StoryStep::user("bye"))];
        assert_eq!(augment(&stories, 5, 1).len(), 7);
        assert_eq!(augment(&stories[..1], 5, 1).len(), 1);
        assert_eq!(augment(&stories, 0, 1).len(), 2);
    }
}
