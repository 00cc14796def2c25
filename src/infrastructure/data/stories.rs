//! Dialogue story loading
//!
//! ```text
//! ## happy path
//! * greet
//!   - utter_greet
//! * inform{"name": "Ada"}
//!   - utter_ack_name
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use crate::application::errors::BotError;
use crate::domain::entities::{Story, StoryStep};

/// Load stories from a markdown file
pub fn load_stories(path: impl AsRef<Path>) -> Result<Vec<Story>, BotError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| BotError::TrainingData(format!("Failed to read {}: {}", path.display(), e)))?;
    let stories = parse_stories(&content)
        .map_err(|e| BotError::TrainingData(format!("{}: {}", path.display(), e)))?;

    if stories.is_empty() {
        return Err(BotError::TrainingData(format!("no stories found in {}", path.display())));
    }
    tracing::info!("Loaded {} stories from {}", stories.len(), path.display());
    Ok(stories)
}

pub fn parse_stories(content: &str) -> Result<Vec<Story>, String> {
    let mut stories: Vec<Story> = Vec::new();

    for (line_no, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with("<!--") {
            continue;
        }

        if let Some(name) = line.strip_prefix("##") {
            stories.push(Story::new(name.trim()));
            continue;
        }

        if line.starts_with('>') {
            tracing::warn!("line {}: checkpoints are not supported, skipping", line_no + 1);
            continue;
        }

        let Some(story) = stories.last_mut() else {
            return Err(format!("line {}: step outside of a story", line_no + 1));
        };

        if let Some(user) = line.strip_prefix('*') {
            let (intent, entities) = parse_user_step(user.trim())
                .map_err(|e| format!("line {}: {}", line_no + 1, e))?;
            story.steps.push(StoryStep::User { intent, entities });
        } else if let Some(action) = line.strip_prefix('-') {
            let action = action.trim();
            if action.is_empty() {
                return Err(format!("line {}: empty action name", line_no + 1));
            }
            story.steps.push(StoryStep::action(action));
        } else {
            return Err(format!("line {}: unrecognized line '{}'", line_no + 1, line));
        }
    }

    Ok(stories.into_iter().filter(|s| !s.steps.is_empty()).collect())
}

/// `intent{"entity": "value"}` → intent name and entity values
pub fn parse_user_step(step: &str) -> Result<(String, BTreeMap<String, String>), String> {
    let (intent, payload) = match step.find('{') {
        Some(idx) => (&step[..idx], Some(&step[idx..])),
        None => (step, None),
    };
    let intent = intent.trim().trim_start_matches('/');
    if intent.is_empty() {
        return Err("empty intent name".to_string());
    }

    let mut entities = BTreeMap::new();
    if let Some(payload) = payload {
        let value: serde_json::Value =
            serde_json::from_str(payload).map_err(|e| format!("invalid entities: {}", e))?;
        let serde_json::Value::Object(map) = value else {
            return Err("entities must be a JSON object".to_string());
        };
        for (name, value) in map {
            let value = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            entities.insert(name, value);
        }
    }

    Ok((intent.to_string(), entities))
}
