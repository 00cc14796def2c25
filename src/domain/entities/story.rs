use std::collections::BTreeMap;

/// One step of a dialogue story
#[derive(Debug, Clone, PartialEq)]
pub enum StoryStep {
    /// User turn with the intent and entity values it carried
    User {
        intent: String,
        entities: BTreeMap<String, String>,
    },
    /// Bot action
    Action(String),
}

impl StoryStep {
    pub fn user(intent: impl Into<String>) -> Self {
        StoryStep::User {
            intent: intent.into(),
            entities: BTreeMap::new(),
        }
    }

    pub fn action(name: impl Into<String>) -> Self {
        StoryStep::Action(name.into())
    }
}

/// A named example conversation
#[derive(Debug, Clone, PartialEq)]
pub struct Story {
    pub name: String,
    pub steps: Vec<StoryStep>,
}

impl Story {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn with_step(mut self, step: StoryStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Concatenate two stories into one training sequence
    pub fn glue(&self, other: &Story) -> Story {
        let mut steps = self.steps.clone();
        steps.extend(other.steps.iter().cloned());
        Story {
            name: format!("{} > {}", self.name, other.name),
            steps,
        }
    }
}
