use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Action that hands control back to the user
pub const ACTION_LISTEN: &str = "action_listen";
/// Action that wipes the conversation state
pub const ACTION_RESTART: &str = "action_restart";

/// Built-in actions, always present at the front of the action list
pub const DEFAULT_ACTIONS: [&str; 2] = [ACTION_LISTEN, ACTION_RESTART];

/// Slot declaration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SlotSpec {
    #[serde(rename = "type", default = "default_slot_type")]
    pub kind: String,
    #[serde(default)]
    pub initial_value: Option<String>,
}

fn default_slot_type() -> String {
    "text".to_string()
}

/// A response template; the YAML may give either a bare string or `{ text: ... }`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Template {
    Text(String),
    Structured { text: String },
}

impl Template {
    pub fn text(&self) -> &str {
        match self {
            Template::Text(t) => t,
            Template::Structured { text } => text,
        }
    }
}

/// Declarative description of what the agent can understand and do
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DomainSpec {
    #[serde(default)]
    pub intents: Vec<String>,
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default)]
    pub slots: BTreeMap<String, SlotSpec>,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub templates: BTreeMap<String, Vec<Template>>,
}

impl DomainSpec {
    /// All actions, built-ins first, without duplicates
    pub fn action_names(&self) -> Vec<String> {
        let mut names: Vec<String> = DEFAULT_ACTIONS.iter().map(|a| a.to_string()).collect();
        for action in &self.actions {
            if !names.contains(action) {
                names.push(action.clone());
            }
        }
        names
    }

    pub fn has_action(&self, name: &str) -> bool {
        DEFAULT_ACTIONS.contains(&name) || self.actions.iter().any(|a| a == name)
    }

    pub fn has_intent(&self, name: &str) -> bool {
        self.intents.iter().any(|i| i == name)
    }

    pub fn templates_for(&self, action: &str) -> &[Template] {
        self.templates.get(action).map(Vec::as_slice).unwrap_or(&[])
    }
}
