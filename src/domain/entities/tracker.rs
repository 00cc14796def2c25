use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain_spec::{DomainSpec, ACTION_LISTEN};

/// What the policies see at one prediction point
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DialogueState {
    pub intent: Option<String>,
    /// Entity names, sorted
    pub entities: Vec<String>,
    pub prev_action: Option<String>,
}

impl DialogueState {
    /// Stable textual key used by the memoization lookup
    pub fn key(&self) -> String {
        format!(
            "intent={}|entities={}|prev={}",
            self.intent.as_deref().unwrap_or("-"),
            self.entities.join(","),
            self.prev_action.as_deref().unwrap_or("-"),
        )
    }
}

/// Conversation event
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    UserUttered {
        text: String,
        intent: Option<String>,
        entities: BTreeMap<String, String>,
    },
    ActionExecuted(String),
    SlotSet { name: String, value: String },
    Restarted,
}

/// Event log and slot values of one conversation
#[derive(Debug, Clone)]
pub struct Tracker {
    pub sender_id: String,
    events: Vec<Event>,
    slots: BTreeMap<String, String>,
    initial_slots: BTreeMap<String, String>,
}

impl Tracker {
    /// New conversation; starts listening with slots at their declared initial values
    pub fn new(sender_id: impl Into<String>, domain: &DomainSpec) -> Self {
        let initial_slots: BTreeMap<String, String> = domain
            .slots
            .iter()
            .filter_map(|(name, spec)| spec.initial_value.clone().map(|v| (name.clone(), v)))
            .collect();
        Self {
            sender_id: sender_id.into(),
            events: vec![Event::ActionExecuted(ACTION_LISTEN.to_string())],
            slots: initial_slots.clone(),
            initial_slots,
        }
    }

    pub fn slots(&self) -> &BTreeMap<String, String> {
        &self.slots
    }

    pub fn latest_action(&self) -> Option<&str> {
        self.events.iter().rev().find_map(|e| match e {
            Event::ActionExecuted(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Record a user turn. Entities whose name is a declared slot fill that slot.
    pub fn update_with_user(
        &mut self,
        text: impl Into<String>,
        intent: Option<String>,
        entities: BTreeMap<String, String>,
        domain: &DomainSpec,
    ) {
        let slot_updates: Vec<(String, String)> = entities
            .iter()
            .filter(|(name, _)| domain.slots.contains_key(*name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        self.events.push(Event::UserUttered {
            text: text.into(),
            intent,
            entities,
        });

        for (name, value) in slot_updates {
            self.set_slot(name, value);
        }
    }

    pub fn set_slot(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        self.slots.insert(name.clone(), value.clone());
        self.events.push(Event::SlotSet { name, value });
    }

    pub fn record_action(&mut self, name: impl Into<String>) {
        self.events.push(Event::ActionExecuted(name.into()));
    }

    /// Forget the conversation and start listening again
    pub fn restart(&mut self) {
        self.events.push(Event::Restarted);
        self.events.push(Event::ActionExecuted(ACTION_LISTEN.to_string()));
        self.slots = self.initial_slots.clone();
    }

    /// States before every executed action, followed by the current state
    pub fn past_states(&self) -> Vec<DialogueState> {
        let mut states = Vec::new();
        let mut current = DialogueState::default();

        for event in &self.events {
            match event {
                Event::UserUttered { intent, entities, .. } => {
                    current.intent = intent.clone();
                    current.entities = entities.keys().cloned().collect();
                }
                Event::ActionExecuted(name) => {
                    states.push(current.clone());
                    current.prev_action = Some(name.clone());
                }
                Event::SlotSet { .. } => {}
                Event::Restarted => {
                    states.clear();
                    current = DialogueState::default();
                }
            }
        }

        states.push(current);
        states
    }
}

/// The last `max_history` states, oldest first
pub fn history_window(states: &[DialogueState], max_history: usize) -> &[DialogueState] {
    let start = states.len().saturating_sub(max_history);
    &states[start..]
}
