//! Training data loading - NLU examples, dialogue stories and the domain file

pub mod nlu;
pub mod stories;

pub use nlu::load_data;
pub use stories::load_stories;

use std::path::Path;

use crate::application::errors::BotError;
use crate::domain::entities::DomainSpec;

/// Load a domain specification from YAML. The structure is not validated beyond parsing.
pub fn load_domain(path: impl AsRef<Path>) -> Result<DomainSpec, BotError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| BotError::Domain(format!("Failed to read {}: {}", path.display(), e)))?;
    let domain: DomainSpec = serde_yaml::from_str(&content)
        .map_err(|e| BotError::Domain(format!("Failed to parse {}: {}", path.display(), e)))?;
    tracing::debug!(
        "Loaded domain with {} intents, {} actions, {} slots",
        domain.intents.len(),
        domain.actions.len(),
        domain.slots.len()
    );
    Ok(domain)
}
