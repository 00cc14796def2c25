use crate::domain::entities::ParseResult;

/// Interpreter trait - turns raw user text into an intent and entities
pub trait Interpreter: Send + Sync {
    /// Parse one utterance. Unrecognized text yields a result without intent.
    fn parse(&self, text: &str) -> ParseResult;
}
