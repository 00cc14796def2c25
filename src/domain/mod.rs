//! Domain layer - Conversational model with no infrastructure concerns
//!
//! This layer contains:
//! - Entities: Training data, stories, domain spec, trackers, messages
//! - Traits: Abstractions for infrastructure (Interpreter, trainers, channels)

pub mod entities;
pub mod traits;
