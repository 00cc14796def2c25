//! Application layer - Use cases and orchestration
//!
//! This layer contains:
//! - Agent: Dialogue training and conversation handling
//! - Services: NLU training, dialogue training and bot runtime orchestration
//! - Dispatcher: Run mode selection
//! - Errors: Domain-specific errors

pub mod agent;
pub mod dispatcher;
pub mod errors;
pub mod services;
