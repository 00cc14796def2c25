//! Infrastructure layer - External concerns
//! 
//! This layer contains:
//! - Config: Configuration loading
//! - Data: NLU training data, stories and domain files
//! - NLU: Intent classifier, entity lookup and interpreters
//! - Policies: Dialogue policies and their ensemble
//! - Storage: Model artifact persistence
//! - Adapters: Console and webhook channels

pub mod adapters;
pub mod config;
pub mod data;
pub mod nlu;
pub mod policies;
pub mod storage;
