//! Dialogue policies: memoization, neural network, and the ensemble combining them

pub mod ensemble;
pub mod featurizer;
pub mod memoization;
pub mod neural;
pub mod traits;

pub use ensemble::{PolicyEnsemble, Prediction};
pub use traits::TrainingSample;
