//! Feed-forward network policy
//!
//! One ReLU hidden layer and a softmax output over all actions, trained with
//! mini-batch gradient descent on cross-entropy.

use std::path::Path;

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::application::errors::BotError;
use crate::domain::entities::{DialogueState, PolicyParams};
use crate::infrastructure::storage;
use super::featurizer::StateFeaturizer;
use super::traits::{Policy, TrainingSample};

pub const NEURAL: &str = "neural";

const DEFAULT_HIDDEN: usize = 32;
const DEFAULT_LEARNING_RATE: f64 = 0.1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Network {
    /// `(hidden, input)`
    w1: Array2<f64>,
    b1: Array1<f64>,
    /// `(output, hidden)`
    w2: Array2<f64>,
    b2: Array1<f64>,
}

struct Gradients {
    w1: Array2<f64>,
    b1: Array1<f64>,
    w2: Array2<f64>,
    b2: Array1<f64>,
}

impl Network {
    fn new(inputs: usize, hidden: usize, outputs: usize, rng: &mut StdRng) -> Self {
        let l1 = (6.0 / (inputs + hidden) as f64).sqrt();
        let l2 = (6.0 / (hidden + outputs) as f64).sqrt();
        Self {
            w1: Array2::from_shape_fn((hidden, inputs), |_| rng.random_range(-l1..l1)),
            b1: Array1::zeros(hidden),
            w2: Array2::from_shape_fn((outputs, hidden), |_| rng.random_range(-l2..l2)),
            b2: Array1::zeros(outputs),
        }
    }

    fn inputs(&self) -> usize {
        self.w1.ncols()
    }

    fn outputs(&self) -> usize {
        self.b2.len()
    }

    /// Hidden activations and output probabilities
    fn forward(&self, x: &Array1<f64>) -> (Array1<f64>, Array1<f64>) {
        let hidden = (self.w1.dot(x) + &self.b1).mapv(|v| v.max(0.0));
        let logits = self.w2.dot(&hidden) + &self.b2;
        (hidden, softmax(&logits))
    }

    fn zero_gradients(&self) -> Gradients {
        Gradients {
            w1: Array2::zeros(self.w1.raw_dim()),
            b1: Array1::zeros(self.b1.len()),
            w2: Array2::zeros(self.w2.raw_dim()),
            b2: Array1::zeros(self.b2.len()),
        }
    }

    /// Accumulate gradients for one example and return its loss
    fn backprop(&self, x: &Array1<f64>, target: usize, grads: &mut Gradients) -> f64 {
        let (hidden, probs) = self.forward(x);
        let loss = -probs[target].max(1e-12).ln();

        let mut d_out = probs;
        d_out[target] -= 1.0;
        let relu_grad = hidden.mapv(|h| if h > 0.0 { 1.0 } else { 0.0 });
        let d_hidden = self.w2.t().dot(&d_out) * relu_grad;

        grads.w2 += &outer(&d_out, &hidden);
        grads.b2 += &d_out;
        grads.w1 += &outer(&d_hidden, x);
        grads.b1 += &d_hidden;
        loss
    }

    fn apply(&mut self, grads: &Gradients, scale: f64) {
        self.w1.scaled_add(-scale, &grads.w1);
        self.b1.scaled_add(-scale, &grads.b1);
        self.w2.scaled_add(-scale, &grads.w2);
        self.b2.scaled_add(-scale, &grads.b2);
    }
}

/// Outer product, shaped `(a.len(), b.len())`
fn outer(a: &Array1<f64>, b: &Array1<f64>) -> Array2<f64> {
    a.view().insert_axis(Axis(1)).dot(&b.view().insert_axis(Axis(0)))
}

fn softmax(logits: &Array1<f64>) -> Array1<f64> {
    let max = logits.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
    let exps = logits.mapv(|l| (l - max).exp());
    let sum = exps.sum();
    exps / sum
}

fn argmax(values: &Array1<f64>) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
        .0
}

/// Neural network policy generalizing to histories not seen in training
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuralPolicy {
    hidden_size: usize,
    learning_rate: f64,
    network: Option<Network>,
}

impl Default for NeuralPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_HIDDEN, DEFAULT_LEARNING_RATE)
    }
}

impl NeuralPolicy {
    pub fn new(hidden_size: usize, learning_rate: f64) -> Self {
        Self {
            hidden_size: hidden_size.max(1),
            learning_rate,
            network: None,
        }
    }

    pub fn load(dir: &Path) -> Result<Self, BotError> {
        storage::read_json(dir, &format!("{}.json", NEURAL))
    }

    fn accuracy(network: &Network, data: &[(Array1<f64>, usize)]) -> f64 {
        if data.is_empty() {
            return 0.0;
        }
        let correct = data.iter().filter(|(x, y)| argmax(&network.forward(x).1) == *y).count();
        correct as f64 / data.len() as f64
    }
}

impl Policy for NeuralPolicy {
    fn name(&self) -> &'static str {
        NEURAL
    }

    fn train(
        &mut self,
        samples: &[TrainingSample],
        featurizer: &StateFeaturizer,
        params: &PolicyParams,
    ) -> Result<(), BotError> {
        if samples.is_empty() {
            return Err(BotError::Training("no training samples for the neural policy".to_string()));
        }

        let mut data = Vec::with_capacity(samples.len());
        for sample in samples {
            let target = featurizer.action_index(&sample.action).ok_or_else(|| {
                BotError::Training(format!("action '{}' is not in the domain", sample.action))
            })?;
            data.push((featurizer.encode(&sample.history), target));
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        data.shuffle(&mut rng);

        let split = params.validation_split.clamp(0.0, 0.9);
        let n_val = ((data.len() as f64) * split).floor() as usize;
        let n_val = n_val.min(data.len().saturating_sub(1));
        let validation = data.split_off(data.len() - n_val);

        let mut network = Network::new(
            featurizer.input_dim(),
            self.hidden_size,
            featurizer.actions().len(),
            &mut rng,
        );
        let batch_size = params.batch_size.max(1);

        tracing::info!(
            "Training neural policy: {} samples ({} validation), {} epochs, batch size {}",
            data.len(),
            validation.len(),
            params.epochs,
            batch_size
        );

        for epoch in 0..params.epochs {
            data.shuffle(&mut rng);
            let mut epoch_loss = 0.0;
            for batch in data.chunks(batch_size) {
                let mut grads = network.zero_gradients();
                for (x, y) in batch {
                    epoch_loss += network.backprop(x, *y, &mut grads);
                }
                network.apply(&grads, self.learning_rate / batch.len() as f64);
            }
            if (epoch + 1) % 100 == 0 {
                tracing::debug!("epoch {}: loss {:.4}", epoch + 1, epoch_loss / data.len() as f64);
            }
        }

        let train_acc = Self::accuracy(&network, &data);
        if validation.is_empty() {
            tracing::info!("Neural policy trained, accuracy {:.3}", train_acc);
        } else {
            tracing::info!(
                "Neural policy trained, accuracy {:.3}, validation accuracy {:.3}",
                train_acc,
                Self::accuracy(&network, &validation)
            );
        }

        self.network = Some(network);
        Ok(())
    }

    fn predict(&self, history: &[DialogueState], featurizer: &StateFeaturizer) -> Array1<f64> {
        match &self.network {
            Some(network)
                if network.inputs() == featurizer.input_dim()
                    && network.outputs() == featurizer.actions().len() =>
            {
                network.forward(&featurizer.encode(history)).1
            }
            Some(_) => {
                tracing::warn!("Neural policy shape does not match the featurizer, ignoring it");
                Array1::zeros(featurizer.actions().len())
            }
            None => Array1::zeros(featurizer.actions().len()),
        }
    }

    fn persist(&self, dir: &Path) -> Result<(), BotError> {
        storage::write_json(dir, &format!("{}.json", NEURAL), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::DomainSpec;

    fn setup() -> (StateFeaturizer, Vec<TrainingSample>) {
        let domain = DomainSpec {
            intents: vec!["greet".to_string(), "bye".to_string()],
            actions: vec!["utter_greet".to_string(), "utter_bye".to_string()],
            ..Default::default()
        };
        let featurizer = StateFeaturizer::new(&domain, 2);
        let state = |intent: &str| DialogueState {
            intent: Some(intent.to_string()),
            entities: Vec::new(),
            prev_action: Some("action_listen".to_string()),
        };
        let samples = vec![
            TrainingSample { history: vec![state("greet")], action: "utter_greet".to_string() },
            TrainingSample { history: vec![state("bye")], action: "utter_bye".to_string() },
        ];
        (featurizer, samples)
    }

    #[test]
    fn test_learns_separable_mapping() {
        let (featurizer, samples) = setup();
        let mut samples: Vec<TrainingSample> = samples.iter().cycle().take(10).cloned().collect();
        samples.rotate_left(1);
        let params = PolicyParams {
            epochs: 300,
            batch_size: 4,
            validation_split: 0.0,
            ..Default::default()
        };

        let mut policy = NeuralPolicy::default();
        policy.train(&samples, &featurizer, &params).unwrap();

        for sample in &samples[..2] {
            let probs = policy.predict(&sample.history, &featurizer);
            assert_eq!(featurizer.actions()[argmax(&probs)], sample.action);
            assert!((probs.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_output_gradients_match_finite_differences() {
        let mut rng = StdRng::seed_from_u64(7);
        let network = Network::new(4, 3, 2, &mut rng);
        let x = ndarray::arr1(&[1.0, 0.0, 0.5, 1.0]);
        let mut grads = network.zero_gradients();
        network.backprop(&x, 1, &mut grads);
        assert_eq!(grads.w1.dim(), (3, 4));
        assert_eq!(grads.w2.dim(), (2, 3));

        let loss = |net: &Network| -net.forward(&x).1[1].ln();
        let eps = 1e-6;
        for o in 0..2 {
            for h in 0..3 {
                let mut plus = network.clone();
                plus.w2[[o, h]] += eps;
                let mut minus = network.clone();
                minus.w2[[o, h]] -= eps;
                let numeric = (loss(&plus) - loss(&minus)) / (2.0 * eps);
                assert!((numeric - grads.w2[[o, h]]).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_untrained_predicts_nothing() {
        let (featurizer, samples) = setup();
        let policy = NeuralPolicy::default();
        assert!(policy.predict(&samples[0].history, &featurizer).iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_unknown_action_is_training_error() {
        let (featurizer, _) = setup();
        let samples = vec![TrainingSample { history: Vec::new(), action: "utter_missing".to_string() }];
        let mut policy = NeuralPolicy::default();
        let err = policy.train(&samples, &featurizer, &PolicyParams::default()).unwrap_err();
        assert!(matches!(err, BotError::Training(_)));
    }

    #[test]
    fn test_persist_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let (featurizer, samples) = setup();
        let mut policy = NeuralPolicy::new(8, 0.1);
        let params = PolicyParams { epochs: 10, validation_split: 0.0, ..Default::default() };
        policy.train(&samples, &featurizer, &params).unwrap();
        policy.persist(dir.path()).unwrap();

        let loaded = NeuralPolicy::load(dir.path()).unwrap();
        assert!(loaded.network.is_some());
        let before = policy.predict(&samples[0].history, &featurizer);
        let after = loaded.predict(&samples[0].history, &featurizer);
        for (a, b) in before.iter().zip(&after) {
            assert!((a - b).abs() < 1e-9);
        }
    }
}
