//! Intent classification and entity lookup

use std::collections::BTreeMap;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{Entity, IntentMatch, TrainingData};
use super::config::NluModelConfig;

/// A token with its byte span in the source text
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Split on anything that is not alphanumeric
pub fn tokenize(text: &str, lowercase: bool) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;

    for (idx, ch) in text.char_indices() {
        if ch.is_alphanumeric() {
            if start.is_none() {
                start = Some(idx);
            }
        } else if let Some(s) = start.take() {
            tokens.push(make_token(text, s, idx, lowercase));
        }
    }
    if let Some(s) = start {
        tokens.push(make_token(text, s, text.len(), lowercase));
    }
    tokens
}

fn make_token(text: &str, start: usize, end: usize, lowercase: bool) -> Token {
    let raw = &text[start..end];
    Token {
        text: if lowercase { raw.to_lowercase() } else { raw.to_string() },
        start,
        end,
    }
}

fn features(tokens: &[Token], max_ngram: usize) -> Vec<String> {
    let words: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
    let mut out = Vec::new();
    for n in 1..=max_ngram {
        for window in words.windows(n) {
            out.push(window.join(" "));
        }
    }
    out
}

/// Multinomial naive Bayes over word n-grams
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentClassifier {
    lowercase: bool,
    max_ngram: usize,
    intents: Vec<String>,
    log_priors: Array1<f64>,
    vocabulary: BTreeMap<String, usize>,
    /// `(intent, feature)`
    log_likelihoods: Array2<f64>,
}

impl IntentClassifier {
    pub fn train(data: &TrainingData, config: &NluModelConfig) -> Self {
        let intents: Vec<String> = data.intents().into_iter().map(str::to_string).collect();
        let intent_index: BTreeMap<&str, usize> =
            intents.iter().enumerate().map(|(i, name)| (name.as_str(), i)).collect();

        let mut vocabulary = BTreeMap::new();
        let mut doc_features = Vec::with_capacity(data.len());
        for example in &data.examples {
            let feats = features(&tokenize(&example.text, config.lowercase), config.max_ngram);
            for f in &feats {
                let next = vocabulary.len();
                vocabulary.entry(f.clone()).or_insert(next);
            }
            doc_features.push(feats);
        }

        let mut doc_counts = Array1::<f64>::zeros(intents.len());
        let mut log_likelihoods = Array2::<f64>::zeros((intents.len(), vocabulary.len()));
        for (example, feats) in data.examples.iter().zip(&doc_features) {
            let c = intent_index[example.intent.as_str()];
            doc_counts[c] += 1.0;
            for f in feats {
                log_likelihoods[[c, vocabulary[f]]] += 1.0;
            }
        }

        let total_docs = data.len().max(1) as f64;
        let alpha = config.smoothing;
        let v = vocabulary.len() as f64;
        let log_priors = doc_counts.mapv(|n| (n / total_docs).ln());
        for mut counts in log_likelihoods.rows_mut() {
            let total = counts.sum();
            counts.mapv_inplace(|n| ((n + alpha) / (total + alpha * v)).ln());
        }

        tracing::debug!("Trained intent classifier: {} intents, {} features", intents.len(), vocabulary.len());

        Self {
            lowercase: config.lowercase,
            max_ngram: config.max_ngram,
            intents,
            log_priors,
            vocabulary,
            log_likelihoods,
        }
    }

    pub fn intents(&self) -> &[String] {
        &self.intents
    }

    /// All intents ranked by confidence, highest first
    pub fn rank(&self, text: &str) -> Vec<IntentMatch> {
        if self.intents.is_empty() {
            return Vec::new();
        }
        let feats = features(&tokenize(text, self.lowercase), self.max_ngram);
        let mut counts = Array1::<f64>::zeros(self.vocabulary.len());
        for i in feats.iter().filter_map(|f| self.vocabulary.get(f)) {
            counts[*i] += 1.0;
        }

        let scores = self.log_likelihoods.dot(&counts) + &self.log_priors;
        let max = scores.fold(f64::NEG_INFINITY, |m, &s| m.max(s));
        let exps = scores.mapv(|s| (s - max).exp());
        let sum = exps.sum();

        let mut ranking: Vec<IntentMatch> = self
            .intents
            .iter()
            .zip(exps.iter())
            .map(|(name, e)| IntentMatch {
                name: name.clone(),
                confidence: e / sum,
            })
            .collect();
        ranking.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        ranking
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LookupEntry {
    tokens: Vec<String>,
    entity: String,
    value: String,
}

/// Finds entity values that appeared in the training examples
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityLookup {
    entries: Vec<LookupEntry>,
}

impl EntityLookup {
    pub fn train(data: &TrainingData) -> Self {
        let mut seen: BTreeMap<(Vec<String>, String), String> = BTreeMap::new();
        for example in &data.examples {
            for entity in &example.entities {
                let Some(surface) = example.text.get(entity.start..entity.end) else {
                    tracing::warn!("Entity span {}..{} out of range in '{}'", entity.start, entity.end, example.text);
                    continue;
                };
                let tokens: Vec<String> = tokenize(surface, true).into_iter().map(|t| t.text).collect();
                if tokens.is_empty() {
                    continue;
                }
                seen.entry((tokens, entity.entity.clone())).or_insert_with(|| entity.value.clone());
            }
        }

        let mut entries: Vec<LookupEntry> = seen
            .into_iter()
            .map(|((tokens, entity), value)| LookupEntry { tokens, entity, value })
            .collect();
        // longest match first
        entries.sort_by(|a, b| b.tokens.len().cmp(&a.tokens.len()));
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn extract(&self, text: &str) -> Vec<Entity> {
        let tokens = tokenize(text, true);
        let mut found = Vec::new();
        let mut i = 0;

        'outer: while i < tokens.len() {
            for entry in &self.entries {
                let n = entry.tokens.len();
                if i + n <= tokens.len()
                    && tokens[i..i + n].iter().zip(&entry.tokens).all(|(t, e)| &t.text == e)
                {
                    let (start, end) = (tokens[i].start, tokens[i + n - 1].end);
                    found.push(Entity::new(&entry.entity, &entry.value, start, end));
                    i += n;
                    continue 'outer;
                }
            }
            i += 1;
        }
        found
    }
}
