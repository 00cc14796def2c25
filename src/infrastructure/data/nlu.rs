//! NLU example loading
//!
//! Two formats are understood:
//! - Markdown: `## intent:<name>` headers followed by `- example` lines, with
//!   entities annotated inline as `[value](entity)` or `[text](entity:value)`.
//! - JSON: `{ "rasa_nlu_data": { "common_examples": [ { "text", "intent", "entities" } ] } }`.

use std::path::Path;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::Deserialize;

use crate::application::errors::BotError;
use crate::domain::entities::{Entity, NluExample, TrainingData};

static ENTITY_ANNOTATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("entity annotation regex"));

#[derive(Debug, Deserialize)]
struct JsonTrainingFile {
    rasa_nlu_data: JsonTrainingData,
}

#[derive(Debug, Deserialize)]
struct JsonTrainingData {
    #[serde(default)]
    common_examples: Vec<NluExample>,
}

/// Load every `.md` and `.json` file under `path` (or the single file `path`)
pub fn load_data(path: impl AsRef<Path>) -> Result<TrainingData, BotError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(BotError::TrainingData(format!("{} does not exist", path.display())));
    }

    let files = if path.is_dir() {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let file = entry?.path();
            if file.is_file() && matches!(extension(&file).as_deref(), Some("md") | Some("json")) {
                files.push(file);
            }
        }
        files.sort();
        files
    } else {
        vec![path.to_path_buf()]
    };

    let mut data = TrainingData::default();
    for file in &files {
        let content = std::fs::read_to_string(file)?;
        let loaded = match extension(file).as_deref() {
            Some("json") => parse_json(&content)
                .map_err(|e| BotError::TrainingData(format!("{}: {}", file.display(), e)))?,
            _ => parse_markdown(&content)
                .map_err(|e| BotError::TrainingData(format!("{}: {}", file.display(), e)))?,
        };
        tracing::debug!("Loaded {} examples from {}", loaded.len(), file.display());
        data.merge(loaded);
    }

    if data.is_empty() {
        return Err(BotError::TrainingData(format!(
            "no training examples found in {}",
            path.display()
        )));
    }

    tracing::info!(
        "Training data: {} examples, {} intents",
        data.len(),
        data.intents().len()
    );
    Ok(data)
}

fn extension(path: &Path) -> Option<String> {
    path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase())
}

/// JSON entity offsets count characters; they are stored as byte offsets
fn parse_json(content: &str) -> Result<TrainingData, String> {
    let file: JsonTrainingFile = serde_json::from_str(content).map_err(|e| e.to_string())?;
    let mut examples = file.rasa_nlu_data.common_examples;
    for example in &mut examples {
        for entity in &mut example.entities {
            let (start, end) = byte_span(&example.text, entity.start, entity.end).ok_or_else(|| {
                format!("entity span {}..{} is out of range in '{}'", entity.start, entity.end, example.text)
            })?;
            entity.start = start;
            entity.end = end;
        }
    }
    Ok(TrainingData::new(examples))
}

fn byte_span(text: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    let byte_at = |chars: usize| {
        text.char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .nth(chars)
    };
    let (start, end) = (byte_at(start)?, byte_at(end)?);
    (start <= end).then_some((start, end))
}

/// Parse the markdown format. Sections other than `intent:` are skipped.
pub fn parse_markdown(content: &str) -> Result<TrainingData, String> {
    let mut examples = Vec::new();
    let mut current_intent: Option<String> = None;
    let mut in_other_section = false;

    for (line_no, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with("<!--") {
            continue;
        }

        if let Some(header) = line.strip_prefix("##") {
            let header = header.trim();
            match header.strip_prefix("intent:") {
                Some(name) if !name.trim().is_empty() => {
                    current_intent = Some(name.trim().to_string());
                    in_other_section = false;
                }
                Some(_) => return Err(format!("line {}: empty intent name", line_no + 1)),
                None => {
                    tracing::debug!("Skipping section '{}'", header);
                    current_intent = None;
                    in_other_section = true;
                }
            }
            continue;
        }

        let Some(example) = line.strip_prefix('-') else {
            return Err(format!("line {}: expected '- example' or '## intent:<name>'", line_no + 1));
        };

        if in_other_section {
            continue;
        }
        let Some(intent) = &current_intent else {
            return Err(format!("line {}: example outside of an intent section", line_no + 1));
        };

        let (text, entities) = parse_annotated(example.trim());
        examples.push(NluExample::new(text, intent.clone()).with_entities(entities));
    }

    Ok(TrainingData::new(examples))
}

/// Strip `[text](entity)` annotations, returning plain text and entity spans in it
pub fn parse_annotated(line: &str) -> (String, Vec<Entity>) {
    let mut text = String::with_capacity(line.len());
    let mut entities = Vec::new();
    let mut last = 0;

    for caps in ENTITY_ANNOTATION.captures_iter(line) {
        let (Some(whole), Some(surface), Some(label)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        text.push_str(&line[last..whole.start()]);

        let surface = surface.as_str();
        let (entity, value) = match label.as_str().split_once(':') {
            Some((entity, value)) => (entity.trim(), value.trim()),
            None => (label.as_str().trim(), surface),
        };

        let start = text.len();
        text.push_str(surface);
        entities.push(Entity::new(entity, value, start, text.len()));
        last = whole.end();
    }
    text.push_str(&line[last..]);

    (text, entities)
}
