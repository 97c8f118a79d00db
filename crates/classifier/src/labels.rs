//! Label table loading.
//!
//! The table maps a class index from the model output to a human-readable
//! food name. Three layouts are accepted:
//!
//! - JSON array: `["apple_pie", "baby_back_ribs", ...]`
//! - JSON object of name to index, as exported by Keras `class_indices`:
//!   `{"apple_pie": 0, "baby_back_ribs": 1, ...}`
//! - Plain text with one label per line
//!
//! Anything with a `.json` extension is parsed as JSON, everything else as text.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::{ClassifierError, Result};

/// Index-ordered list of class labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonLabels {
    List(Vec<String>),
    Indexed(HashMap<String, usize>),
}

impl LabelTable {
    /// Build a table directly from labels in index order.
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// Load a label table from disk.
    ///
    /// Fails with `ModelUnavailable` because a missing or broken table
    /// leaves the classifier unusable.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| ClassifierError::model_unavailable(path, e))?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let labels = if is_json {
            parse_json(&content).map_err(|reason| ClassifierError::model_unavailable(path, reason))?
        } else {
            parse_lines(&content)
        };

        if labels.is_empty() {
            return Err(ClassifierError::model_unavailable(path, "label table is empty"));
        }

        info!("Loaded {} class labels from {}", labels.len(), path.display());
        Ok(Self { labels })
    }

    /// Label for a class index, if the index is in range.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }
}

fn parse_json(content: &str) -> std::result::Result<Vec<String>, String> {
    let parsed: JsonLabels =
        serde_json::from_str(content).map_err(|e| format!("invalid label JSON: {}", e))?;

    match parsed {
        JsonLabels::List(labels) => Ok(labels),
        JsonLabels::Indexed(map) => {
            let mut slots: Vec<Option<String>> = vec![None; map.len()];
            for (name, index) in map {
                let slot = slots
                    .get_mut(index)
                    .ok_or_else(|| format!("label '{}' has out-of-range index {}", name, index))?;
                if slot.is_some() {
                    return Err(format!("duplicate class index {}", index));
                }
                *slot = Some(name);
            }
            // With n entries, n distinct in-range indices leave no holes
            Ok(slots.into_iter().flatten().collect())
        }
    }
}

fn parse_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
