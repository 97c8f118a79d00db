//! Choosing which ranked labels get a recipe lookup.

use std::collections::HashSet;

use classifier::Prediction;

use crate::query::normalize;

/// A label picked for recipe lookup, with its normalized query.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedLabel {
    pub label: String,
    pub query: String,
    pub confidence: f32,
}

/// Select up to `count` labels from `predictions`, keeping rank order.
///
/// Two labels that normalize to the same query would collide in the recipe
/// set, so only the higher-ranked one is kept. Labels whose query is empty
/// are skipped.
pub fn select_labels(predictions: &[Prediction], count: usize) -> Vec<SelectedLabel> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut selected = Vec::with_capacity(count.min(predictions.len()));

    for prediction in predictions {
        if selected.len() == count {
            break;
        }

        let query = normalize(&prediction.label);
        if query.is_empty() {
            tracing::debug!("Skipping label {:?}: empty query", prediction.label);
            continue;
        }
        if !seen.insert(query.clone()) {
            tracing::debug!(
                "Skipping label {:?}: query {:?} already selected",
                prediction.label,
                query
            );
            continue;
        }

        selected.push(SelectedLabel {
            label: prediction.label.clone(),
            query,
            confidence: prediction.confidence,
        });
    }

    selected
}
