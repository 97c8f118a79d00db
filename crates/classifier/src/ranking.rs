//! Top-k selection over a probability vector.

use serde::Serialize;

use crate::labels::LabelTable;

/// One ranked class from the classifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: String,
    /// Probability estimate, always within `[0, 1]`
    pub confidence: f32,
}

impl Prediction {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence: sanitize(confidence),
        }
    }
}

/// Pick the `top_k` most probable classes, highest first.
///
/// Returns `min(top_k, labels.len())` predictions. Only indices covered by
/// both `probabilities` and `labels` are considered. Equal probabilities keep
/// their index order.
pub fn rank_top_k(probabilities: &[f32], labels: &LabelTable, top_k: usize) -> Vec<Prediction> {
    let width = probabilities.len().min(labels.len());

    let mut indices: Vec<usize> = (0..width).collect();
    indices.sort_by(|&a, &b| {
        sanitize(probabilities[b])
            .partial_cmp(&sanitize(probabilities[a]))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    indices.truncate(top_k);

    indices
        .into_iter()
        .filter_map(|i| {
            labels
                .get(i)
                .map(|label| Prediction::new(label, probabilities[i]))
        })
        .collect()
}

fn sanitize(p: f32) -> f32 {
    if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.0 }
}
