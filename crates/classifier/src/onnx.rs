//! ONNX-backed food classifier.

use std::path::Path;
use std::time::Instant;

use tracing::{debug, info};
use tract_onnx::prelude::*;

use crate::error::{ClassifierError, Result};
use crate::labels::LabelTable;
use crate::preprocess::{self, InputSize};
use crate::ranking::{self, Prediction};
use crate::ImageClassifier;

type Plan = TypedRunnableModel<TypedModel>;

/// Classifier running an exported ONNX model with tract.
///
/// The model is parsed and optimized once in [`OnnxClassifier::load`]; after
/// that the classifier is read-only and can be shared across threads.
pub struct OnnxClassifier {
    plan: Plan,
    labels: LabelTable,
    input_size: InputSize,
}

impl OnnxClassifier {
    /// Load and optimize the model for a fixed NHWC input of `input_size`.
    ///
    /// # Errors
    /// `ModelUnavailable` if the label table is empty, the file is missing,
    /// or tract cannot build a runnable plan from it.
    pub fn load(model_path: &Path, labels: LabelTable, input_size: InputSize) -> Result<Self> {
        let start = Instant::now();
        info!("Loading classifier model from {}", model_path.display());

        if labels.is_empty() {
            return Err(ClassifierError::model_unavailable(model_path, "label table is empty"));
        }

        let plan = tract_onnx::onnx()
            .model_for_path(model_path)
            .and_then(|model| build_plan(model, input_size))
            .map_err(|e| ClassifierError::model_unavailable(model_path, e))?;

        info!(
            "Classifier ready: {} labels, input {}x{}, loaded in {:.2?}",
            labels.len(),
            input_size.width,
            input_size.height,
            start.elapsed()
        );

        Ok(Self {
            plan,
            labels,
            input_size,
        })
    }

    /// Load both the model and its label table from disk.
    pub fn from_paths(model_path: &Path, labels_path: &Path, input_size: InputSize) -> Result<Self> {
        let labels = LabelTable::load(labels_path)?;
        Self::load(model_path, labels, input_size)
    }

    fn infer(&self, pixels: Vec<f32>) -> Result<Vec<f32>> {
        let shape = [
            1,
            self.input_size.height as usize,
            self.input_size.width as usize,
            3,
        ];
        let input = Tensor::from_shape(&shape, &pixels)
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let first = outputs
            .first()
            .ok_or_else(|| ClassifierError::Inference("model produced no outputs".into()))?;
        let probabilities: Vec<f32> = first
            .to_array_view::<f32>()
            .map_err(|e| ClassifierError::Inference(format!("output is not f32: {}", e)))?
            .iter()
            .copied()
            .collect();

        if probabilities.len() != self.labels.len() {
            return Err(ClassifierError::Inference(format!(
                "model produced {} scores but the label table has {} entries",
                probabilities.len(),
                self.labels.len()
            )));
        }

        Ok(probabilities)
    }
}

/// Fix the input to NHWC `1 x H x W x 3` f32 and optimize for repeated runs.
fn build_plan(model: InferenceModel, input_size: InputSize) -> TractResult<Plan> {
    let input_shape = [
        1,
        input_size.height as usize,
        input_size.width as usize,
        3,
    ];
    model
        .with_input_fact(0, f32::fact(input_shape).into())?
        .into_optimized()?
        .into_runnable()
}

impl ImageClassifier for OnnxClassifier {
    fn classify(&self, image_path: &Path, top_k: usize) -> Result<Vec<Prediction>> {
        if top_k == 0 {
            return Err(ClassifierError::InvalidArgument("top_k must be at least 1".into()));
        }

        let start = Instant::now();
        let image = preprocess::load_rgb(image_path)?;
        let pixels = preprocess::to_nhwc(&image, self.input_size);
        let probabilities = self.infer(pixels)?;
        let predictions = ranking::rank_top_k(&probabilities, &self.labels, top_k);

        debug!(
            image = %image_path.display(),
            top_label = predictions.first().map(|p| p.label.as_str()).unwrap_or("-"),
            elapsed = ?start.elapsed(),
            "Classified image"
        );

        Ok(predictions)
    }

    fn num_classes(&self) -> usize {
        self.labels.len()
    }
}
