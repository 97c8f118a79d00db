//! # Classifier Crate
//!
//! Wraps the pretrained food classifier behind the [`ImageClassifier`] trait.
//!
//! ## Main Components
//!
//! - **labels**: Load the class index to food name table
//! - **preprocess**: Decode an image and convert it to the model's input layout
//! - **ranking**: Select the top-k classes from a probability vector
//! - **onnx**: [`OnnxClassifier`], the tract-based implementation
//! - **error**: Error types for loading and classification
//!
//! ## Example Usage
//!
//! ```ignore
//! use classifier::{ImageClassifier, InputSize, OnnxClassifier};
//! use std::path::Path;
//!
//! let classifier = OnnxClassifier::from_paths(
//!     Path::new("models/food101.onnx"),
//!     Path::new("models/class_labels.json"),
//!     InputSize::default(),
//! )?;
//!
//! for prediction in classifier.classify(Path::new("pizza.jpg"), 3)? {
//!     println!("{}: {:.2}%", prediction.label, prediction.confidence * 100.0);
//! }
//! ```

use std::path::Path;

pub mod error;
pub mod labels;
pub mod onnx;
pub mod preprocess;
pub mod ranking;

pub use error::{ClassifierError, Result};
pub use labels::LabelTable;
pub use onnx::OnnxClassifier;
pub use preprocess::InputSize;
pub use ranking::{Prediction, rank_top_k};

/// Anything that can turn an image file into ranked food labels.
///
/// Implementations are loaded once at startup and then used read-only, so
/// they must be shareable across threads. Classification is CPU-bound and
/// synchronous; async callers should run it on a blocking pool.
pub trait ImageClassifier: Send + Sync {
    /// Classify the image at `image_path` and return the `top_k` most
    /// likely labels, highest confidence first.
    ///
    /// # Errors
    /// - `InvalidImage` if the file is missing, empty or undecodable
    /// - `InvalidArgument` if `top_k` is 0
    /// - `Inference` if the model run fails
    fn classify(&self, image_path: &Path, top_k: usize) -> Result<Vec<Prediction>>;

    /// Number of classes the model can predict
    fn num_classes(&self) -> usize;
}
