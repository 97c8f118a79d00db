//! Error types for the classifier crate.
//!
//! The variants separate what the caller can fix (a bad upload) from what
//! the operator has to fix (a missing model) and from inference bugs.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading the model or classifying an image
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// The image could not be read, was empty, or could not be decoded.
    ///
    /// This is a per-request failure the caller can correct by sending
    /// a different file.
    #[error("Invalid image {path}: {reason}")]
    InvalidImage { path: PathBuf, reason: String },

    /// The model or its label table could not be loaded.
    ///
    /// Raised at startup only; a classifier that was built successfully
    /// never reports this.
    #[error("Model unavailable ({path}): {reason}")]
    ModelUnavailable { path: PathBuf, reason: String },

    /// A caller passed an argument outside the accepted range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The forward pass failed or produced an unexpected output shape
    #[error("Inference failed: {0}")]
    Inference(String),
}

impl ClassifierError {
    pub(crate) fn invalid_image(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ClassifierError::InvalidImage {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn model_unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ClassifierError::ModelUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, ClassifierError>;
