//! Request-level errors.
//!
//! Only failures that abort the whole request live here. A recipe lookup
//! failure is recorded against its label in the response instead.

use std::time::Duration;

use classifier::ClassifierError;
use thiserror::Error;

/// Errors that fail a prediction request
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictError {
    /// The upload is missing, empty or not a decodable image (400)
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// The classifier could not be loaded (503)
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Classification did not finish before the request deadline (504)
    #[error("Request deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    /// Anything else (500)
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl PredictError {
    /// HTTP status an outer server should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            PredictError::InvalidImage(_) => 400,
            PredictError::ModelUnavailable(_) => 503,
            PredictError::DeadlineExceeded(_) => 504,
            PredictError::Unexpected(_) => 500,
        }
    }

    /// Message safe to show a caller.
    ///
    /// Internal details are replaced with a generic message unless
    /// `expose_details` is set.
    pub fn public_message(&self, expose_details: bool) -> String {
        match self {
            PredictError::InvalidImage(reason) => format!("Invalid image: {}", reason),
            PredictError::DeadlineExceeded(_) => "Request timed out".to_string(),
            _ if expose_details => self.to_string(),
            PredictError::ModelUnavailable(_) => "Classifier is not available".to_string(),
            PredictError::Unexpected(_) => "Internal server error".to_string(),
        }
    }
}

impl From<ClassifierError> for PredictError {
    fn from(err: ClassifierError) -> Self {
        match err {
            ClassifierError::InvalidImage { reason, .. } => PredictError::InvalidImage(reason),
            ClassifierError::ModelUnavailable { .. } => {
                PredictError::ModelUnavailable(err.to_string())
            }
            ClassifierError::InvalidArgument(_) | ClassifierError::Inference(_) => {
                PredictError::Unexpected(err.to_string())
            }
        }
    }
}
