//! Server crate for the food-lens prediction service.
//!
//! This crate wires the classifier and recipe provider together behind the
//! [`FoodOrchestrator`], and turns its results into the JSON wire format.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod response;
pub mod types;

pub use bootstrap::{build_provider, load_classifier};
pub use config::{AppConfig, ConfigError, Credentials, PipelineConfig, ProviderKind};
pub use error::PredictError;
pub use orchestrator::{FoodOrchestrator, classify_image, lookup_recipes};
pub use response::{ErrorBody, ErrorResponse, WireResponse, assemble, assemble_predictions, assemble_recipes};
pub use types::{PredictionResponse, RecipeLookup, RecipeSet};
