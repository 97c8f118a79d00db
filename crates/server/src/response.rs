//! Wire format for prediction results and request errors.
//!
//! ```json
//! { "predictions": [["pizza", 0.85], ["burger", 0.10]],
//!   "recipes": { "pizza": [{"name": "...", "ingredients": [], "instructions": []}],
//!                "burger": {"error": "Gave up after 5 attempts: ..."} } }
//! ```

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use tracing::error;

use classifier::Prediction;
use recipes::Recipe;

use crate::error::PredictError;
use crate::types::{PredictionResponse, RecipeLookup, RecipeSet};

/// Serializable view of a [`PredictionResponse`]
///
/// Either half may be left out, for the classify-only and lookup-only
/// commands.
#[derive(Debug, Serialize)]
pub struct WireResponse<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predictions: Option<Vec<WirePrediction<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipes: Option<WireRecipes<'a>>,
}

/// A prediction as a `[label, confidence]` pair
#[derive(Debug, Serialize)]
pub struct WirePrediction<'a>(pub &'a str, pub f32);

impl<'a> From<&'a Prediction> for WirePrediction<'a> {
    fn from(prediction: &'a Prediction) -> Self {
        WirePrediction(&prediction.label, prediction.confidence)
    }
}

/// Recipe set as a JSON object that keeps label rank order
#[derive(Debug)]
pub struct WireRecipes<'a>(pub &'a RecipeSet);

impl Serialize for WireRecipes<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (query, lookup) in self.0.iter() {
            map.serialize_entry(query, &WireLookup::from(lookup))?;
        }
        map.end()
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum WireLookup<'a> {
    Found(&'a [Recipe]),
    Failed { error: &'a str },
}

impl<'a> From<&'a RecipeLookup> for WireLookup<'a> {
    fn from(lookup: &'a RecipeLookup) -> Self {
        match lookup {
            RecipeLookup::Found(recipes) => WireLookup::Found(recipes),
            RecipeLookup::Failed { error } => WireLookup::Failed { error },
        }
    }
}

impl WireResponse<'_> {
    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

pub fn assemble(response: &PredictionResponse) -> WireResponse<'_> {
    WireResponse {
        predictions: Some(response.predictions.iter().map(WirePrediction::from).collect()),
        recipes: Some(WireRecipes(&response.recipes)),
    }
}

pub fn assemble_predictions(predictions: &[Prediction]) -> WireResponse<'_> {
    WireResponse {
        predictions: Some(predictions.iter().map(WirePrediction::from).collect()),
        recipes: None,
    }
}

pub fn assemble_recipes(recipes: &RecipeSet) -> WireResponse<'_> {
    WireResponse {
        predictions: None,
        recipes: Some(WireRecipes(recipes)),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// A failed request: the status an HTTP layer would send, plus the body.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    pub status: u16,
    pub body: ErrorBody,
}

impl ErrorResponse {
    /// Build the caller-facing error. The full detail is always logged.
    pub fn from_error(err: &PredictError, expose_details: bool) -> Self {
        let status = err.status_code();
        error!(status, error = %err, "Request failed");

        Self {
            status,
            body: ErrorBody {
                error: err.public_message(expose_details),
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.body)
    }
}
