//! Recipe data returned by every provider.

use serde::{Deserialize, Serialize};

/// A complete recipe.
///
/// All three fields are required when deserializing; a payload missing any
/// of them fails to parse instead of producing a partial recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
}

impl Recipe {
    pub fn new(
        name: impl Into<String>,
        ingredients: Vec<String>,
        instructions: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            ingredients,
            instructions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_complete_recipe() {
        let recipe: Recipe = serde_json::from_str(
            r#"{"name": "Margherita", "ingredients": ["dough", "basil"], "instructions": ["Bake"]}"#,
        )
        .unwrap();

        assert_eq!(recipe.name, "Margherita");
        assert_eq!(recipe.ingredients.len(), 2);
    }

    #[test]
    fn test_missing_instructions_is_an_error() {
        let result: Result<Recipe, _> =
            serde_json::from_str(r#"{"name": "Margherita", "ingredients": ["dough"]}"#);
        assert!(result.is_err());
    }
}
