//! Per-request result types.

use classifier::Prediction;
use recipes::Recipe;

/// Outcome of one label's recipe lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum RecipeLookup {
    Found(Vec<Recipe>),
    /// The lookup failed; the message says why
    Failed { error: String },
}

impl RecipeLookup {
    pub fn failed(error: impl Into<String>) -> Self {
        RecipeLookup::Failed {
            error: error.into(),
        }
    }

    pub fn recipes(&self) -> Option<&[Recipe]> {
        match self {
            RecipeLookup::Found(recipes) => Some(recipes),
            RecipeLookup::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RecipeLookup::Failed { .. })
    }
}

/// Lookups keyed by query, in label-rank order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeSet {
    entries: Vec<(String, RecipeLookup)>,
}

impl RecipeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a lookup. A query already present keeps its first entry.
    pub fn insert(&mut self, query: impl Into<String>, lookup: RecipeLookup) {
        let query = query.into();
        if self.get(&query).is_none() {
            self.entries.push((query, lookup));
        }
    }

    pub fn get(&self, query: &str) -> Option<&RecipeLookup> {
        self.entries
            .iter()
            .find(|(key, _)| key == query)
            .map(|(_, lookup)| lookup)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RecipeLookup)> {
        self.entries.iter().map(|(key, lookup)| (key.as_str(), lookup))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<Q: Into<String>> FromIterator<(Q, RecipeLookup)> for RecipeSet {
    fn from_iter<I: IntoIterator<Item = (Q, RecipeLookup)>>(iter: I) -> Self {
        let mut set = RecipeSet::new();
        for (query, lookup) in iter {
            set.insert(query, lookup);
        }
        set
    }
}

/// Everything produced for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResponse {
    pub predictions: Vec<Prediction>,
    pub recipes: RecipeSet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_preserved() {
        let set: RecipeSet = [
            ("zucchini", RecipeLookup::Found(vec![])),
            ("apple pie", RecipeLookup::failed("down")),
            ("miso soup", RecipeLookup::Found(vec![])),
        ]
        .into_iter()
        .collect();

        let keys: Vec<&str> = set.keys().collect();
        assert_eq!(keys, vec!["zucchini", "apple pie", "miso soup"]);
    }

    #[test]
    fn test_duplicate_query_keeps_first() {
        let mut set = RecipeSet::new();
        set.insert("pizza", RecipeLookup::Found(vec![]));
        set.insert("pizza", RecipeLookup::failed("late"));

        assert_eq!(set.len(), 1);
        assert!(!set.get("pizza").unwrap().is_failed());
    }
}
