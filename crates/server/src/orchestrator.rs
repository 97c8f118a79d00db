//! # Food Orchestrator
//!
//! This module coordinates one prediction request:
//! 1. Check the upload and classify it once (on the blocking pool)
//! 2. Select the top labels for recipe lookup
//! 3. Look up recipes for every selected label concurrently
//! 4. Record each lookup's outcome against its query, in rank order
//!
//! Classification failures fail the request. Lookup failures never do:
//! each label's result is captured on its own, so one provider error
//! leaves the other labels' recipes intact.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::time::{self, Instant as Deadline};
use tracing::{error, info, warn};

use classifier::{ImageClassifier, Prediction};
use pipeline::select_labels;
use recipes::RecipeProvider;

use crate::config::PipelineConfig;
use crate::error::PredictError;
use crate::types::{PredictionResponse, RecipeLookup, RecipeSet};

/// Main orchestrator that coordinates classification and recipe lookup
///
/// Cloning is cheap; the classifier and provider are shared.
#[derive(Clone)]
pub struct FoodOrchestrator {
    classifier: Arc<dyn ImageClassifier>,
    provider: Arc<dyn RecipeProvider>,
    config: PipelineConfig,
}

impl FoodOrchestrator {
    /// Create an orchestrator from components that are already loaded.
    pub fn new(
        classifier: Arc<dyn ImageClassifier>,
        provider: Arc<dyn RecipeProvider>,
        config: PipelineConfig,
    ) -> Self {
        if config.lookup_labels > config.top_k {
            warn!(
                "lookup_labels ({}) exceeds top_k ({}); at most {} labels will be looked up",
                config.lookup_labels, config.top_k, config.top_k
            );
        }
        if config.top_k > classifier.num_classes() {
            warn!(
                "top_k ({}) exceeds the {} classes the model knows; predictions will be capped",
                config.top_k,
                classifier.num_classes()
            );
        }
        info!(
            classes = classifier.num_classes(),
            provider = provider.name(),
            "Orchestrator ready"
        );

        Self {
            classifier,
            provider,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Main entry point: classify an image and fetch recipes for it
    ///
    /// # Returns
    /// The ranked predictions plus one recipe entry per selected label.
    /// Lookup failures appear as error entries, not as an `Err`.
    pub async fn handle_request(&self, image_path: &Path) -> Result<PredictionResponse, PredictError> {
        let start_time = Instant::now();
        let deadline = Deadline::now() + self.config.request_deadline();

        let predictions = self.classify(image_path, deadline).await?;
        info!(
            "Classified {} as {:?}",
            image_path.display(),
            predictions
                .iter()
                .map(|p| format!("{} ({:.3})", p.label, p.confidence))
                .collect::<Vec<_>>()
        );

        let selected = select_labels(&predictions, self.config.lookup_labels);
        info!(
            "Selected {} of {} labels for recipe lookup",
            selected.len(),
            predictions.len()
        );

        let lookups = join_all(
            selected
                .iter()
                .map(|label| self.lookup_with_deadline(&label.query, deadline)),
        )
        .await;

        // join_all keeps input order, so entries follow label rank
        let recipes: RecipeSet = selected
            .into_iter()
            .map(|label| label.query)
            .zip(lookups)
            .collect();

        let failed = recipes.iter().filter(|(_, lookup)| lookup.is_failed()).count();
        info!(
            "Request for {} finished in {:.2?} ({} lookups, {} failed)",
            image_path.display(),
            start_time.elapsed(),
            recipes.len(),
            failed
        );

        Ok(PredictionResponse {
            predictions,
            recipes,
        })
    }

    async fn classify(&self, image_path: &Path, deadline: Deadline) -> Result<Vec<Prediction>, PredictError> {
        classify_until(
            self.classifier.clone(),
            image_path,
            self.config.top_k,
            deadline,
            self.config.request_deadline(),
        )
        .await
    }

    /// One label's lookup, cut short if the request deadline passes first.
    async fn lookup_with_deadline(&self, query: &str, deadline: Deadline) -> RecipeLookup {
        let lookup = lookup_recipes(
            self.provider.as_ref(),
            query,
            self.config.recipes_per_label,
            self.config.lookup_timeout(),
        );

        match time::timeout_at(deadline, lookup).await {
            Ok(lookup) => lookup,
            Err(_) => {
                warn!(stage = "lookup", query, "Request deadline reached during recipe lookup");
                RecipeLookup::failed("request deadline exceeded")
            }
        }
    }
}

/// Classify one upload on the blocking pool, giving up after `budget`.
pub async fn classify_image(
    classifier: Arc<dyn ImageClassifier>,
    image_path: &Path,
    top_k: usize,
    budget: Duration,
) -> Result<Vec<Prediction>, PredictError> {
    classify_until(classifier, image_path, top_k, Deadline::now() + budget, budget).await
}

async fn classify_until(
    classifier: Arc<dyn ImageClassifier>,
    image_path: &Path,
    top_k: usize,
    deadline: Deadline,
    budget: Duration,
) -> Result<Vec<Prediction>, PredictError> {
    ensure_upload_present(image_path)?;

    let path = image_path.to_path_buf();
    let task = tokio::task::spawn_blocking(move || classifier.classify(&path, top_k));

    let result = match time::timeout_at(deadline, task).await {
        Err(_) => Err(PredictError::DeadlineExceeded(budget)),
        Ok(Err(join_err)) => Err(PredictError::Unexpected(format!(
            "classification task failed: {}",
            join_err
        ))),
        Ok(Ok(classified)) => classified.map_err(PredictError::from),
    };

    if let Err(err) = &result {
        error!(stage = "classify", image = %image_path.display(), error = %err, "Classification failed");
    }
    result
}

/// Run one provider search and turn its outcome into a [`RecipeLookup`].
///
/// Never fails: provider errors and timeouts become `RecipeLookup::Failed`.
/// At most `max_results` recipes are kept.
pub async fn lookup_recipes(
    provider: &dyn RecipeProvider,
    query: &str,
    max_results: usize,
    lookup_timeout: Duration,
) -> RecipeLookup {
    let start = Instant::now();

    match time::timeout(lookup_timeout, provider.search(query, max_results)).await {
        Ok(Ok(mut recipes)) => {
            recipes.truncate(max_results);
            info!(
                query,
                provider = provider.name(),
                recipes = recipes.len(),
                elapsed = ?start.elapsed(),
                "Recipe lookup succeeded"
            );
            RecipeLookup::Found(recipes)
        }
        Ok(Err(err)) => {
            warn!(stage = "lookup", query, provider = provider.name(), error = %err, "Recipe lookup failed");
            RecipeLookup::failed(err.to_string())
        }
        Err(_) => {
            warn!(stage = "lookup", query, "Recipe lookup timed out after {:?}", lookup_timeout);
            RecipeLookup::failed(format!("lookup timed out after {:?}", lookup_timeout))
        }
    }
}

/// Reject a missing or zero-byte upload before any work is done.
fn ensure_upload_present(image_path: &Path) -> Result<(), PredictError> {
    let metadata = fs::metadata(image_path)
        .map_err(|e| PredictError::InvalidImage(format!("cannot read upload: {}", e)))?;

    if !metadata.is_file() {
        return Err(PredictError::InvalidImage("upload is not a file".into()));
    }
    if metadata.len() == 0 {
        return Err(PredictError::InvalidImage("file is empty".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use classifier::ClassifierError;
    use recipes::{ProviderError, Recipe};
    use std::path::PathBuf;
    use std::sync::Mutex;

    // ============================================================================
    // Test Fixtures
    // ============================================================================

    /// Classifier returning a fixed ranking for any non-empty file
    struct FixedClassifier {
        ranking: Vec<Prediction>,
    }

    impl ImageClassifier for FixedClassifier {
        fn classify(&self, _image_path: &Path, top_k: usize) -> classifier::Result<Vec<Prediction>> {
            Ok(self.ranking.iter().take(top_k).cloned().collect())
        }

        fn num_classes(&self) -> usize {
            self.ranking.len()
        }
    }

    struct BrokenClassifier;

    impl ImageClassifier for BrokenClassifier {
        fn classify(&self, image_path: &Path, _top_k: usize) -> classifier::Result<Vec<Prediction>> {
            Err(ClassifierError::InvalidImage {
                path: image_path.to_path_buf(),
                reason: "not a JPEG".into(),
            })
        }

        fn num_classes(&self) -> usize {
            0
        }
    }

    /// Provider that records calls and fails for configured queries
    #[derive(Default)]
    struct StubProvider {
        calls: Mutex<Vec<(String, usize)>>,
        failing: Vec<String>,
        slow: Vec<String>,
    }

    #[async_trait]
    impl RecipeProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Recipe>, ProviderError> {
            self.calls
                .lock()
                .unwrap()
                .push((query.to_string(), max_results));

            if self.slow.iter().any(|q| q == query) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if self.failing.iter().any(|q| q == query) {
                return Err(ProviderError::RetriesExhausted {
                    attempts: 5,
                    last: Box::new(ProviderError::Network("connection refused".into())),
                });
            }

            // One more than asked for, to check truncation
            Ok((0..=max_results)
                .map(|i| {
                    Recipe::new(
                        format!("{} #{}", query, i + 1),
                        vec!["salt".into()],
                        vec!["cook".into()],
                    )
                })
                .collect())
        }
    }

    fn ranking() -> Vec<Prediction> {
        vec![
            Prediction::new("pizza", 0.85),
            Prediction::new("burger", 0.10),
            Prediction::new("hot_dog", 0.03),
        ]
    }

    fn orchestrator_with(provider: Arc<StubProvider>) -> FoodOrchestrator {
        FoodOrchestrator::new(
            Arc::new(FixedClassifier { ranking: ranking() }),
            provider,
            PipelineConfig::default(),
        )
    }

    fn image_file(contents: &[u8]) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("upload.jpg");
        fs::write(&path, contents).expect("Failed to write upload");
        (dir, path)
    }

    // ============================================================================
    // Unit Tests: handle_request
    // ============================================================================

    #[tokio::test]
    async fn test_end_to_end_pizza_burger() {
        let provider = Arc::new(StubProvider::default());
        let orchestrator = orchestrator_with(provider.clone());
        let (_dir, path) = image_file(b"jpeg bytes");

        let response = orchestrator.handle_request(&path).await.expect("request failed");

        assert_eq!(response.predictions, ranking());
        let calls = provider.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![("pizza".to_string(), 2), ("burger".to_string(), 2)]
        );

        let keys: Vec<&str> = response.recipes.keys().collect();
        assert_eq!(keys, vec!["pizza", "burger"]);
        for (_, lookup) in response.recipes.iter() {
            let recipes = lookup.recipes().expect("lookup should succeed");
            assert_eq!(recipes.len(), 2, "Should truncate to recipes_per_label");
        }
    }

    #[tokio::test]
    async fn test_failure_isolated_per_label() {
        let provider = Arc::new(StubProvider {
            failing: vec!["pizza".into()],
            ..Default::default()
        });
        let orchestrator = orchestrator_with(provider.clone());
        let (_dir, path) = image_file(b"jpeg bytes");

        let response = orchestrator.handle_request(&path).await.expect("request should survive");

        match response.recipes.get("pizza") {
            Some(RecipeLookup::Failed { error }) => assert!(error.contains("connection refused")),
            other => panic!("expected error marker for pizza, got {:?}", other),
        }
        assert_eq!(response.recipes.get("burger").unwrap().recipes().unwrap().len(), 2);
        assert_eq!(provider.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_upload_rejected_before_lookup() {
        let provider = Arc::new(StubProvider::default());
        let orchestrator = orchestrator_with(provider.clone());
        let (_dir, path) = image_file(b"");

        let err = orchestrator.handle_request(&path).await.unwrap_err();

        assert!(matches!(err, PredictError::InvalidImage(_)));
        assert_eq!(err.status_code(), 400);
        assert!(provider.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_classifier_failure_fails_request() {
        let provider = Arc::new(StubProvider::default());
        let orchestrator = FoodOrchestrator::new(
            Arc::new(BrokenClassifier),
            provider.clone(),
            PipelineConfig::default(),
        );
        let (_dir, path) = image_file(b"png bytes");

        let err = orchestrator.handle_request(&path).await.unwrap_err();

        assert_eq!(err, PredictError::InvalidImage("not a JPEG".into()));
        assert!(provider.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_labels_independent_of_top_k() {
        let provider = Arc::new(StubProvider::default());
        let config = PipelineConfig {
            top_k: 3,
            lookup_labels: 3,
            recipes_per_label: 1,
            ..Default::default()
        };
        let orchestrator = FoodOrchestrator::new(
            Arc::new(FixedClassifier { ranking: ranking() }),
            provider.clone(),
            config,
        );
        let (_dir, path) = image_file(b"jpeg bytes");

        let response = orchestrator.handle_request(&path).await.unwrap();

        let keys: Vec<&str> = response.recipes.keys().collect();
        assert_eq!(keys, vec!["pizza", "burger", "hot dog"]);
        assert_eq!(response.predictions.len(), 3);
    }

    #[tokio::test]
    async fn test_slow_lookup_times_out_without_blocking_others() {
        let provider = Arc::new(StubProvider {
            slow: vec!["pizza".into()],
            ..Default::default()
        });
        let config = PipelineConfig {
            lookup_timeout_secs: 1,
            ..Default::default()
        };
        let orchestrator = FoodOrchestrator::new(
            Arc::new(FixedClassifier { ranking: ranking() }),
            provider.clone(),
            config,
        );
        let (_dir, path) = image_file(b"jpeg bytes");

        let response = orchestrator.handle_request(&path).await.unwrap();

        match response.recipes.get("pizza") {
            Some(RecipeLookup::Failed { error }) => assert!(error.contains("timed out")),
            other => panic!("expected timeout marker, got {:?}", other),
        }
        assert!(!response.recipes.get("burger").unwrap().is_failed());
    }

    #[tokio::test]
    async fn test_lookup_recipes_direct() {
        let provider = StubProvider {
            failing: vec!["kimchi".into()],
            ..Default::default()
        };

        let found = lookup_recipes(&provider, "apple pie", 1, Duration::from_secs(5)).await;
        assert_eq!(found.recipes().unwrap().len(), 1);
        assert_eq!(found.recipes().unwrap()[0].name, "apple pie #1");

        let failed = lookup_recipes(&provider, "kimchi", 1, Duration::from_secs(5)).await;
        assert!(failed.is_failed());
        assert_eq!(provider.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_classify_image_needs_no_provider() {
        let (_dir, path) = image_file(b"jpeg bytes");

        let predictions = classify_image(
            Arc::new(FixedClassifier { ranking: ranking() }),
            &path,
            2,
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[0].label, "pizza");
    }

    #[tokio::test]
    async fn test_classify_image_missing_file() {
        let err = classify_image(
            Arc::new(FixedClassifier { ranking: ranking() }),
            Path::new("/nonexistent/upload.jpg"),
            3,
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PredictError::InvalidImage(_)));
    }
}
