//! Startup wiring: build the classifier and the recipe provider from config.
//!
//! Both are created once before any request is served and shared read-only
//! afterwards.

use std::sync::Arc;
use std::time::Duration;

use classifier::{ClassifierError, OnnxClassifier};
use recipes::{
    FatSecretConfig, FatSecretProvider, GeminiConfig, GeminiProvider, ProviderError,
    RecipeProvider,
};
use tracing::info;

use crate::config::{AppConfig, Credentials, ModelConfig, ProviderKind};

/// Load the ONNX classifier and its label table.
///
/// A failure here is fatal for the process.
pub fn load_classifier(config: &ModelConfig) -> Result<OnnxClassifier, ClassifierError> {
    OnnxClassifier::from_paths(&config.model_path, &config.labels_path, config.input_size())
}

/// Build the configured recipe provider.
///
/// # Errors
/// `ProviderError::Config` when the credentials for the selected provider
/// are missing.
pub fn build_provider(
    config: &AppConfig,
    credentials: &Credentials,
) -> Result<Arc<dyn RecipeProvider>, ProviderError> {
    let provider_config = &config.provider;
    let timeout = Duration::from_secs(provider_config.request_timeout_secs);
    let retry = config.retry.policy();

    let provider: Arc<dyn RecipeProvider> = match provider_config.kind {
        ProviderKind::FatSecret => {
            let (Some(id), Some(secret)) = (
                credentials.fatsecret_client_id.as_deref(),
                credentials.fatsecret_client_secret.as_deref(),
            ) else {
                return Err(ProviderError::Config(
                    "set FATSECRET_CLIENT_ID and FATSECRET_CLIENT_SECRET".into(),
                ));
            };

            let mut fatsecret = FatSecretConfig::new(id, secret);
            fatsecret.must_have_images = provider_config.must_have_images;
            fatsecret.request_timeout = timeout;
            if let Some(url) = &provider_config.fatsecret_token_url {
                fatsecret.token_url = url.clone();
            }
            if let Some(url) = &provider_config.fatsecret_api_url {
                fatsecret.api_url = url.clone();
            }
            Arc::new(FatSecretProvider::new(fatsecret, retry)?)
        }
        ProviderKind::Gemini => {
            let Some(key) = credentials.gemini_api_key.as_deref() else {
                return Err(ProviderError::Config("set GEMINI_API_KEY".into()));
            };

            let mut gemini = GeminiConfig::new(key);
            gemini.request_timeout = timeout;
            if let Some(model) = &provider_config.gemini_model {
                gemini.model = model.clone();
            }
            if let Some(url) = &provider_config.gemini_base_url {
                gemini.base_url = url.clone();
            }
            Arc::new(GeminiProvider::new(gemini, retry)?)
        }
    };

    info!("Using recipe provider: {}", provider.name());
    Ok(provider)
}
