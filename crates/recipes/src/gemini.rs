//! Gemini generative recipe provider
//!
//! Asks the model for recipes under a strict JSON response schema, so the
//! generated text parses straight into [`Recipe`]s.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::ProviderError;
use crate::retry::RetryPolicy;
use crate::types::Recipe;
use crate::RecipeProvider;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Connection settings for [`GeminiProvider`]
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub request_timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Gemini recipe provider
pub struct GeminiProvider {
    http_client: reqwest::Client,
    config: GeminiConfig,
    retry: RetryPolicy,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig, retry: RetryPolicy) -> Result<Self, ProviderError> {
        if config.api_key.trim().is_empty() {
            return Err(ProviderError::Config("Gemini API key is required".into()));
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ProviderError::Config(e.to_string()))?;

        Ok(Self {
            http_client,
            config,
            retry,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    async fn generate_once(&self, query: &str, max_results: usize) -> Result<Vec<Recipe>, ProviderError> {
        let response = self
            .http_client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request_body(query, max_results))
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let status = response.status();
        let body = response.text().await.map_err(ProviderError::from_reqwest)?;

        if !status.is_success() {
            return Err(ProviderError::from_status(status, &body));
        }

        let mut recipes = parse_generated(&body)?;
        debug!(query, generated = recipes.len(), "Gemini returned recipes");

        recipes.truncate(max_results);
        Ok(recipes)
    }
}

#[async_trait]
impl RecipeProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Recipe>, ProviderError> {
        if max_results == 0 {
            return Ok(Vec::new());
        }

        self.retry
            .run("gemini generate", |_| self.generate_once(query, max_results))
            .await
    }
}

fn request_body(query: &str, max_results: usize) -> Value {
    let prompt = format!(
        "Provide exactly {} recipes for '{}'. Write them so a beginner can follow along. \
         Each recipe needs a 'name', an 'ingredients' list and an 'instructions' list. \
         Respond with valid JSON only.",
        max_results, query
    );

    json!({
        "contents": [
            { "parts": [{ "text": prompt }] }
        ],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "ingredients": { "type": "ARRAY", "items": { "type": "STRING" } },
                        "instructions": { "type": "ARRAY", "items": { "type": "STRING" } }
                    },
                    "required": ["name", "ingredients", "instructions"],
                    "propertyOrdering": ["name", "ingredients", "instructions"]
                }
            }
        }
    })
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

fn parse_generated(body: &str) -> Result<Vec<Recipe>, ProviderError> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Malformed(format!("generate response: {}", e)))?;

    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .ok_or_else(|| ProviderError::Malformed("response has no generated text".into()))?;

    let recipes: Vec<Recipe> = serde_json::from_str(&text)
        .map_err(|e| ProviderError::Malformed(format!("generated recipes: {}", e)))?;

    if let Some(unnamed) = recipes.iter().position(|r| r.name.trim().is_empty()) {
        return Err(ProviderError::Malformed(format!("recipe {} has no name", unnamed)));
    }

    Ok(recipes)
}
