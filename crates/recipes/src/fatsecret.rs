//! FatSecret Platform API client
//!
//! Catalog-style provider: recipes come from FatSecret's curated database.
//!
//! A search takes two kinds of calls, both authorized with an OAuth2
//! client-credentials bearer token:
//! 1. `recipes.search.v3` to find recipe ids for the query
//! 2. `recipe.get.v2` per hit, for ingredients and directions
//!
//! The token is cached until shortly before it expires and dropped whenever
//! the API answers 401, so the next attempt fetches a new one.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, snippet};
use crate::retry::RetryPolicy;
use crate::types::Recipe;
use crate::RecipeProvider;

pub const TOKEN_URL: &str = "https://oauth.fatsecret.com/connect/token";
pub const API_URL: &str = "https://platform.fatsecret.com/rest/server.api";

/// Largest page `recipes.search.v3` accepts
const MAX_RESULTS_CAP: usize = 50;

/// Refresh this long before the token's stated expiry
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Used when the token response omits `expires_in`
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// Connection settings for [`FatSecretProvider`]
#[derive(Debug, Clone)]
pub struct FatSecretConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
    pub api_url: String,
    /// Only return recipes that have a photo
    pub must_have_images: bool,
    pub request_timeout: Duration,
}

impl FatSecretConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url: TOKEN_URL.to_string(),
            api_url: API_URL.to_string(),
            must_have_images: true,
            request_timeout: Duration::from_secs(30),
        }
    }
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// FatSecret recipe provider
pub struct FatSecretProvider {
    http_client: reqwest::Client,
    config: FatSecretConfig,
    retry: RetryPolicy,
    token: Mutex<Option<CachedToken>>,
}

impl FatSecretProvider {
    pub fn new(config: FatSecretConfig, retry: RetryPolicy) -> Result<Self, ProviderError> {
        if config.client_id.trim().is_empty() || config.client_secret.trim().is_empty() {
            return Err(ProviderError::Config(
                "FatSecret client id and secret are required".into(),
            ));
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ProviderError::Config(e.to_string()))?;

        Ok(Self {
            http_client,
            config,
            retry,
            token: Mutex::new(None),
        })
    }

    /// Return the cached token, requesting a new one if needed.
    ///
    /// The lock is held across the token request so concurrent lookups
    /// share a single refresh.
    async fn access_token(&self) -> Result<String, ProviderError> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.request_token().await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    async fn request_token(&self) -> Result<CachedToken, ProviderError> {
        debug!(url = %self.config.token_url, "Requesting FatSecret access token");

        let response = self
            .http_client
            .post(&self.config.token_url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[("grant_type", "client_credentials"), ("scope", "basic")])
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let status = response.status();
        let body = response.text().await.map_err(ProviderError::from_reqwest)?;

        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            return Err(ProviderError::Auth(format!(
                "token request rejected ({}): {}",
                status.as_u16(),
                snippet(&body)
            )));
        }
        if !status.is_success() {
            return Err(ProviderError::from_status(status, &body));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::Malformed(format!("token response: {}", e)))?;

        let lifetime = token
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);
        info!("Obtained FatSecret access token valid for {:?}", lifetime);

        Ok(CachedToken {
            value: token.access_token,
            expires_at: Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN),
        })
    }

    /// One authorized GET against the REST endpoint, returning the body.
    async fn call_api(&self, token: &str, params: &[(&str, String)]) -> Result<String, ProviderError> {
        let response = self
            .http_client
            .get(&self.config.api_url)
            .bearer_auth(token)
            .query(params)
            .query(&[("format", "json")])
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let status = response.status();
        let body = response.text().await.map_err(ProviderError::from_reqwest)?;

        if status == StatusCode::UNAUTHORIZED {
            self.invalidate_token().await;
            return Err(ProviderError::Unauthorized(snippet(&body)));
        }
        if !status.is_success() {
            return Err(ProviderError::from_status(status, &body));
        }

        Ok(body)
    }

    async fn search_once(&self, query: &str, max_results: usize) -> Result<Vec<Recipe>, ProviderError> {
        let token = self.access_token().await?;

        let body = self
            .call_api(
                &token,
                &[
                    ("method", "recipes.search.v3".to_string()),
                    ("search_expression", query.to_string()),
                    ("max_results", max_results.to_string()),
                    ("must_have_images", self.config.must_have_images.to_string()),
                ],
            )
            .await?;

        let hits = parse_search(&body)?;
        debug!(query, hits = hits.len(), "FatSecret search returned");

        // Transport and auth failures still fail the whole search
        let details = try_join_all(
            hits.iter()
                .take(max_results)
                .map(|hit| self.fetch_recipe(&token, hit)),
        )
        .await?;

        Ok(details.into_iter().flatten().collect())
    }

    /// Fetch one hit's detail. `None` when the catalog entry lacks
    /// ingredients or directions; that hit is skipped.
    async fn fetch_recipe(&self, token: &str, hit: &SearchHit) -> Result<Option<Recipe>, ProviderError> {
        let body = self
            .call_api(
                token,
                &[
                    ("method", "recipe.get.v2".to_string()),
                    ("recipe_id", hit.recipe_id.to_string()),
                ],
            )
            .await?;

        parse_recipe(&body)
    }
}

#[async_trait]
impl RecipeProvider for FatSecretProvider {
    fn name(&self) -> &str {
        "fatsecret"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Recipe>, ProviderError> {
        if max_results == 0 {
            return Ok(Vec::new());
        }
        let max_results = max_results.min(MAX_RESULTS_CAP);

        self.retry
            .run("fatsecret search", |_| self.search_once(query, max_results))
            .await
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

/// FatSecret returns a bare object instead of a one-element array.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

/// Numbers arrive as JSON strings or numbers depending on the endpoint.
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(i64),
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Text(text) => f.write_str(text),
            Scalar::Number(n) => write!(f, "{}", n),
        }
    }
}

impl Scalar {
    fn as_number(&self) -> Option<i64> {
        match self {
            Scalar::Text(text) => text.trim().parse().ok(),
            Scalar::Number(n) => Some(*n),
        }
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    code: Scalar,
    message: String,
}

impl From<ApiErrorBody> for ProviderError {
    fn from(body: ApiErrorBody) -> Self {
        ProviderError::Api {
            code: body.code.as_number().unwrap_or(-1),
            message: body.message,
        }
    }
}

#[derive(Deserialize)]
struct SearchEnvelope {
    recipes: Option<SearchPage>,
    error: Option<ApiErrorBody>,
}

#[derive(Deserialize)]
struct SearchPage {
    recipe: Option<OneOrMany<SearchHit>>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    recipe_id: Scalar,
}

#[derive(Deserialize)]
struct RecipeEnvelope {
    recipe: Option<RecipeDetail>,
    error: Option<ApiErrorBody>,
}

#[derive(Deserialize)]
struct RecipeDetail {
    recipe_id: Option<Scalar>,
    recipe_name: String,
    ingredients: Option<IngredientList>,
    directions: Option<DirectionList>,
}

#[derive(Deserialize)]
struct IngredientList {
    ingredient: OneOrMany<Ingredient>,
}

#[derive(Deserialize)]
struct Ingredient {
    ingredient_description: String,
}

#[derive(Deserialize)]
struct DirectionList {
    direction: OneOrMany<Direction>,
}

#[derive(Deserialize)]
struct Direction {
    direction_number: Option<Scalar>,
    direction_description: String,
}

fn parse_search(body: &str) -> Result<Vec<SearchHit>, ProviderError> {
    let envelope: SearchEnvelope = serde_json::from_str(body)
        .map_err(|e| ProviderError::Malformed(format!("search response: {}", e)))?;

    if let Some(error) = envelope.error {
        return Err(error.into());
    }

    let page = envelope
        .recipes
        .ok_or_else(|| ProviderError::Malformed("search response has no 'recipes' field".into()))?;

    // No `recipe` key means zero results
    Ok(page.recipe.map(OneOrMany::into_vec).unwrap_or_default())
}

/// Parse a `recipe.get.v2` body.
///
/// An unreadable body is `Malformed`. A readable recipe without ingredients
/// or directions is `Ok(None)`; no partial recipe is ever built.
fn parse_recipe(body: &str) -> Result<Option<Recipe>, ProviderError> {
    let envelope: RecipeEnvelope = serde_json::from_str(body)
        .map_err(|e| ProviderError::Malformed(format!("recipe response: {}", e)))?;

    if let Some(error) = envelope.error {
        return Err(error.into());
    }

    let detail = envelope
        .recipe
        .ok_or_else(|| ProviderError::Malformed("recipe response has no 'recipe' field".into()))?;

    let id = detail
        .recipe_id
        .as_ref()
        .map(Scalar::to_string)
        .unwrap_or_else(|| detail.recipe_name.clone());

    let (Some(ingredients), Some(directions)) = (detail.ingredients, detail.directions) else {
        warn!(recipe_id = %id, "Skipping FatSecret recipe without ingredients or directions");
        return Ok(None);
    };

    let ingredients: Vec<String> = ingredients
        .ingredient
        .into_vec()
        .into_iter()
        .map(|i| i.ingredient_description)
        .collect();

    let mut directions = directions.direction.into_vec();
    directions.sort_by_key(|d| {
        d.direction_number
            .as_ref()
            .and_then(Scalar::as_number)
            .unwrap_or(i64::MAX)
    });

    Ok(Some(Recipe {
        name: detail.recipe_name,
        ingredients,
        instructions: directions
            .into_iter()
            .map(|d| d.direction_description)
            .collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_many() {
        let body = r#"{"recipes": {"max_results": "2", "total_results": "40", "page_number": "0",
            "recipe": [{"recipe_id": "101", "recipe_name": "Pizza A"},
                       {"recipe_id": 102, "recipe_name": "Pizza B"}]}}"#;

        let hits = parse_search(body).unwrap();
        let ids: Vec<String> = hits.iter().map(|h| h.recipe_id.to_string()).collect();
        assert_eq!(ids, vec!["101", "102"]);
    }

    #[test]
    fn test_parse_search_single_object() {
        let body = r#"{"recipes": {"recipe": {"recipe_id": "7", "recipe_name": "Only One"}}}"#;
        assert_eq!(parse_search(body).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_search_zero_results() {
        let body = r#"{"recipes": {"max_results": "2", "total_results": "0", "page_number": "0"}}"#;
        assert!(parse_search(body).unwrap().is_empty());
    }

    #[test]
    fn test_parse_search_error_payload() {
        let body = r#"{"error": {"code": 21, "message": "Invalid IP address detected"}}"#;
        assert_eq!(
            parse_search(body).unwrap_err(),
            ProviderError::Api {
                code: 21,
                message: "Invalid IP address detected".into()
            }
        );
    }

    #[test]
    fn test_parse_search_not_json() {
        assert!(matches!(
            parse_search("<html>gateway</html>"),
            Err(ProviderError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_recipe_orders_directions() {
        let body = r#"{"recipe": {
            "recipe_id": "101",
            "recipe_name": "Margherita",
            "ingredients": {"ingredient": [
                {"ingredient_description": "1 pizza dough", "food_name": "Dough"},
                {"ingredient_description": "2 tomatoes"}
            ]},
            "directions": {"direction": [
                {"direction_number": "2", "direction_description": "Bake"},
                {"direction_number": "1", "direction_description": "Top the dough"}
            ]}
        }}"#;

        let recipe = parse_recipe(body).unwrap().expect("complete recipe");
        assert_eq!(recipe.name, "Margherita");
        assert_eq!(recipe.ingredients, vec!["1 pizza dough", "2 tomatoes"]);
        assert_eq!(recipe.instructions, vec!["Top the dough", "Bake"]);
    }

    #[test]
    fn test_parse_recipe_single_direction() {
        let body = r#"{"recipe": {
            "recipe_name": "Toast",
            "ingredients": {"ingredient": {"ingredient_description": "bread"}},
            "directions": {"direction": {"direction_number": "1", "direction_description": "Toast it"}}
        }}"#;

        let recipe = parse_recipe(body).unwrap().expect("complete recipe");
        assert_eq!(recipe.instructions, vec!["Toast it"]);
    }

    #[test]
    fn test_parse_recipe_missing_directions_is_skipped() {
        let body = r#"{"recipe": {
            "recipe_id": "5",
            "recipe_name": "Mystery",
            "ingredients": {"ingredient": [{"ingredient_description": "?"}]}
        }}"#;

        assert_eq!(parse_recipe(body), Ok(None));
    }

    #[test]
    fn test_parse_recipe_unreadable_body_is_malformed() {
        assert!(matches!(
            parse_recipe(r#"{"recipe": {"recipe_id": "5"}}"#),
            Err(ProviderError::Malformed(_))
        ));
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let result = FatSecretProvider::new(FatSecretConfig::new("", "secret"), RetryPolicy::default());
        assert!(matches!(result, Err(ProviderError::Config(_))));
    }
}
