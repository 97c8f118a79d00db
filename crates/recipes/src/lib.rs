//! # Recipes Crate
//!
//! Clients for the external services that supply recipe content.
//!
//! ## Components
//!
//! ### FatSecret (catalog)
//! Curated recipes from the FatSecret Platform API:
//! - OAuth2 client-credentials token, cached until expiry
//! - `recipes.search.v3` for ids, `recipe.get.v2` for the full recipe
//!
//! ### Gemini (generative)
//! Recipes written by a language model under a strict JSON schema:
//! - One `generateContent` call per search
//! - Generated text parsed directly into [`Recipe`]
//!
//! Both implement [`RecipeProvider`], so callers never know which one
//! they are talking to. Both wrap their network calls in a [`RetryPolicy`].
//!
//! ## Example Usage
//!
//! ```ignore
//! use recipes::{FatSecretConfig, FatSecretProvider, RecipeProvider, RetryPolicy};
//!
//! let provider = FatSecretProvider::new(
//!     FatSecretConfig::new(client_id, client_secret),
//!     RetryPolicy::default(),
//! )?;
//!
//! for recipe in provider.search("apple pie", 2).await? {
//!     println!("{} ({} steps)", recipe.name, recipe.instructions.len());
//! }
//! ```

use async_trait::async_trait;

pub mod error;
pub mod fatsecret;
pub mod gemini;
pub mod retry;
pub mod types;

pub use error::ProviderError;
pub use fatsecret::{FatSecretConfig, FatSecretProvider};
pub use gemini::{GeminiConfig, GeminiProvider};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use types::Recipe;

/// A source of recipes for a free-text query.
///
/// Implementations handle their own authentication and retries; an `Err`
/// means the lookup is over and further attempts by the caller are unlikely
/// to help.
#[async_trait]
pub trait RecipeProvider: Send + Sync {
    /// Short provider name for logs
    fn name(&self) -> &str;

    /// Fetch up to `max_results` recipes matching `query`.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Recipe>, ProviderError>;
}
