//! Application configuration.
//!
//! Settings come from an optional TOML file with `[model]`, `[pipeline]`,
//! `[provider]`, `[retry]` and `[response]` sections; every key has a
//! default. Provider credentials are never read from the file, they are
//! passed in separately as [`Credentials`].
//!
//! ```toml
//! [model]
//! model_path = "models/food101.onnx"
//! labels_path = "models/class_labels.json"
//!
//! [pipeline]
//! top_k = 3
//! lookup_labels = 2
//! recipes_per_label = 2
//!
//! [provider]
//! kind = "gemini"
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use classifier::InputSize;
use recipes::RetryPolicy;
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub pipeline: PipelineConfig,
    pub provider: ProviderConfig,
    pub retry: RetrySettings,
    pub response: ResponseConfig,
}

impl AppConfig {
    /// Load from `path`, or use defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                toml::from_str(&content).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            None => AppConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pipeline.validate()?;
        self.retry.validate()?;
        if self.model.input_width == 0 || self.model.input_height == 0 {
            return Err(invalid("model.input_width/input_height", "must be at least 1"));
        }
        // reqwest treats a zero timeout as expiring immediately
        if self.provider.request_timeout_secs == 0 {
            return Err(invalid("provider.request_timeout_secs", "must be at least 1 second"));
        }
        Ok(())
    }
}

/// Where the classifier and its labels live
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub model_path: PathBuf,
    pub labels_path: PathBuf,
    pub input_width: u32,
    pub input_height: u32,
}

impl ModelConfig {
    pub fn input_size(&self) -> InputSize {
        InputSize {
            width: self.input_width,
            height: self.input_height,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/food101.onnx"),
            labels_path: PathBuf::from("models/class_labels.json"),
            input_width: 224,
            input_height: 224,
        }
    }
}

/// Per-request pipeline parameters.
///
/// `top_k` (how many predictions to report) and `lookup_labels` (how many
/// of them get a recipe lookup) are independent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub top_k: usize,
    pub lookup_labels: usize,
    pub recipes_per_label: usize,
    pub lookup_timeout_secs: u64,
    pub request_deadline_secs: u64,
}

impl PipelineConfig {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    pub fn request_deadline(&self) -> Duration {
        Duration::from_secs(self.request_deadline_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_k == 0 {
            return Err(invalid("pipeline.top_k", "must be at least 1"));
        }
        if self.recipes_per_label == 0 {
            return Err(invalid("pipeline.recipes_per_label", "must be at least 1"));
        }
        if self.lookup_timeout_secs == 0 || self.request_deadline_secs == 0 {
            return Err(invalid("pipeline timeouts", "must be at least 1 second"));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            lookup_labels: 2,
            recipes_per_label: 2,
            lookup_timeout_secs: 45,
            request_deadline_secs: 90,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    FatSecret,
    Gemini,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::FatSecret => f.write_str("fatsecret"),
            ProviderKind::Gemini => f.write_str("gemini"),
        }
    }
}

/// Which provider to use and how to reach it
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub request_timeout_secs: u64,
    /// FatSecret: only return recipes with a photo
    pub must_have_images: bool,
    pub fatsecret_token_url: Option<String>,
    pub fatsecret_api_url: Option<String>,
    pub gemini_model: Option<String>,
    pub gemini_base_url: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            request_timeout_secs: 30,
            must_have_images: true,
            fatsecret_token_url: None,
            fatsecret_api_url: None,
            gemini_model: None,
            gemini_base_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub multiplier: u32,
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_delay_ms),
            self.multiplier,
        )
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(invalid("retry.max_attempts", "must be at least 1"));
        }
        if self.multiplier == 0 {
            return Err(invalid("retry.multiplier", "must be at least 1"));
        }
        Ok(())
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 1000,
            multiplier: 2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResponseConfig {
    /// Show internal error details to callers (development only)
    pub expose_error_details: bool,
}

/// Provider secrets, supplied from the environment
#[derive(Clone, Default)]
pub struct Credentials {
    pub fatsecret_client_id: Option<String>,
    pub fatsecret_client_secret: Option<String>,
    pub gemini_api_key: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |v: &Option<String>| if v.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Credentials")
            .field("fatsecret_client_id", &mask(&self.fatsecret_client_id))
            .field("fatsecret_client_secret", &mask(&self.fatsecret_client_secret))
            .field("gemini_api_key", &mask(&self.gemini_api_key))
            .finish()
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
