//! Error types for recipe providers.

use reqwest::StatusCode;
use thiserror::Error;

/// Longest response body kept in an error message
const BODY_SNIPPET_LEN: usize = 300;

/// Errors that can occur while fetching recipes
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Credentials or endpoints are missing or invalid
    #[error("Provider not configured: {0}")]
    Config(String),

    /// The credential request was rejected
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A request was rejected because the access token expired or was revoked
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Connection, DNS or transport failure
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The provider answered with an error payload
    #[error("Provider error {code}: {message}")]
    Api { code: i64, message: String },

    /// The response was not the document we expected
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// All attempts failed; `last` is the final failure
    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<ProviderError>,
    },
}

impl ProviderError {
    /// Whether a fresh attempt could succeed.
    ///
    /// Rate limiting, server errors, transport failures, expired tokens and
    /// malformed payloads are transient. Client errors, rejected credentials
    /// and provider error payloads are not.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Network(_)
            | ProviderError::Timeout(_)
            | ProviderError::Unauthorized(_)
            | ProviderError::Malformed(_) => true,
            ProviderError::Http { status, .. } => *status == 429 || *status >= 500,
            ProviderError::Config(_)
            | ProviderError::Auth(_)
            | ProviderError::Api { .. }
            | ProviderError::RetriesExhausted { .. } => false,
        }
    }

    /// Classify a reqwest failure.
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(err.to_string())
        } else if err.is_decode() {
            ProviderError::Malformed(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }

    /// Error for a non-success status, keeping a short body excerpt.
    pub(crate) fn from_status(status: StatusCode, body: &str) -> Self {
        ProviderError::Http {
            status: status.as_u16(),
            body: snippet(body),
        }
    }
}

pub(crate) fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_SNIPPET_LEN) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ProviderError::Network("reset".into()).is_transient());
        assert!(ProviderError::Malformed("not json".into()).is_transient());
        assert!(ProviderError::Http { status: 503, body: String::new() }.is_transient());
        assert!(ProviderError::Http { status: 429, body: String::new() }.is_transient());

        assert!(!ProviderError::Http { status: 400, body: String::new() }.is_transient());
        assert!(!ProviderError::Http { status: 404, body: String::new() }.is_transient());
        assert!(!ProviderError::Auth("bad secret".into()).is_transient());
        assert!(!ProviderError::Api { code: 2, message: "bad".into() }.is_transient());
    }

    #[test]
    fn test_snippet_truncates_long_bodies() {
        let long = "x".repeat(1000);
        let cut = snippet(&long);
        assert_eq!(cut.len(), BODY_SNIPPET_LEN + 3);
        assert!(cut.ends_with("..."));

        assert_eq!(snippet("  short  "), "short");
    }
}
