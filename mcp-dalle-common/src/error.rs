//! Error types for the common library.
//!
//! This module provides a unified error hierarchy using `thiserror` for consistent
//! error handling across the MCP DALL-E server.
//!
//! # Error Categories
//!
//! - `ConfigError`: Missing or invalid configuration (fatal at startup)
//! - `Error::Validation`: Caller-supplied arguments that break the tool contract
//! - `Error::Api`: Image generation API failures (includes endpoint and status)
//! - `Error::Persistence`: Failures saving generated artifacts locally
//! - `Error::Io` / `Error::Json`: Low-level file system and serialization errors

use thiserror::Error;

/// Unified error type for the common library.
///
/// The variants are graduated by who has to act on them: validation errors are
/// the caller's, configuration errors are the deployment's, API errors are
/// reported back as data, and persistence errors are only ever logged.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration errors (missing env vars, invalid values)
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// API errors with endpoint and HTTP status context
    ///
    /// A `status_code` of 0 means no HTTP response was received.
    #[error("API error for {endpoint} (HTTP {status_code}): {message}")]
    Api {
        /// The API endpoint that was called
        endpoint: String,
        /// HTTP status code returned by the API
        status_code: u16,
        /// Error message from the API or describing the failure
        message: String,
    },

    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Local artifact persistence errors
    #[error("Failed to persist {path}: {message}")]
    Persistence {
        /// File, directory, or URL involved in the failed step
        path: String,
        /// Description of the failure
        message: String,
    },

    /// File system I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a new API error with endpoint, status code, and message.
    ///
    /// # Example
    ///
    /// ```
    /// use mcp_dalle_common::error::Error;
    ///
    /// let err = Error::api(
    ///     "https://example.openai.azure.com/openai/deployments/dalle3/images/generations",
    ///     429,
    ///     "Rate limit exceeded"
    /// );
    /// assert!(err.to_string().contains("openai.azure.com"));
    /// assert!(err.to_string().contains("429"));
    /// ```
    pub fn api(endpoint: impl Into<String>, status_code: u16, message: impl Into<String>) -> Self {
        Error::Api {
            endpoint: endpoint.into(),
            status_code,
            message: message.into(),
        }
    }

    /// Create a new validation error.
    ///
    /// # Example
    ///
    /// ```
    /// use mcp_dalle_common::error::Error;
    ///
    /// let err = Error::validation("n must be between 1 and 10");
    /// assert!(err.to_string().contains("between 1 and 10"));
    /// ```
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// Create a new persistence error.
    pub fn persistence(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Persistence {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether this error is a caller-side argument violation.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

/// Configuration errors.
///
/// These errors occur when loading or validating configuration from
/// environment variables or the `.env` file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// One or more required environment variables are not set
    #[error("Missing required environment variables: {0}")]
    MissingEnvVar(String),

    /// An environment variable has an invalid value
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl ConfigError {
    /// Create a new missing environment variable error.
    pub fn missing_env_var(name: impl Into<String>) -> Self {
        ConfigError::MissingEnvVar(name.into())
    }

    /// Create a new invalid value error.
    pub fn invalid_value(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue(name.into(), reason.into())
    }
}
