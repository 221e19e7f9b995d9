//! Configuration module for loading environment variables and settings.

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Azure OpenAI API version used for every image generation request.
pub const API_VERSION: &str = "2024-02-01";

/// Deployment name reported at startup when none is configured.
pub const DEFAULT_DEPLOYMENT_NAME: &str = "dalle3";

/// Directory, relative to the working directory, that holds generated artifacts.
pub const DEFAULT_IMAGES_DIR: &str = "images";

/// Default timeout for outbound HTTP requests, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Environment variables consulted for the API key, in priority order.
pub const API_KEY_VARS: &[&str] = &["API_KEY", "AZURE_OPENAI_API_KEY"];

/// Environment variables consulted for the API endpoint, in priority order.
pub const API_ENDPOINT_VARS: &[&str] = &["API_ENDPOINT", "AZURE_OPENAI_ENDPOINT"];

/// Environment variables consulted for the deployment name, in priority order.
pub const DEPLOYMENT_NAME_VARS: &[&str] = &["DEPLOYMENT_NAME", "AZURE_OPENAI_DALLE_DEPLOYMENT"];

const IMAGES_DIR_VARS: &[&str] = &["IMAGES_DIR"];

const REQUEST_TIMEOUT_VARS: &[&str] = &["REQUEST_TIMEOUT_SECS"];

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// API key sent with every image generation request (required)
    pub api_key: String,
    /// Azure OpenAI resource endpoint, e.g. `https://my-resource.openai.azure.com` (required)
    pub api_endpoint: String,
    /// Deployment name, informational only
    pub deployment_name: String,
    /// API protocol version
    pub api_version: String,
    /// Base directory for generated images and metadata
    pub images_dir: PathBuf,
    /// Timeout for outbound HTTP requests, in seconds
    pub request_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables and .env file.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingEnvVar` naming every required variable that is
    /// unset or empty, or `ConfigError::InvalidValue` for unparseable settings.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve configuration through an arbitrary variable lookup.
    ///
    /// Empty values are treated the same as unset ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first_set = |names: &[&str]| {
            names
                .iter()
                .filter_map(|name| lookup(*name))
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty())
        };

        let api_key = first_set(API_KEY_VARS);
        let api_endpoint = first_set(API_ENDPOINT_VARS);

        let mut missing = Vec::new();
        if api_key.is_none() {
            missing.push(API_KEY_VARS[0]);
        }
        if api_endpoint.is_none() {
            missing.push(API_ENDPOINT_VARS[0]);
        }
        let (Some(api_key), Some(api_endpoint)) = (api_key, api_endpoint) else {
            return Err(ConfigError::missing_env_var(missing.join(", ")));
        };

        let deployment_name = first_set(DEPLOYMENT_NAME_VARS)
            .unwrap_or_else(|| DEFAULT_DEPLOYMENT_NAME.to_string());

        let images_dir = first_set(IMAGES_DIR_VARS)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_IMAGES_DIR));
        let images_dir = absolute_dir(&images_dir)?;

        let request_timeout_secs = match first_set(REQUEST_TIMEOUT_VARS) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::invalid_value(
                        "REQUEST_TIMEOUT_SECS",
                        format!("expected a positive number of seconds, got '{}'", raw),
                    ));
                }
            },
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        Ok(Self {
            api_key,
            api_endpoint,
            deployment_name,
            api_version: API_VERSION.to_string(),
            images_dir,
            request_timeout_secs,
        })
    }

    /// Replace the artifact directory, resolving it against the working directory.
    pub fn with_images_dir(mut self, dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        self.images_dir = absolute_dir(dir.as_ref())?;
        Ok(self)
    }

    /// Get the image generations URL for a deployment.
    pub fn image_generations_endpoint(&self, deployment: &str) -> String {
        format!(
            "{}/openai/deployments/{}/images/generations?api-version={}",
            self.api_endpoint.trim_end_matches('/'),
            deployment,
            self.api_version
        )
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("api_endpoint", &self.api_endpoint)
            .field("deployment_name", &self.deployment_name)
            .field("api_version", &self.api_version)
            .field("images_dir", &self.images_dir)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

fn absolute_dir(dir: &Path) -> Result<PathBuf, ConfigError> {
    std::path::absolute(dir)
        .map_err(|e| ConfigError::invalid_value("IMAGES_DIR", format!("{}: {}", dir.display(), e)))
}
