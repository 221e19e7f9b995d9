//! Remote image generation client.
//!
//! `ImageClient` is the seam between the request handler and the image
//! generation service. `AzureImageClient` is the production implementation
//! backed by the Azure OpenAI images API.

use async_trait::async_trait;
use mcp_dalle_common::config::Config;
use mcp_dalle_common::error::Error;
use mcp_dalle_common::models::{DalleModel, ImageQuality, ImageSize, ImageStyle};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// A service that turns a generation request into image URLs.
#[async_trait]
pub trait ImageClient: Send + Sync {
    /// Submit one generation request.
    ///
    /// # Errors
    /// Returns `Error::Api` for transport failures, non-success replies
    /// (authentication, quota, content policy) and malformed replies.
    async fn generate(&self, request: &ImageGenerationRequest) -> Result<ImageGenerationResponse, Error>;
}

/// Azure OpenAI image generation client.
///
/// Read-only after construction; a single instance is shared by every request.
#[derive(Clone)]
pub struct AzureImageClient {
    http: reqwest::Client,
    config: Config,
}

impl AzureImageClient {
    /// Create a client bound to the configured endpoint, key and API version.
    pub fn new(config: Config, http: reqwest::Client) -> Self {
        Self { http, config }
    }

    /// Get the generations endpoint for a model's deployment.
    pub fn endpoint(&self, model: DalleModel) -> String {
        self.config.image_generations_endpoint(model.as_str())
    }
}

#[async_trait]
impl ImageClient for AzureImageClient {
    #[instrument(level = "debug", name = "azure_generate", skip_all, fields(model = %request.model, n = request.n))]
    async fn generate(&self, request: &ImageGenerationRequest) -> Result<ImageGenerationResponse, Error> {
        let endpoint = self.endpoint(request.model);
        debug!(endpoint = %endpoint, "Calling image generation API");

        let response = self
            .http
            .post(&endpoint)
            .header("api-key", &self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::api(&endpoint, 0, format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::api(&endpoint, status.as_u16(), api_error_message(&body)));
        }

        response.json::<ImageGenerationResponse>().await.map_err(|e| {
            Error::api(&endpoint, status.as_u16(), format!("Failed to parse response: {}", e))
        })
    }
}

/// Pull the service's own error message out of a failure body, if it has one.
fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(ApiErrorBody { error }) => match error.code {
            Some(code) => format!("{} ({})", error.message, code),
            None => error.message,
        },
        Err(_) if body.trim().is_empty() => "Empty error response".to_string(),
        Err(_) => body.to_string(),
    }
}

// =============================================================================
// API Request/Response Types
// =============================================================================

/// Image generation request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageGenerationRequest {
    /// Model literal
    pub model: DalleModel,
    /// Prompt as sent to the service
    pub prompt: String,
    /// Number of images to generate
    pub n: u8,
    /// Image dimensions
    pub size: ImageSize,
    /// Rendering quality
    pub quality: ImageQuality,
    /// Rendering style, omitted from the body when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<ImageStyle>,
}

/// Image generation response body.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageGenerationResponse {
    /// Creation time, epoch seconds
    pub created: i64,
    /// Generated images
    #[serde(default)]
    pub data: Vec<ImageData>,
}

/// One generated image.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageData {
    /// Temporary URL of the generated image
    #[serde(default)]
    pub url: Option<String>,
    /// Prompt after the service's own rewriting
    #[serde(default)]
    pub revised_prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    code: Option<String>,
    message: String,
}
