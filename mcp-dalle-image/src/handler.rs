//! Image generation handler for the MCP DALL-E server.
//!
//! This module provides the `ImageHandler` struct, the `generate_image`
//! parameter type, and the `GenerationRecord` envelope returned to callers.

use crate::client::{ImageGenerationRequest, ImageGenerationResponse};
use crate::session::SessionContext;
use crate::storage::ArtifactStore;
use mcp_dalle_common::error::Error;
use mcp_dalle_common::models::{DalleModel, ImageQuality, ImageSize, ImageStyle, MIN_IMAGES, ModelRegistry};
use schemars::JsonSchema;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Appended to the prompt when the caller asks the service not to rewrite it.
pub const NO_REVISION_SUFFIX: &str = " do not modify my prompt";

/// Text-to-image generation parameters.
///
/// Enumerated options are typed, so unknown literals are rejected while the
/// arguments are parsed, before any network call.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ImageGenerateParams {
    /// Text prompt describing the image to generate.
    pub prompt: String,

    /// Size of the generated image: 1024x1024, 1792x1024, or 1024x1792.
    #[serde(default)]
    pub size: ImageSize,

    /// Quality of the generated image: standard or hd.
    #[serde(default)]
    pub quality: ImageQuality,

    /// Number of images to generate (1-10).
    #[serde(default = "default_n", alias = "count", deserialize_with = "deserialize_count")]
    pub n: i64,

    /// Style of the generated image: natural or vivid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<ImageStyle>,

    /// DALL-E model to use: dalle3 or dalle2.
    #[serde(default)]
    pub model: DalleModel,

    /// Whether the service may revise the prompt (true) or should be asked not to (false).
    #[serde(default = "default_revise_prompt")]
    pub revise_prompt: bool,
}

fn default_n() -> i64 {
    1
}

fn default_revise_prompt() -> bool {
    true
}

/// Accept whole numbers sent as integers, floats (`2.0`) or numeric strings (`"2"`).
fn deserialize_count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Int(i64),
        Float(f64),
        Text(String),
    }

    let whole = |value: f64| {
        if value.is_finite() && value.fract() == 0.0 {
            // Saturates outside the i64 range; validation rejects those anyway
            Ok(value as i64)
        } else {
            Err(de::Error::custom(format!("expected a whole number of images, got {}", value)))
        }
    };

    match Count::deserialize(deserializer)? {
        Count::Int(n) => Ok(n),
        Count::Float(value) => whole(value),
        Count::Text(text) => {
            let text = text.trim();
            match text.parse::<i64>() {
                Ok(n) => Ok(n),
                Err(_) => match text.parse::<f64>() {
                    Ok(value) => whole(value),
                    Err(_) => Err(de::Error::custom(format!("expected a number of images, got '{}'", text))),
                },
            }
        }
    }
}

impl ImageGenerateParams {
    /// Parameters for `prompt` with every option at its default.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            size: ImageSize::default(),
            quality: ImageQuality::default(),
            n: default_n(),
            style: None,
            model: DalleModel::default(),
            revise_prompt: default_revise_prompt(),
        }
    }

    /// Validate the parameters.
    ///
    /// # Returns
    /// - `Ok(())` if all parameters are valid
    /// - `Err(Vec<ValidationError>)` with all validation errors
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let Some(model) = ModelRegistry::resolve(self.model.as_str()) else {
            return Err(vec![ValidationError {
                field: "model".to_string(),
                message: format!("Unknown model '{}'", self.model),
            }]);
        };

        if self.n < MIN_IMAGES || self.n > model.max_images {
            errors.push(ValidationError {
                field: "n".to_string(),
                message: format!(
                    "Number of images (n) must be between {} and {}, got {}",
                    MIN_IMAGES, model.max_images, self.n
                ),
            });
        }

        if !model.supported_sizes.contains(&self.size) {
            errors.push(ValidationError {
                field: "size".to_string(),
                message: format!("Size {} is not supported by {}", self.size, model.name),
            });
        }

        if let Some(style) = self.style.filter(|style| !model.supported_styles.contains(style)) {
            errors.push(ValidationError {
                field: "style".to_string(),
                message: format!("Style {} is not supported by {}", style, model.name),
            });
        }

        if self.prompt.trim().is_empty() {
            errors.push(ValidationError {
                field: "prompt".to_string(),
                message: "Prompt cannot be empty".to_string(),
            });
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// The prompt as it is sent to the service.
    pub fn outbound_prompt(&self) -> String {
        if self.revise_prompt {
            self.prompt.clone()
        } else {
            format!("{}{}", self.prompt, NO_REVISION_SUFFIX)
        }
    }

}

/// Build the outbound request body from validated parameters.
///
/// # Errors
/// Returns `Error::Validation` if `n` does not fit the request.
pub fn build_request(params: &ImageGenerateParams) -> Result<ImageGenerationRequest, Error> {
    let n = u8::try_from(params.n)
        .map_err(|_| Error::validation(format!("Number of images (n) out of range: {}", params.n)))?;

    Ok(ImageGenerationRequest {
        model: params.model,
        prompt: params.outbound_prompt(),
        n,
        size: params.size,
        quality: params.quality,
        style: params.style,
    })
}

/// Validation error details for generation parameters.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Image generation handler.
///
/// Validates parameters, calls the image service through the session's
/// client, saves artifacts locally, and records successful generations.
pub struct ImageHandler {
    /// Process-lifetime client handle and history.
    pub session: Arc<SessionContext>,
    /// Local artifact storage.
    pub storage: ArtifactStore,
}

impl ImageHandler {
    /// Create a new handler over a session and artifact store.
    pub fn new(session: Arc<SessionContext>, storage: ArtifactStore) -> Self {
        Self { session, storage }
    }

    /// Generate an image from a text prompt.
    ///
    /// # Returns
    /// * `Ok(GenerationRecord)` - A success record, or a failure record when the
    ///   image service call failed
    /// * `Err(Error::Validation)` - If the parameters break the tool contract; no
    ///   network call is made
    #[instrument(level = "info", name = "generate_image", skip(self, params), fields(model = %params.model, size = %params.size, n = params.n))]
    pub async fn generate_image(&self, params: ImageGenerateParams) -> Result<GenerationRecord, Error> {
        params.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            Error::validation(messages.join("; "))
        })?;

        let outcome = match build_request(&params) {
            Ok(request) => self.session.client().generate(&request).await,
            Err(e) => Err(e),
        };

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Image generation failed");
                return Ok(GenerationRecord::failure(e.to_string()));
            }
        };

        let mut image = GeneratedImage::from_response(&params, response);
        info!(timestamp = image.timestamp, has_url = image.url.is_some(), "Received image from API");

        if image.url.is_some() {
            match self.storage.save(&params.prompt, &image).await {
                Ok(saved) => {
                    image.local_image_path = Some(saved.image_path.to_string_lossy().into_owned());
                    image.local_metadata_path = Some(saved.metadata_path.to_string_lossy().into_owned());
                }
                Err(e) => warn!(error = %e, "Error saving image locally"),
            }
        }

        let record = GenerationRecord::Success(image);
        self.session.record(record.clone()).await;
        Ok(record)
    }
}

// =============================================================================
// Result Types
// =============================================================================

/// A successful generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedImage {
    /// Prompt after the service's rewriting, or the caller's prompt if none was reported
    pub revised_prompt: String,
    /// URL of the first generated image
    pub url: Option<String>,
    /// Model used
    pub model: DalleModel,
    /// Image size requested
    pub size: ImageSize,
    /// Quality requested
    pub quality: ImageQuality,
    /// Style requested
    pub style: Option<ImageStyle>,
    /// Creation time reported by the service, epoch seconds
    pub timestamp: i64,
    /// Path of the saved image file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_image_path: Option<String>,
    /// Path of the saved metadata sidecar
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_metadata_path: Option<String>,
}

impl GeneratedImage {
    /// Normalize a service reply. Only the first returned image is kept.
    pub fn from_response(params: &ImageGenerateParams, response: ImageGenerationResponse) -> Self {
        let first = response.data.into_iter().next().unwrap_or_default();

        Self {
            revised_prompt: first.revised_prompt.unwrap_or_else(|| params.prompt.clone()),
            url: first.url,
            model: params.model,
            size: params.size,
            quality: params.quality,
            style: params.style,
            timestamp: response.created,
            local_image_path: None,
            local_metadata_path: None,
        }
    }
}

/// A failed generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationFailure {
    /// Description of what went wrong
    pub error: String,
}

/// Outcome of one `generate_image` call.
///
/// Serializes as a flat map with a leading `success` flag.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationRecord {
    /// The image service produced an image
    Success(GeneratedImage),
    /// The image service call failed
    Failure(GenerationFailure),
}

impl GenerationRecord {
    /// Create a failure record.
    pub fn failure(error: impl Into<String>) -> Self {
        GenerationRecord::Failure(GenerationFailure { error: error.into() })
    }

    /// Whether this record describes a successful generation.
    pub fn is_success(&self) -> bool {
        matches!(self, GenerationRecord::Success(_))
    }

    /// The generated image, if any.
    pub fn image(&self) -> Option<&GeneratedImage> {
        match self {
            GenerationRecord::Success(image) => Some(image),
            GenerationRecord::Failure(_) => None,
        }
    }
}

impl Serialize for GenerationRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Envelope<'a, T> {
            success: bool,
            #[serde(flatten)]
            body: &'a T,
        }

        match self {
            GenerationRecord::Success(image) => Envelope { success: true, body: image }.serialize(serializer),
            GenerationRecord::Failure(failure) => Envelope { success: false, body: failure }.serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ImageClient, ImageData};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Client double that records every request and replays a canned outcome.
    struct MockClient {
        requests: Mutex<Vec<ImageGenerationRequest>>,
        reply: Result<ImageGenerationResponse, String>,
    }

    impl MockClient {
        fn replying(response: ImageGenerationResponse) -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                reply: Ok(response),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                reply: Err(message.to_string()),
            })
        }

        fn calls(&self) -> Vec<ImageGenerationRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImageClient for MockClient {
        async fn generate(&self, request: &ImageGenerationRequest) -> Result<ImageGenerationResponse, Error> {
            self.requests.lock().unwrap().push(request.clone());
            self.reply
                .clone()
                .map_err(|message| Error::api("https://mock/openai", 401, message))
        }
    }

    fn response(url: Option<&str>, revised_prompt: Option<&str>) -> ImageGenerationResponse {
        ImageGenerationResponse {
            created: 1700000000,
            data: vec![ImageData {
                url: url.map(str::to_string),
                revised_prompt: revised_prompt.map(str::to_string),
            }],
        }
    }

    fn handler(client: Arc<MockClient>, base_dir: &std::path::Path) -> ImageHandler {
        let session = Arc::new(SessionContext::new(client));
        ImageHandler::new(session, ArtifactStore::new(base_dir, reqwest::Client::new()))
    }

    #[test]
    fn test_default_params() {
        let params: ImageGenerateParams = serde_json::from_str(r#"{"prompt": "a red fox"}"#).unwrap();
        assert_eq!(params.size, ImageSize::Square);
        assert_eq!(params.quality, ImageQuality::Standard);
        assert_eq!(params.n, 1);
        assert_eq!(params.style, None);
        assert_eq!(params.model, DalleModel::Dalle3);
        assert!(params.revise_prompt);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_count_alias() {
        let params: ImageGenerateParams = serde_json::from_str(r#"{"prompt": "fox", "count": 3}"#).unwrap();
        assert_eq!(params.n, 3);
    }

    #[test]
    fn test_n_accepts_whole_floats_and_numeric_strings() {
        let params: ImageGenerateParams = serde_json::from_str(r#"{"prompt": "fox", "n": 2.0}"#).unwrap();
        assert_eq!(params.n, 2);
        let params: ImageGenerateParams = serde_json::from_str(r#"{"prompt": "fox", "n": "3"}"#).unwrap();
        assert_eq!(params.n, 3);
        let params: ImageGenerateParams = serde_json::from_str(r#"{"prompt": "fox", "count": " 4.0 "}"#).unwrap();
        assert_eq!(params.n, 4);
    }

    #[test]
    fn test_n_rejects_fractions_and_text() {
        assert!(serde_json::from_str::<ImageGenerateParams>(r#"{"prompt": "fox", "n": 2.5}"#).is_err());
        assert!(serde_json::from_str::<ImageGenerateParams>(r#"{"prompt": "fox", "n": "two"}"#).is_err());
        assert!(serde_json::from_str::<ImageGenerateParams>(r#"{"prompt": "fox", "n": true}"#).is_err());
    }

    #[test]
    fn test_coerced_n_still_validated() {
        let params: ImageGenerateParams = serde_json::from_str(r#"{"prompt": "fox", "n": "11"}"#).unwrap();
        assert_eq!(params.validate().unwrap_err()[0].field, "n");
    }

    #[test]
    fn test_validation_uses_model_catalog_limit() {
        for model in DalleModel::ALL {
            let limit = ModelRegistry::resolve(model.as_str()).unwrap().max_images;
            let mut params = ImageGenerateParams::new("a red fox");
            params.model = *model;
            params.style = Some(ImageStyle::Vivid);
            params.n = limit;
            assert!(params.validate().is_ok());
            params.n = limit + 1;
            let errors = params.validate().unwrap_err();
            assert!(errors[0].message.contains(&format!("between 1 and {}", limit)));
        }
    }

    #[test]
    fn test_unknown_literals_rejected() {
        assert!(serde_json::from_str::<ImageGenerateParams>(r#"{"prompt": "fox", "size": "512x512"}"#).is_err());
        assert!(serde_json::from_str::<ImageGenerateParams>(r#"{"prompt": "fox", "quality": "ultra"}"#).is_err());
        assert!(serde_json::from_str::<ImageGenerateParams>(r#"{"prompt": "fox", "style": "anime"}"#).is_err());
        assert!(serde_json::from_str::<ImageGenerateParams>(r#"{"prompt": "fox", "model": "dalle4"}"#).is_err());
    }

    #[test]
    fn test_invalid_n_zero() {
        let mut params = ImageGenerateParams::new("a red fox");
        params.n = 0;
        let errors = params.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "n");
    }

    #[test]
    fn test_invalid_n_too_high() {
        let mut params = ImageGenerateParams::new("a red fox");
        params.n = 11;
        let errors = params.validate().unwrap_err();
        assert!(errors[0].message.contains("between 1 and 10"));
    }

    #[test]
    fn test_empty_prompt() {
        let errors = ImageGenerateParams::new("   ").validate().unwrap_err();
        assert_eq!(errors[0].field, "prompt");
    }

    #[test]
    fn test_validation_multiple_errors() {
        let mut params = ImageGenerateParams::new("");
        params.n = -2;
        let errors = params.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].to_string(), "n: Number of images (n) must be between 1 and 10, got -2");
    }

    #[test]
    fn test_outbound_prompt_suffix() {
        let mut params = ImageGenerateParams::new("a cat");
        assert_eq!(params.outbound_prompt(), "a cat");
        params.revise_prompt = false;
        assert_eq!(params.outbound_prompt(), "a cat do not modify my prompt");
    }

    #[test]
    fn test_build_request() {
        let mut params = ImageGenerateParams::new("a cat");
        params.n = 4;
        params.size = ImageSize::Portrait;
        params.quality = ImageQuality::Hd;
        params.model = DalleModel::Dalle2;

        let request = build_request(&params).unwrap();
        assert_eq!(request.n, 4);
        assert_eq!(request.size, ImageSize::Portrait);
        assert_eq!(request.quality, ImageQuality::Hd);
        assert_eq!(request.model, DalleModel::Dalle2);
        assert_eq!(request.style, None);
    }

    #[test]
    fn test_revised_prompt_falls_back_to_prompt() {
        let params = ImageGenerateParams::new("a red fox");
        let image = GeneratedImage::from_response(&params, response(Some("http://x/img.png"), None));
        assert_eq!(image.revised_prompt, "a red fox");

        let empty = ImageGenerationResponse { created: 7, data: Vec::new() };
        let image = GeneratedImage::from_response(&params, empty);
        assert_eq!(image.revised_prompt, "a red fox");
        assert_eq!(image.url, None);
        assert_eq!(image.timestamp, 7);
    }

    #[test]
    fn test_success_record_serialization() {
        let params = ImageGenerateParams::new("a red fox");
        let record = GenerationRecord::Success(GeneratedImage::from_response(
            &params,
            response(Some("http://x/img.png"), Some("a red fox in a field")),
        ));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["revised_prompt"], "a red fox in a field");
        assert_eq!(json["url"], "http://x/img.png");
        assert_eq!(json["model"], "dalle3");
        assert_eq!(json["size"], "1024x1024");
        assert_eq!(json["quality"], "standard");
        assert!(json["style"].is_null());
        assert!(json.as_object().unwrap().contains_key("style"));
        assert_eq!(json["timestamp"], 1700000000);
        assert!(json.get("local_image_path").is_none());
        assert!(json.get("local_metadata_path").is_none());
    }

    #[test]
    fn test_failure_record_serialization() {
        let json = serde_json::to_value(GenerationRecord::failure("quota exceeded")).unwrap();
        assert_eq!(json, serde_json::json!({"success": false, "error": "quota exceeded"}));
    }

    #[tokio::test]
    async fn test_generate_invalid_params_makes_no_call() {
        let dir = TempDir::new().unwrap();
        let client = MockClient::replying(response(None, None));
        let handler = handler(Arc::clone(&client), dir.path());

        let mut params = ImageGenerateParams::new("a red fox");
        params.n = 0;
        let err = handler.generate_image(params).await.unwrap_err();

        assert!(err.is_validation());
        assert!(client.calls().is_empty());
        assert!(handler.session.is_empty().await);
    }

    #[tokio::test]
    async fn test_generate_api_failure_is_reported_as_data() {
        let dir = TempDir::new().unwrap();
        let client = MockClient::failing("Access denied");
        let handler = handler(Arc::clone(&client), dir.path());

        let record = handler.generate_image(ImageGenerateParams::new("a red fox")).await.unwrap();

        assert!(!record.is_success());
        match &record {
            GenerationRecord::Failure(failure) => {
                assert!(failure.error.contains("Access denied"));
                assert!(failure.error.contains("401"));
            }
            other => panic!("Expected failure record, got {:?}", other),
        }
        assert_eq!(client.calls().len(), 1);
        assert!(handler.session.is_empty().await, "failures are not recorded");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_generate_without_url_skips_persistence() {
        let dir = TempDir::new().unwrap();
        let client = MockClient::replying(response(None, Some("a fox")));
        let handler = handler(client, dir.path());

        let record = handler.generate_image(ImageGenerateParams::new("a red fox")).await.unwrap();

        let image = record.image().unwrap();
        assert_eq!(image.url, None);
        assert_eq!(image.local_image_path, None);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert_eq!(handler.session.len().await, 1);
    }

    #[tokio::test]
    async fn test_generate_sends_suffix_and_style() {
        let dir = TempDir::new().unwrap();
        let client = MockClient::replying(response(None, None));
        let handler = handler(Arc::clone(&client), dir.path());

        let mut params = ImageGenerateParams::new("a cat");
        params.revise_prompt = false;
        params.style = Some(ImageStyle::Natural);
        let record = handler.generate_image(params).await.unwrap();

        let calls = client.calls();
        assert_eq!(calls[0].prompt, "a cat do not modify my prompt");
        assert_eq!(calls[0].style, Some(ImageStyle::Natural));
        // Without a revision from the service the caller's prompt is reported
        assert_eq!(record.image().unwrap().revised_prompt, "a cat");
        assert_eq!(record.image().unwrap().style, Some(ImageStyle::Natural));
    }

    #[tokio::test]
    async fn test_generate_saves_artifacts() {
        let image_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png-bytes".to_vec()))
            .expect(1)
            .mount(&image_server)
            .await;

        let dir = TempDir::new().unwrap();
        let url = format!("{}/img.png", image_server.uri());
        let client = MockClient::replying(response(Some(&url), Some("a red fox in a field")));
        let handler = handler(client, dir.path());

        let record = handler.generate_image(ImageGenerateParams::new("a red fox")).await.unwrap();

        let image = record.image().unwrap();
        let image_path = image.local_image_path.as_deref().unwrap();
        let metadata_path = image.local_metadata_path.as_deref().unwrap();
        assert!(image_path.contains("20231114_221320"));
        assert_eq!(std::fs::read(image_path).unwrap(), b"png-bytes");
        assert!(std::path::Path::new(metadata_path).exists());

        let history = handler.session.history().await;
        assert_eq!(history, vec![record]);
    }

    #[tokio::test]
    async fn test_generate_persistence_failure_still_succeeds() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let client = MockClient::replying(response(Some("http://127.0.0.1:9/img.png"), None));
        let handler = handler(client, &file.path().join("images"));

        let record = handler.generate_image(ImageGenerateParams::new("a red fox")).await.unwrap();

        assert!(record.is_success());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["url"], "http://127.0.0.1:9/img.png");
        assert!(json.get("local_image_path").is_none());
        assert!(json.get("local_metadata_path").is_none());
        assert_eq!(handler.session.len().await, 1);
    }
}
