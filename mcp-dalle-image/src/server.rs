//! MCP Server implementation for the DALL-E server.
//!
//! This module provides the MCP server handler that exposes:
//! - `generate_image` tool for text-to-image generation
//! - Resources for models and the session's generation history

use crate::client::AzureImageClient;
use crate::handler::{ImageGenerateParams, ImageHandler};
use crate::resources::{self, HISTORY_URI, MODELS_URI};
use crate::session::SessionContext;
use crate::storage::ArtifactStore;
use mcp_dalle_common::config::Config;
use mcp_dalle_common::error::{ConfigError, Error};
use rmcp::{
    model::{
        CallToolResult, Content, ListResourcesResult, ListToolsResult, RawResource, ReadResourceResult, Resource,
        ResourceContents, ServerCapabilities, ServerInfo, Tool,
    },
    ErrorData as McpError, ServerHandler,
};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Name of the single tool this server exposes.
pub const GENERATE_IMAGE_TOOL: &str = "generate_image";

/// MCP Server for DALL-E image generation.
#[derive(Clone)]
pub struct ImageServer {
    handler: Arc<ImageHandler>,
}

impl ImageServer {
    /// Create a new ImageServer around a handler.
    pub fn new(handler: ImageHandler) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    /// Build the production server: one HTTP client, one Azure client and one
    /// session for the whole process.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ConfigError::invalid_value("HTTP client", e.to_string()))?;

        let client = AzureImageClient::new(config.clone(), http.clone());
        let session = Arc::new(SessionContext::new(Arc::new(client)));
        let storage = ArtifactStore::new(config.images_dir.clone(), http);

        info!(
            endpoint = %config.api_endpoint,
            images_dir = %config.images_dir.display(),
            "Initialized DALL-E session"
        );
        Ok(Self::new(ImageHandler::new(session, storage)))
    }

    /// The session shared by every request.
    pub fn session(&self) -> &Arc<SessionContext> {
        &self.handler.session
    }

    /// Generate an image from a text prompt.
    ///
    /// Remote failures come back as a normal result whose JSON carries
    /// `"success": false`; only contract violations are MCP errors.
    pub async fn generate_image(&self, params: ImageGenerateParams) -> Result<CallToolResult, McpError> {
        info!(prompt = %params.prompt, "Generating image");

        let record = self.handler.generate_image(params).await.map_err(|e| {
            if e.is_validation() {
                McpError::invalid_params(e.to_string(), None)
            } else {
                McpError::internal_error(format!("Image generation failed: {}", e), None)
            }
        })?;

        let json = serde_json::to_string_pretty(&record)
            .map_err(|e| McpError::internal_error(format!("Failed to serialize result: {}", e), None))?;

        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    /// Read a resource by URI.
    pub async fn resource_content(&self, uri: &str) -> Result<String, McpError> {
        match uri {
            MODELS_URI => Ok(resources::models_resource_json()),
            HISTORY_URI => {
                let history = self.session().history().await;
                Ok(resources::history_resource_json(&history))
            }
            _ => Err(McpError::resource_not_found(format!("Unknown resource: {}", uri), None)),
        }
    }
}

/// Tools advertised by the server.
pub fn tool_definitions() -> Vec<Tool> {
    use schemars::schema_for;

    let schema = schema_for!(ImageGenerateParams);
    let schema_value = serde_json::to_value(&schema).unwrap_or_default();
    let input_schema = match schema_value {
        serde_json::Value::Object(map) => Arc::new(map),
        _ => Arc::new(serde_json::Map::new()),
    };

    vec![Tool {
        name: Cow::Borrowed(GENERATE_IMAGE_TOOL),
        description: Some(Cow::Borrowed(
            "Generate an image from a text prompt using Azure OpenAI DALL-E. \
             The image and a metadata.json sidecar are saved locally. \
             Returns the image URL, the revised prompt, the options used and local file paths.",
        )),
        input_schema,
        annotations: None,
        icons: None,
        meta: None,
        output_schema: None,
        title: None,
    }]
}

/// Resources advertised by the server.
pub fn resource_definitions() -> Vec<Resource> {
    let resource = |uri: &str, name: &str, description: &str| Resource {
        raw: RawResource {
            uri: uri.to_string(),
            name: name.to_string(),
            title: None,
            description: Some(description.to_string()),
            mime_type: Some("application/json".to_string()),
            size: None,
            icons: None,
            meta: None,
        },
        annotations: None,
    };

    vec![
        resource(MODELS_URI, "Available DALL-E Models", "DALL-E models with their sizes, qualities and styles"),
        resource(HISTORY_URI, "Generation History", "Images generated during this session"),
    ]
}

/// Decode tool arguments into a parameter type.
fn parse_arguments<T: DeserializeOwned>(
    arguments: Option<serde_json::Map<String, serde_json::Value>>,
) -> Result<T, McpError> {
    arguments
        .map(|args| serde_json::from_value(serde_json::Value::Object(args)))
        .transpose()
        .map_err(|e| McpError::invalid_params(format!("Invalid parameters: {}", e), None))?
        .ok_or_else(|| McpError::invalid_params("Missing parameters", None))
}

impl ServerHandler for ImageServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Image generation server using Azure OpenAI DALL-E. \
                 Use generate_image to create an image from a text prompt. \
                 Images are saved locally with their metadata; read dalle://history \
                 for the images generated in this session."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _params: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        async move {
            Ok(ListToolsResult {
                tools: tool_definitions(),
                next_cursor: None,
                meta: None,
            })
        }
    }

    fn call_tool(
        &self,
        params: rmcp::model::CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            match params.name.as_ref() {
                GENERATE_IMAGE_TOOL => {
                    let tool_params: ImageGenerateParams = parse_arguments(params.arguments)?;
                    self.generate_image(tool_params).await
                }
                _ => Err(McpError::invalid_params(format!("Unknown tool: {}", params.name), None)),
            }
        }
    }

    fn list_resources(
        &self,
        _params: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        async move {
            debug!("Listing resources");
            Ok(ListResourcesResult {
                resources: resource_definitions(),
                next_cursor: None,
                meta: None,
            })
        }
    }

    fn read_resource(
        &self,
        params: rmcp::model::ReadResourceRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        async move {
            let uri = &params.uri;
            debug!(uri = %uri, "Reading resource");

            let content = self.resource_content(uri).await?;
            Ok(ReadResourceResult {
                contents: vec![ResourceContents::text(content, uri.clone())],
            })
        }
    }
}
