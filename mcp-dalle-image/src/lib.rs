//! MCP DALL-E Image Server Library
//!
//! This library provides image generation using the Azure OpenAI DALL-E API,
//! with local storage of each generated image and its metadata.

pub mod client;
pub mod handler;
pub mod resources;
pub mod server;
pub mod session;
pub mod storage;

pub use client::{AzureImageClient, ImageClient};
pub use handler::{GeneratedImage, GenerationRecord, ImageGenerateParams, ImageHandler};
pub use server::ImageServer;
pub use session::SessionContext;
pub use storage::ArtifactStore;
