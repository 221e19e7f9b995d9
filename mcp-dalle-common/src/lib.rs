//! MCP DALL-E Common Library
//!
//! Shared configuration, error types, DALL-E option enumerations, tracing
//! setup, and the stdio server builder used by the MCP DALL-E server.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod error;
pub mod models;
pub mod server;
pub mod tracing;


pub use config::Config;
pub use error::{ConfigError, Error};
pub use models::{DalleModel, ImageQuality, ImageSize, ImageStyle};
pub use server::{McpServerBuilder, ServerError, shutdown_channel};
