//! MCP DALL-E Image Server
//!
//! MCP server for image generation using Azure OpenAI DALL-E, served over stdio.

use anyhow::{Context, Result};
use clap::Parser;
use mcp_dalle_common::tracing::init_tracing;
use mcp_dalle_common::{Config, McpServerBuilder};
use mcp_dalle_image::ImageServer;
use std::path::PathBuf;

/// Command-line arguments for the DALL-E server.
#[derive(Parser, Debug)]
#[command(name = "mcp-dalle-image")]
#[command(about = "MCP server for image generation using Azure OpenAI DALL-E")]
struct Args {
    /// Directory for generated images
    #[arg(long, env = "IMAGES_DIR")]
    images_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the MCP stream
    init_tracing();

    tracing::info!("mcp-dalle-image server starting...");

    let args = Args::parse();

    let mut config = Config::from_env()
        .context("Set API_KEY and API_ENDPOINT in the environment or in a .env file")?;
    if let Some(dir) = args.images_dir {
        config = config.with_images_dir(dir)?;
    }
    tracing::info!(
        endpoint = %config.api_endpoint,
        deployment = %config.deployment_name,
        api_version = %config.api_version,
        "Configuration loaded"
    );

    let server = ImageServer::from_config(&config)?;

    McpServerBuilder::new(server).run().await?;

    tracing::info!("Server stopped");
    Ok(())
}
