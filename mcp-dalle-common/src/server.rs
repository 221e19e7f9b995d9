//! MCP Server builder utilities.
//!
//! The DALL-E server talks to exactly one host over stdin/stdout. This module
//! wires a `ServerHandler` to the rmcp stdio transport and keeps it running
//! until the host disconnects or the process is asked to stop.
//!
//! # Example
//!
//! ```ignore
//! use mcp_dalle_common::server::McpServerBuilder;
//!
//! let handler = MyHandler::new();
//! McpServerBuilder::new(handler).run().await?;
//! ```

use rmcp::{ServerHandler, ServiceExt};
use thiserror::Error;
use tokio::sync::oneshot;

/// Errors that can occur when running an MCP server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Transport error during communication
    #[error("Transport error: {0}")]
    Transport(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Builder for configuring and running MCP servers.
pub struct McpServerBuilder<H> {
    handler: H,
    shutdown_rx: Option<oneshot::Receiver<()>>,
}

impl<H> McpServerBuilder<H>
where
    H: ServerHandler + Clone + Send + Sync + 'static,
{
    /// Create a new server builder with the given handler.
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            shutdown_rx: None,
        }
    }

    /// Set a shutdown signal receiver for graceful shutdown.
    ///
    /// When the sender is dropped or a message is sent, the server
    /// stops serving. Without one, SIGINT/SIGTERM are used.
    pub fn with_shutdown(mut self, shutdown_rx: oneshot::Receiver<()>) -> Self {
        self.shutdown_rx = Some(shutdown_rx);
        self
    }

    /// Serve the handler over stdio until the peer disconnects or shutdown is requested.
    pub async fn run(self) -> Result<(), ServerError> {
        use rmcp::transport::io::stdio;

        tracing::info!("Starting MCP server on stdio");

        let shutdown_future = async {
            if let Some(rx) = self.shutdown_rx {
                let _ = rx.await;
            } else {
                wait_for_shutdown_signal().await;
            }
        };

        let service = self
            .handler
            .serve(stdio())
            .await
            .map_err(|e| ServerError::Transport(e.to_string()))?;

        tokio::select! {
            result = service.waiting() => {
                result.map_err(|e| ServerError::Transport(e.to_string()))?;
                tracing::info!("Client disconnected");
                Ok(())
            }
            _ = shutdown_future => {
                tracing::info!("Received shutdown signal, stopping server");
                Ok(())
            }
        }
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// If a signal handler cannot be registered the future never resolves and the
/// server runs until the peer disconnects.
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let (Ok(mut sigterm), Ok(mut sigint)) =
            (signal(SignalKind::terminate()), signal(SignalKind::interrupt()))
        else {
            tracing::warn!("Failed to register signal handlers");
            return std::future::pending().await;
        };

        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::warn!("Failed to register Ctrl+C handler");
            return std::future::pending().await;
        }
        tracing::info!("Received Ctrl+C");
    }
}

/// Convenience function to set up programmatic shutdown.
///
/// Returns a sender that triggers shutdown and a receiver to pass to
/// [`McpServerBuilder::with_shutdown`].
pub fn shutdown_channel() -> (oneshot::Sender<()>, oneshot::Receiver<()>) {
    oneshot::channel()
}
