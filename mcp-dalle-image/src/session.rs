//! Process-lifetime session state.
//!
//! Created once at startup and shared by every request: the image client
//! handle plus the in-memory history of successful generations.

use crate::client::ImageClient;
use crate::handler::GenerationRecord;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared state for one server process.
pub struct SessionContext {
    client: Arc<dyn ImageClient>,
    history: RwLock<Vec<GenerationRecord>>,
}

impl SessionContext {
    /// Create a session around an already-configured client.
    pub fn new(client: Arc<dyn ImageClient>) -> Self {
        Self {
            client,
            history: RwLock::new(Vec::new()),
        }
    }

    /// The image client.
    pub fn client(&self) -> &dyn ImageClient {
        self.client.as_ref()
    }

    /// Append a generation record. Records are never modified once added.
    pub async fn record(&self, record: GenerationRecord) {
        self.history.write().await.push(record);
    }

    /// Snapshot of the history, oldest first.
    pub async fn history(&self) -> Vec<GenerationRecord> {
        self.history.read().await.clone()
    }

    /// Number of recorded generations.
    pub async fn len(&self) -> usize {
        self.history.read().await.len()
    }

    /// Whether nothing has been recorded yet.
    pub async fn is_empty(&self) -> bool {
        self.history.read().await.is_empty()
    }
}
