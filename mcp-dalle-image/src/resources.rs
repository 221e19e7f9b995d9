//! MCP Resources for the DALL-E server.
//!
//! This module provides resource implementations for:
//! - `dalle://models` - List available DALL-E models and their options
//! - `dalle://history` - List generations recorded during this session

use crate::handler::GenerationRecord;
use mcp_dalle_common::models::{DalleModel, ImageQuality, ImageSize, ImageStyle, ModelRegistry};
use serde::Serialize;

/// URI of the models resource.
pub const MODELS_URI: &str = "dalle://models";

/// URI of the history resource.
pub const HISTORY_URI: &str = "dalle://history";

/// Information about an available DALL-E model.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    /// Model literal accepted by `generate_image`
    pub id: DalleModel,
    /// Human-readable name
    pub name: &'static str,
    /// Whether this model is used when none is given
    pub is_default: bool,
    /// Accepted sizes
    pub supported_sizes: Vec<ImageSize>,
    /// Accepted qualities
    pub supported_qualities: Vec<ImageQuality>,
    /// Accepted styles
    pub supported_styles: Vec<ImageStyle>,
    /// Maximum number of images per request
    pub max_images: i64,
}

/// Generations recorded so far.
#[derive(Debug, Serialize)]
pub struct HistorySnapshot<'a> {
    /// Number of recorded generations
    pub count: usize,
    /// Records, oldest first
    pub generations: &'a [GenerationRecord],
}

/// List all available DALL-E models.
pub fn list_models() -> Vec<ModelInfo> {
    ModelRegistry::list_models()
        .iter()
        .map(|m| ModelInfo {
            id: m.id,
            name: m.name,
            is_default: m.id == DalleModel::default(),
            supported_sizes: m.supported_sizes.to_vec(),
            supported_qualities: m.supported_qualities.to_vec(),
            supported_styles: m.supported_styles.to_vec(),
            max_images: m.max_images,
        })
        .collect()
}

/// Get models resource as JSON string.
pub fn models_resource_json() -> String {
    serde_json::to_string_pretty(&list_models()).unwrap_or_else(|_| "[]".to_string())
}

/// Get history resource as JSON string.
pub fn history_resource_json(records: &[GenerationRecord]) -> String {
    let snapshot = HistorySnapshot {
        count: records.len(),
        generations: records,
    };
    serde_json::to_string_pretty(&snapshot).unwrap_or_else(|_| "{}".to_string())
}
