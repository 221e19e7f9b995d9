//! Model definitions and generation option enumerations for DALL-E.
//!
//! Every option accepted by the `generate_image` tool is a closed enumeration
//! here, so values outside the allowed set cannot reach the request handler.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minimum number of images that can be requested in one call.
pub const MIN_IMAGES: i64 = 1;

/// Maximum number of images that can be requested in one call.
pub const MAX_IMAGES: i64 = 10;

/// Implements `Display` and `FromStr` over the wire literals of an option enum.
macro_rules! wire_literals {
    ($ty:ident, $label:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $ty::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| {
                        format!(
                            "Invalid {} '{}'. Valid options: {}",
                            $label,
                            s,
                            $ty::ALL.iter().map(|v| v.as_str()).collect::<Vec<_>>().join(", ")
                        )
                    })
            }
        }
    };
}

/// DALL-E model literal. Also used as the Azure deployment segment of the request URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
pub enum DalleModel {
    /// DALL-E 3
    #[default]
    #[serde(rename = "dalle3")]
    Dalle3,
    /// DALL-E 2
    #[serde(rename = "dalle2")]
    Dalle2,
}

impl DalleModel {
    /// All recognized models.
    pub const ALL: &'static [DalleModel] = &[DalleModel::Dalle3, DalleModel::Dalle2];

    /// Wire literal for this model.
    pub fn as_str(&self) -> &'static str {
        match self {
            DalleModel::Dalle3 => "dalle3",
            DalleModel::Dalle2 => "dalle2",
        }
    }
}

wire_literals!(DalleModel, "model");

/// Output image dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
pub enum ImageSize {
    /// Square, 1024x1024
    #[default]
    #[serde(rename = "1024x1024")]
    Square,
    /// Landscape, 1792x1024
    #[serde(rename = "1792x1024")]
    Landscape,
    /// Portrait, 1024x1792
    #[serde(rename = "1024x1792")]
    Portrait,
}

impl ImageSize {
    /// All supported sizes.
    pub const ALL: &'static [ImageSize] = &[ImageSize::Square, ImageSize::Landscape, ImageSize::Portrait];

    /// Wire literal for this size.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::Square => "1024x1024",
            ImageSize::Landscape => "1792x1024",
            ImageSize::Portrait => "1024x1792",
        }
    }
}

wire_literals!(ImageSize, "size");

/// Rendering quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImageQuality {
    /// Standard quality
    #[default]
    Standard,
    /// Finer detail and consistency, slower
    Hd,
}

impl ImageQuality {
    /// All supported qualities.
    pub const ALL: &'static [ImageQuality] = &[ImageQuality::Standard, ImageQuality::Hd];

    /// Wire literal for this quality.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageQuality::Standard => "standard",
            ImageQuality::Hd => "hd",
        }
    }
}

wire_literals!(ImageQuality, "quality");

/// Rendering style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImageStyle {
    /// More natural, less hyper-real looking images
    Natural,
    /// Hyper-real and dramatic images
    Vivid,
}

impl ImageStyle {
    /// All supported styles.
    pub const ALL: &'static [ImageStyle] = &[ImageStyle::Natural, ImageStyle::Vivid];

    /// Wire literal for this style.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageStyle::Natural => "natural",
            ImageStyle::Vivid => "vivid",
        }
    }
}

wire_literals!(ImageStyle, "style");

/// DALL-E model definition.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DalleModelInfo {
    /// Model literal accepted by the tool
    pub id: DalleModel,
    /// Human-readable name
    pub name: &'static str,
    /// Sizes accepted by the tool for this model
    pub supported_sizes: &'static [ImageSize],
    /// Qualities accepted by the tool for this model
    pub supported_qualities: &'static [ImageQuality],
    /// Styles accepted by the tool for this model
    pub supported_styles: &'static [ImageStyle],
    /// Maximum number of images per request
    pub max_images: i64,
}

// =============================================================================
// Static Model Definitions
// =============================================================================

/// DALL-E 3
pub const DALLE_3: DalleModelInfo = DalleModelInfo {
    id: DalleModel::Dalle3,
    name: "DALL-E 3",
    supported_sizes: ImageSize::ALL,
    supported_qualities: ImageQuality::ALL,
    supported_styles: ImageStyle::ALL,
    max_images: MAX_IMAGES,
};

/// DALL-E 2
pub const DALLE_2: DalleModelInfo = DalleModelInfo {
    id: DalleModel::Dalle2,
    name: "DALL-E 2",
    supported_sizes: ImageSize::ALL,
    supported_qualities: ImageQuality::ALL,
    supported_styles: ImageStyle::ALL,
    max_images: MAX_IMAGES,
};

/// All available DALL-E models
pub const DALLE_MODELS: &[DalleModelInfo] = &[DALLE_3, DALLE_2];

/// Model registry for looking up model definitions.
pub struct ModelRegistry;

impl ModelRegistry {
    /// Resolve a model name to its definition.
    ///
    /// # Examples
    ///
    /// ```
    /// use mcp_dalle_common::models::ModelRegistry;
    ///
    /// let model = ModelRegistry::resolve("dalle3");
    /// assert!(model.is_some());
    ///
    /// assert!(ModelRegistry::resolve("dall-e-4").is_none());
    /// ```
    pub fn resolve(name: &str) -> Option<&'static DalleModelInfo> {
        DALLE_MODELS.iter().find(|model| model.id.as_str() == name)
    }

    /// List all available DALL-E models.
    pub fn list_models() -> &'static [DalleModelInfo] {
        DALLE_MODELS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_models() {
        assert_eq!(ModelRegistry::resolve("dalle3").unwrap().id, DalleModel::Dalle3);
        assert_eq!(ModelRegistry::resolve("dalle2").unwrap().id, DalleModel::Dalle2);
    }

    #[test]
    fn test_resolve_unknown() {
        assert!(ModelRegistry::resolve("dall-e-3").is_none());
        assert!(ModelRegistry::resolve("DALLE3").is_none());
        assert!(ModelRegistry::resolve("").is_none());
    }

    #[test]
    fn test_list_models() {
        let models = ModelRegistry::list_models();
        assert_eq!(models.len(), 2);
        for model in models {
            assert_eq!(model.max_images, MAX_IMAGES);
            assert!(!model.supported_sizes.is_empty());
        }
    }

    #[test]
    fn test_defaults() {
        assert_eq!(DalleModel::default(), DalleModel::Dalle3);
        assert_eq!(ImageSize::default(), ImageSize::Square);
        assert_eq!(ImageQuality::default(), ImageQuality::Standard);
    }

    #[test]
    fn test_serde_uses_wire_literals() {
        assert_eq!(serde_json::to_value(ImageSize::Landscape).unwrap(), "1792x1024");
        assert_eq!(serde_json::to_value(ImageQuality::Hd).unwrap(), "hd");
        assert_eq!(serde_json::to_value(ImageStyle::Vivid).unwrap(), "vivid");
        assert_eq!(serde_json::to_value(DalleModel::Dalle2).unwrap(), "dalle2");

        let size: ImageSize = serde_json::from_str("\"1024x1792\"").unwrap();
        assert_eq!(size, ImageSize::Portrait);
    }

    #[test]
    fn test_serde_rejects_unknown_literals() {
        assert!(serde_json::from_str::<DalleModel>("\"dalle4\"").is_err());
        assert!(serde_json::from_str::<ImageSize>("\"512x512\"").is_err());
        assert!(serde_json::from_str::<ImageQuality>("\"ultra\"").is_err());
        assert!(serde_json::from_str::<ImageStyle>("\"Vivid\"").is_err());
    }

    #[test]
    fn test_from_str_error_lists_options() {
        let err = "256x256".parse::<ImageSize>().unwrap_err();
        assert!(err.contains("256x256"));
        assert!(err.contains("1024x1024, 1792x1024, 1024x1792"));

        let err = "dalle4".parse::<DalleModel>().unwrap_err();
        assert!(err.contains("dalle3, dalle2"));
    }

    #[test]
    fn test_json_schema_lists_enum_values() {
        let schema = serde_json::to_string(&schemars::schema_for!(ImageSize)).unwrap();
        for size in ImageSize::ALL {
            assert!(schema.contains(size.as_str()), "schema should list {}", size);
        }
    }
}
