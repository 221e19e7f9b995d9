//! Local artifact storage.
//!
//! Each successful generation is downloaded into its own folder under the
//! images directory, named after the generation's UTC timestamp:
//!
//! ```text
//! images/
//!   20231114_221320/
//!     generated_image.png
//!     metadata.json
//! ```

use crate::handler::GeneratedImage;
use chrono::DateTime;
use mcp_dalle_common::error::Error;
use mcp_dalle_common::models::{DalleModel, ImageQuality, ImageSize, ImageStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name of the downloaded image inside a generation folder.
pub const IMAGE_FILE_NAME: &str = "generated_image.png";

/// File name of the metadata sidecar inside a generation folder.
pub const METADATA_FILE_NAME: &str = "metadata.json";

/// Paths written by a successful save.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedArtifacts {
    /// The image file
    pub image_path: PathBuf,
    /// The metadata sidecar
    pub metadata_path: PathBuf,
}

/// Writes generated images and their metadata under a base directory.
#[derive(Clone)]
pub struct ArtifactStore {
    base_dir: PathBuf,
    http: reqwest::Client,
}

impl ArtifactStore {
    /// Create a store rooted at `base_dir`. The directory is created on first save.
    pub fn new(base_dir: impl Into<PathBuf>, http: reqwest::Client) -> Self {
        Self {
            base_dir: base_dir.into(),
            http,
        }
    }

    /// The images directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Download the generated image and write it with a metadata sidecar.
    ///
    /// Nothing is written until the download has succeeded. A folder that
    /// already exists for the same timestamp is reused and its files are
    /// overwritten.
    ///
    /// # Errors
    /// Returns `Error::Persistence` if the image has no URL, the download
    /// fails, the folder cannot be created, or a file cannot be written.
    pub async fn save(&self, prompt: &str, image: &GeneratedImage) -> Result<SavedArtifacts, Error> {
        let url = image
            .url
            .as_deref()
            .ok_or_else(|| Error::persistence(self.base_dir.display().to_string(), "No image URL to download"))?;
        let folder = self.base_dir.join(folder_name(image.timestamp)?);

        let bytes = self.download(url).await?;
        create_dir(&folder).await?;

        let image_path = folder.join(IMAGE_FILE_NAME);
        write_file(&image_path, &bytes).await?;
        debug!(path = %image_path.display(), size = bytes.len(), "Wrote image file");

        let metadata = ArtifactMetadata {
            prompt,
            revised_prompt: &image.revised_prompt,
            model: image.model,
            size: image.size,
            quality: image.quality,
            style: image.style,
            timestamp: image.timestamp,
            image_path: image_path.to_string_lossy().into_owned(),
        };
        let json = serde_json::to_string_pretty(&metadata)?;
        let metadata_path = folder.join(METADATA_FILE_NAME);
        write_file(&metadata_path, json.as_bytes()).await?;

        info!(folder = %folder.display(), "Saved image and metadata");
        Ok(SavedArtifacts {
            image_path,
            metadata_path,
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, Error> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::persistence(url, format!("Download failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::persistence(url, format!("Download failed with HTTP {}", status.as_u16())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::persistence(url, format!("Failed to read image body: {}", e)))?;
        Ok(bytes.to_vec())
    }
}

/// Folder name for a generation: its UTC creation time as `YYYYMMDD_HHMMSS`.
///
/// # Errors
/// Returns `Error::Persistence` if the timestamp is out of the representable range.
pub fn folder_name(timestamp: i64) -> Result<String, Error> {
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y%m%d_%H%M%S").to_string())
        .ok_or_else(|| Error::persistence(timestamp.to_string(), "Timestamp out of range"))
}

async fn create_dir(path: &Path) -> Result<(), Error> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| Error::persistence(path.display().to_string(), e.to_string()))
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<(), Error> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| Error::persistence(path.display().to_string(), e.to_string()))
}

/// Contents of `metadata.json`.
#[derive(Debug, Serialize)]
struct ArtifactMetadata<'a> {
    prompt: &'a str,
    revised_prompt: &'a str,
    model: DalleModel,
    size: ImageSize,
    quality: ImageQuality,
    style: Option<ImageStyle>,
    timestamp: i64,
    image_path: String,
}
