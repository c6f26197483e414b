use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::AppResult;
use crate::models::SelectedImage;

/// Default local path of the upload manifest
pub const DEFAULT_MANIFEST_PATH: &str = "images_log.json";

/// One uploaded file as recorded in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub filename: String,
    pub size: String,
}

impl From<&SelectedImage> for ManifestEntry {
    fn from(image: &SelectedImage) -> Self {
        Self {
            filename: image.file_name(),
            size: image.size_type.clone(),
        }
    }
}

/// Writes the manifest as a compact JSON array, replacing any previous file.
/// The file is closed by the time this returns.
pub async fn write_manifest(path: &Path, entries: &[ManifestEntry]) -> AppResult<()> {
    let data = serde_json::to_vec(entries)?;
    tokio::fs::write(path, data).await?;
    log::debug!("Manifest with {} entries saved to {}", entries.len(), path.display());
    Ok(())
}

pub async fn read_manifest(path: &Path) -> AppResult<Vec<ManifestEntry>> {
    let data = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&data)?)
}
