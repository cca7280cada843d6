//! Local catalog of built images.
//!
//! Records which definition fingerprint each tag was built from, so an
//! unchanged definition is not rebuilt.

use std::path::{Path, PathBuf};

use picopypi_common::error::{PicopypiError, Result};
use serde::{Deserialize, Serialize};

/// Entry in the local image catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageEntry {
    /// Tag the image was built under.
    pub tag: String,
    /// Digest-pinned base reference.
    pub base: String,
    /// Target platform.
    pub platform: String,
    /// Definition fingerprint (`sha256:<hex>`).
    pub fingerprint: String,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
}

/// Image catalog backed by a JSON file.
#[derive(Debug)]
pub struct ImageCatalog {
    catalog_path: PathBuf,
}

impl ImageCatalog {
    /// Opens or creates an image catalog under the given data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog directory cannot be created.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let catalog_path = data_dir.join("images").join("catalog.json");
        if let Some(parent) = catalog_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PicopypiError::io(parent, e))?;
        }
        Ok(Self { catalog_path })
    }

    /// Lists all images in the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog file cannot be read or parsed.
    pub fn list(&self) -> Result<Vec<ImageEntry>> {
        if !self.catalog_path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.catalog_path)
            .map_err(|e| PicopypiError::io(&self.catalog_path, e))?;
        let entries: Vec<ImageEntry> = serde_json::from_str(&content)?;
        Ok(entries)
    }

    /// Looks up the entry for a tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read.
    pub fn find(&self, tag: &str) -> Result<Option<ImageEntry>> {
        Ok(self.list()?.into_iter().find(|e| e.tag == tag))
    }

    /// Registers an image, replacing any previous entry with the same tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read or written.
    pub fn register(&self, entry: ImageEntry) -> Result<()> {
        let mut entries = self.list()?;
        entries.retain(|e| e.tag != entry.tag);
        tracing::debug!(tag = %entry.tag, "registering image");
        entries.push(entry);
        self.write_entries(&entries)
    }

    /// Removes an image by tag.
    ///
    /// # Errors
    ///
    /// Returns `PicopypiError::NotFound` if no image with the given tag exists.
    pub fn remove(&self, tag: &str) -> Result<()> {
        let mut entries = self.list()?;
        let before = entries.len();
        entries.retain(|e| e.tag != tag);
        if entries.len() == before {
            return Err(PicopypiError::NotFound {
                kind: "image",
                id: tag.to_string(),
            });
        }
        self.write_entries(&entries)
    }

    fn write_entries(&self, entries: &[ImageEntry]) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.catalog_path, json)
            .map_err(|e| PicopypiError::io(&self.catalog_path, e))
    }
}
