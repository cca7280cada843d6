//! Global configuration model for picopypi.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{PicopypiError, Result};

/// Root configuration, read from a JSON file when one exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PicopypiConfig {
    /// Container engine binary (`docker` or a compatible CLI).
    pub engine: String,
    /// Base directory for the image catalog.
    pub data_dir: PathBuf,
    /// Settings of the build image.
    pub image: ImageSettings,
}

/// Settings that shape the build image definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    /// Digest-pinned base image reference.
    pub base: String,
    /// Tag given to the built image.
    pub tag: String,
    /// Target platform passed to the engine.
    pub platform: String,
    /// Host path of the entrypoint script.
    pub entrypoint: PathBuf,
    /// Host directory bound to the repos volume by default.
    pub repos: PathBuf,
    /// Mode of the shared repos directory inside the image.
    pub repos_mode: u32,
}

impl Default for PicopypiConfig {
    fn default() -> Self {
        Self {
            engine: constants::DEFAULT_ENGINE.to_string(),
            data_dir: constants::data_dir().clone(),
            image: ImageSettings::default(),
        }
    }
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            base: constants::MANYLINUX_ARMV7L_IMAGE.to_string(),
            tag: constants::DEFAULT_IMAGE_TAG.to_string(),
            platform: constants::ARMV7L_PLATFORM.to_string(),
            entrypoint: PathBuf::from(constants::DEFAULT_ENTRYPOINT_SCRIPT),
            repos: PathBuf::from("repos"),
            repos_mode: constants::REPOS_DIR_MODE,
        }
    }
}

impl PicopypiConfig {
    /// Loads the configuration from `path`, falling back to defaults when
    /// the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| PicopypiError::io(path, e))?;
        let config: Self = serde_json::from_str(&content)?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(config)
    }
}
