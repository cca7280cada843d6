//! Run specification for the build container.

use std::path::{Path, PathBuf};

use picopypi_common::error::{PicopypiError, Result};

/// How to launch one container from the build image.
///
/// Arguments are handed to the entrypoint verbatim; the container runs a
/// single foreground process whose exit status is returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    /// Image tag to run.
    pub tag: String,
    /// Platform to request from the engine.
    pub platform: String,
    /// Host directory bound at the repos volume, if any.
    pub host_repos: Option<PathBuf>,
    /// Container path of the repos volume.
    pub repos_dir: String,
    /// Extra per-run environment.
    pub env: Vec<(String, String)>,
    /// Arguments passed to the entrypoint.
    pub args: Vec<String>,
    /// Remove the container when it exits.
    pub remove: bool,
}

impl RunSpec {
    /// A run of `tag` with no volume, no extra env and no arguments.
    pub fn new(tag: impl Into<String>, platform: impl Into<String>, repos_dir: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            platform: platform.into(),
            host_repos: None,
            repos_dir: repos_dir.into(),
            env: Vec::new(),
            args: Vec::new(),
            remove: true,
        }
    }

    /// Binds a host directory at the repos volume.
    #[must_use]
    pub fn with_repos(mut self, host: impl Into<PathBuf>) -> Self {
        self.host_repos = Some(host.into());
        self
    }

    /// Adds an environment variable for this run.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Sets the entrypoint arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// The `host:container` volume binding, with the host side made
    /// absolute as engines require.
    ///
    /// # Errors
    ///
    /// Returns an error if the host directory does not exist.
    pub fn volume_binding(&self) -> Result<Option<String>> {
        let Some(host) = &self.host_repos else {
            return Ok(None);
        };
        let absolute = absolute_dir(host)?;
        Ok(Some(format!("{}:{}", absolute.display(), self.repos_dir)))
    }
}

fn absolute_dir(path: &Path) -> Result<PathBuf> {
    if !path.is_dir() {
        return Err(PicopypiError::NotFound {
            kind: "repos directory",
            id: path.display().to_string(),
        });
    }
    std::fs::canonicalize(path).map_err(|e| PicopypiError::io(path, e))
}
