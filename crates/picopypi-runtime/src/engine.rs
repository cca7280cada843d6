//! Engine facade tying the image definition, the catalog and the backend.

use picopypi_common::constants;
use picopypi_common::error::{PicopypiError, Result};
use picopypi_image::registry::{ImageCatalog, ImageEntry};
use picopypi_image::{BuildContext, ImageDefinition};

use crate::backend::docker::DockerBackend;
use crate::backend::{BuildRequest, ContainerBackend};
use crate::inspect::{self, ContractReport};
use crate::run::RunSpec;

/// Result of [`Engine::build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The engine built a new image.
    Built(ImageEntry),
    /// The catalog already holds this tag with the same fingerprint.
    UpToDate(ImageEntry),
}

impl BuildOutcome {
    /// Catalog entry of the image.
    #[must_use]
    pub const fn entry(&self) -> &ImageEntry {
        match self {
            Self::Built(entry) | Self::UpToDate(entry) => entry,
        }
    }
}

/// Coordinates image builds, runs and verification.
pub struct Engine {
    backend: Box<dyn ContainerBackend>,
    catalog: ImageCatalog,
}

impl Engine {
    /// Creates an engine over a Docker-compatible CLI.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be opened.
    pub fn docker(program: &str, data_dir: &std::path::Path) -> Result<Self> {
        Ok(Self::with_backend(
            Box::new(DockerBackend::new(program)),
            ImageCatalog::open(data_dir)?,
        ))
    }

    /// Creates an engine over any backend.
    #[must_use]
    pub fn with_backend(backend: Box<dyn ContainerBackend>, catalog: ImageCatalog) -> Self {
        Self { backend, catalog }
    }

    /// Image catalog.
    #[must_use]
    pub const fn catalog(&self) -> &ImageCatalog {
        &self.catalog
    }

    fn require_backend(&self) -> Result<()> {
        if self.backend.is_available() {
            Ok(())
        } else {
            Err(PicopypiError::EngineUnavailable {
                engine: self.backend.name().to_string(),
            })
        }
    }

    /// Whether the engine holds `tag` labelled with `fingerprint`.
    fn engine_has(&self, tag: &str, fingerprint: &str) -> Result<bool> {
        match self.backend.inspect(tag) {
            Ok(image) => {
                let labelled = image.label(constants::LABEL_FINGERPRINT) == Some(fingerprint);
                if !labelled {
                    tracing::info!(tag, "engine image differs from catalog, rebuilding");
                }
                Ok(labelled)
            }
            Err(PicopypiError::NotFound { .. }) => {
                tracing::info!(tag, "image missing from engine, rebuilding");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Builds `definition` under `tag`.
    ///
    /// The build is skipped when the catalog shows the same fingerprint for
    /// `tag` and the engine still holds an image labelled with it, unless
    /// `force` is set. A failing build registers nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the entrypoint script is missing, the engine is
    /// unavailable, or any build directive fails.
    pub fn build(&self, definition: &ImageDefinition, tag: &str, force: bool) -> Result<BuildOutcome> {
        let context = BuildContext::assemble(definition)?;
        let fingerprint = context.fingerprint().to_string();
        self.require_backend()?;

        if !force {
            if let Some(entry) = self.catalog.find(tag)? {
                if entry.fingerprint == fingerprint && self.engine_has(tag, &fingerprint)? {
                    tracing::info!(tag, fingerprint = %fingerprint, "image up to date");
                    return Ok(BuildOutcome::UpToDate(entry));
                }
            }
        }

        self.backend.build(&BuildRequest {
            tag: tag.to_string(),
            platform: definition.platform().to_string(),
            context: context.to_archive()?,
            fingerprint: fingerprint.clone(),
        })?;

        let entry = ImageEntry {
            tag: tag.to_string(),
            base: definition.base().to_string(),
            platform: definition.platform().to_string(),
            fingerprint,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        self.catalog.register(entry.clone())?;
        tracing::info!(tag, "image built");
        Ok(BuildOutcome::Built(entry))
    }

    /// Runs the entrypoint and returns its exit status unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is unavailable or the container
    /// cannot be started.
    pub fn run(&self, spec: &RunSpec) -> Result<i32> {
        self.require_backend()?;
        let code = self.backend.run(spec)?;
        tracing::info!(tag = %spec.tag, code, "container exited");
        Ok(code)
    }

    /// Verifies a built image against `definition`, from its metadata
    /// and, when `probe` is set, from inside a throwaway container.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be inspected or probed.
    pub fn verify(&self, definition: &ImageDefinition, tag: &str, probe: bool) -> Result<ContractReport> {
        self.require_backend()?;
        let image = self.backend.inspect(tag)?;
        let mut report = inspect::verify_metadata(&image, definition);
        if probe {
            let output = self.backend.probe(&inspect::probe_request(definition, tag))?;
            report.checks.extend(inspect::verify_probe(&output, definition).checks);
        }
        tracing::info!(tag, passed = report.passed(), "verified image");
        Ok(report)
    }
}
