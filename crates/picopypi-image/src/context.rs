//! Build context assembly.
//!
//! The context holds the Containerfile and the entrypoint script. It is
//! streamed to the engine as a gzip tar archive whose headers carry fixed
//! owners, modes and timestamps, so equal inputs give byte-equal archives.

use std::io::Write;
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;
use picopypi_common::constants;
use picopypi_common::error::{PicopypiError, Result};
use picopypi_common::types::Sha256Digest;

use crate::containerfile::Containerfile;
use crate::definition::ImageDefinition;

/// A file inside the build context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextFile {
    /// Path relative to the context root.
    pub name: String,
    /// File contents.
    pub contents: Vec<u8>,
}

/// Staged build context for one image definition.
#[derive(Debug, Clone)]
pub struct BuildContext {
    files: Vec<ContextFile>,
    fingerprint: Sha256Digest,
}

impl BuildContext {
    /// Reads the entrypoint script and renders the Containerfile.
    ///
    /// # Errors
    ///
    /// Returns [`PicopypiError::NotFound`] if the entrypoint script is
    /// missing, which aborts the build before the engine is invoked.
    pub fn assemble(definition: &ImageDefinition) -> Result<Self> {
        let entrypoint = definition.entrypoint();
        let source = &entrypoint.source;
        if !source.is_file() {
            return Err(PicopypiError::NotFound {
                kind: "entrypoint script",
                id: source.display().to_string(),
            });
        }
        let script = std::fs::read(source).map_err(|e| PicopypiError::io(source, e))?;
        let fingerprint = definition.fingerprint(&script)?;
        let containerfile = Containerfile::from_definition(definition)?
            .with_fingerprint(&fingerprint)
            .to_string();

        tracing::info!(
            script = %source.display(),
            fingerprint = %fingerprint,
            "assembled build context"
        );
        Ok(Self {
            files: vec![
                ContextFile {
                    name: constants::CONTAINERFILE_NAME.to_string(),
                    contents: containerfile.into_bytes(),
                },
                ContextFile {
                    name: entrypoint.context_name()?,
                    contents: script,
                },
            ],
            fingerprint,
        })
    }

    /// Fingerprint of the definition and script this context was built from.
    #[must_use]
    pub const fn fingerprint(&self) -> &Sha256Digest {
        &self.fingerprint
    }

    /// Files in the context, Containerfile first.
    #[must_use]
    pub fn files(&self) -> &[ContextFile] {
        &self.files
    }

    /// Rendered Containerfile text.
    #[must_use]
    pub fn containerfile(&self) -> String {
        self.files
            .first()
            .map(|f| String::from_utf8_lossy(&f.contents).into_owned())
            .unwrap_or_default()
    }

    /// Encodes the context as a gzip tar archive.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive cannot be written.
    pub fn to_archive(&self) -> Result<Vec<u8>> {
        let io_err = |e| PicopypiError::io("<build context>", e);
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for file in &self.files {
            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Regular);
            header.set_size(file.contents.len() as u64);
            header.set_mode(0o644);
            header.set_uid(0);
            header.set_gid(0);
            header.set_mtime(0);
            builder
                .append_data(&mut header, &file.name, file.contents.as_slice())
                .map_err(io_err)?;
        }
        let encoder = builder.into_inner().map_err(io_err)?;
        encoder.finish().map_err(io_err)
    }

    /// Writes the context files into `dir`, e.g. next to a compose file.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or a file cannot be written.
    pub fn stage(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir).map_err(|e| PicopypiError::io(dir, e))?;
        for file in &self.files {
            let path = dir.join(&file.name);
            let mut out = std::fs::File::create(&path).map_err(|e| PicopypiError::io(&path, e))?;
            out.write_all(&file.contents)
                .map_err(|e| PicopypiError::io(&path, e))?;
        }
        tracing::info!(dir = %dir.display(), "staged build context");
        Ok(())
    }
}
