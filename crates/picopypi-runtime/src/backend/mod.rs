//! Container engine abstraction.

pub mod docker;

use picopypi_common::error::Result;

use crate::inspect::ImageInspection;
use crate::process::CommandOutput;
use crate::run::RunSpec;

/// Inputs of one image build.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Tag to assign to the built image.
    pub tag: String,
    /// Target platform.
    pub platform: String,
    /// Gzip tar build context, Containerfile at its root.
    pub context: Vec<u8>,
    /// Definition fingerprint the image is labelled with.
    pub fingerprint: String,
}

/// A throwaway container used to observe the image from the inside.
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    /// Image tag.
    pub tag: String,
    /// Target platform.
    pub platform: String,
    /// Program replacing the entrypoint.
    pub program: String,
    /// Arguments of the program.
    pub args: Vec<String>,
}

/// Engine that builds and runs the build image.
///
/// Implementors translate requests into engine calls; the build sequence
/// itself is owned by `picopypi-image`.
pub trait ContainerBackend: Send + Sync {
    /// Engine name used in logs and errors.
    fn name(&self) -> &str;

    /// Returns whether the engine can be invoked on this host.
    fn is_available(&self) -> bool;

    /// Builds an image from a context archive.
    ///
    /// # Errors
    ///
    /// Returns an error if any directive fails; no image is produced.
    fn build(&self, request: &BuildRequest) -> Result<()>;

    /// Runs the image's entrypoint in the foreground and returns its exit
    /// status.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be started.
    fn run(&self, spec: &RunSpec) -> Result<i32>;

    /// Reads the metadata of a built image.
    ///
    /// # Errors
    ///
    /// Returns an error if the image does not exist or cannot be parsed.
    fn inspect(&self, tag: &str) -> Result<ImageInspection>;

    /// Runs a program in a fresh container of the image, capturing output.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be started.
    fn probe(&self, request: &ProbeRequest) -> Result<CommandOutput>;
}
