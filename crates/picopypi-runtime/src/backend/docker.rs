//! Docker CLI backend.
//!
//! Builds take the context archive on stdin (`docker build -`), runs use
//! `docker run` with the image's own entrypoint and no shell in between.

use std::path::PathBuf;
use std::process::Command;

use picopypi_common::error::{PicopypiError, Result};

use super::{BuildRequest, ContainerBackend, ProbeRequest};
use crate::inspect::ImageInspection;
use crate::process::{self, CommandOutput};
use crate::run::RunSpec;

/// Backend that shells out to a Docker-compatible CLI.
#[derive(Debug, Clone)]
pub struct DockerBackend {
    program: String,
    binary: Option<PathBuf>,
}

impl DockerBackend {
    /// Creates a backend for the given engine binary, resolved on `PATH`.
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        let binary = which::which(&program).ok();
        tracing::debug!(program = %program, found = binary.is_some(), "resolved container engine");
        Self { program, binary }
    }

    fn command(&self) -> Result<Command> {
        self.binary.as_ref().map(Command::new).ok_or_else(|| {
            PicopypiError::EngineUnavailable {
                engine: self.program.clone(),
            }
        })
    }
}

/// Arguments of `docker build` reading the context from stdin.
#[must_use]
pub fn build_args(request: &BuildRequest) -> Vec<String> {
    vec![
        "build".into(),
        "--platform".into(),
        request.platform.clone(),
        "--tag".into(),
        request.tag.clone(),
        "-".into(),
    ]
}

/// Arguments of `docker run` for a [`RunSpec`].
///
/// # Errors
///
/// Returns an error if the host repos directory does not exist.
pub fn run_args(spec: &RunSpec) -> Result<Vec<String>> {
    let mut args = vec!["run".to_string()];
    if spec.remove {
        args.push("--rm".into());
    }
    args.push("--interactive".into());
    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        args.push("--tty".into());
    }
    args.extend(["--platform".into(), spec.platform.clone()]);
    if let Some(binding) = spec.volume_binding()? {
        args.extend(["--volume".into(), binding]);
    }
    for (key, value) in &spec.env {
        args.extend(["--env".into(), format!("{key}={value}")]);
    }
    args.push(spec.tag.clone());
    args.extend(spec.args.iter().cloned());
    Ok(args)
}

/// Arguments of `docker run` for a probe container.
#[must_use]
pub fn probe_args(request: &ProbeRequest) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "--rm".into(),
        "--name".into(),
        format!("picopypi-probe-{}", uuid::Uuid::new_v4().simple()),
        "--platform".into(),
        request.platform.clone(),
        "--entrypoint".into(),
        request.program.clone(),
        request.tag.clone(),
    ];
    args.extend(request.args.iter().cloned());
    args
}

impl ContainerBackend for DockerBackend {
    fn name(&self) -> &str {
        &self.program
    }

    fn is_available(&self) -> bool {
        self.binary.is_some()
    }

    fn build(&self, request: &BuildRequest) -> Result<()> {
        tracing::info!(
            tag = %request.tag,
            platform = %request.platform,
            fingerprint = %request.fingerprint,
            "building image"
        );
        let mut command = self.command()?;
        let _ = command.args(build_args(request));
        let code = process::run_streaming(&mut command, Some(&request.context))?;
        process::check_status(&self.program, code)
    }

    fn run(&self, spec: &RunSpec) -> Result<i32> {
        tracing::info!(tag = %spec.tag, args = ?spec.args, "running build container");
        let mut command = self.command()?;
        let _ = command.args(run_args(spec)?);
        process::run_streaming(&mut command, None)
    }

    fn inspect(&self, tag: &str) -> Result<ImageInspection> {
        let mut command = self.command()?;
        let _ = command.args(["image", "inspect", "--", tag]);
        let output = process::run_captured(&mut command)?;
        if !output.success() {
            tracing::debug!(stderr = %output.stderr.trim(), "image inspect failed");
            return Err(PicopypiError::NotFound {
                kind: "image",
                id: tag.to_string(),
            });
        }
        ImageInspection::from_json(&output.stdout)
    }

    fn probe(&self, request: &ProbeRequest) -> Result<CommandOutput> {
        let mut command = self.command()?;
        let _ = command.args(probe_args(request));
        process::run_captured(&mut command)
    }
}
