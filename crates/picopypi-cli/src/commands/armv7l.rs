//! `picopypi armv7l`: Build a wheel for one revision inside the build image.
//!
//! Builds the image if needed, then relaunches the entrypoint inside a
//! container with the marker variable set so the script knows it is
//! already running in the builder.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::Args;
use picopypi_common::constants;
use picopypi_common::types::{Abi, Repository, Revision};
use picopypi_image::ImageDefinition;
use picopypi_runtime::run::RunSpec;

use super::{Context, ImageArgs};
use crate::output;

/// Arguments for the `armv7l` command.
#[derive(Args, Debug)]
pub struct Armv7lArgs {
    /// Repository to build (`owner/name` or a full git URL).
    pub repository: Repository,

    /// Full commit sha1 or sha256 to check out.
    pub revision: Revision,

    /// CPython ABI to build for.
    #[arg(long, default_value = constants::DEFAULT_ABI)]
    pub abi: Abi,

    /// Host directory for the repos volume.
    #[arg(long)]
    pub repos: Option<PathBuf>,

    /// Rebuild the image even if it is up to date.
    #[arg(long)]
    pub rebuild: bool,

    #[command(flatten)]
    pub image: ImageArgs,

    /// Arguments passed on to the setuptools build command.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl Armv7lArgs {
    /// Arguments handed to the entrypoint inside the container.
    ///
    /// Options come first so the passthrough arguments stay last.
    fn entrypoint_args(&self) -> Vec<String> {
        let mut argv = vec![
            "--abi".to_string(),
            self.abi.to_string(),
            self.repository.to_string(),
            self.revision.to_string(),
        ];
        argv.extend(self.args.iter().cloned());
        argv
    }

    /// Container run for this build, marked as running inside the builder.
    fn run_spec(&self, tag: &str, definition: &ImageDefinition, repos: PathBuf) -> RunSpec {
        RunSpec::new(tag, definition.platform(), definition.repos_dir())
            .with_repos(repos)
            .with_env(constants::BUILDER_MARKER_ENV, "1")
            .with_args(self.entrypoint_args())
    }
}

/// Executes the `armv7l` command.
///
/// # Errors
///
/// Returns an error if invoked from inside the builder, or if the image
/// cannot be built or started.
pub fn execute(ctx: &Context, args: Armv7lArgs) -> anyhow::Result<ExitCode> {
    if std::env::var_os(constants::BUILDER_MARKER_ENV).is_some() {
        anyhow::bail!(
            "{} is set; refusing to start a builder from inside a builder",
            constants::BUILDER_MARKER_ENV
        );
    }

    let (definition, settings) = ctx.definition(&args.image)?;
    let engine = ctx.engine()?;
    let _ = engine.build(&definition, &settings.tag, args.rebuild)?;

    let repos = args.repos.clone().unwrap_or(settings.repos);
    std::fs::create_dir_all(&repos)
        .with_context(|| format!("failed to create {}", repos.display()))?;
    let spec = args.run_spec(&settings.tag, &definition, repos);

    tracing::info!(
        repository = %args.repository,
        revision = %args.revision,
        abi = %args.abi,
        "building wheel"
    );
    let status = engine.run(&spec)?;
    Ok(output::exit_code(status))
}
