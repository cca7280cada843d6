//! `picopypi run`: Run the build image's entrypoint.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use picopypi_runtime::run::RunSpec;

use super::{Context, ImageArgs};
use crate::output;

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub image: ImageArgs,

    /// Host directory to bind at the repos volume.
    #[arg(long)]
    pub repos: Option<PathBuf>,

    /// Do not build the image first.
    #[arg(long)]
    pub no_build: bool,

    /// Extra environment for this run (`KEY=value`).
    #[arg(short, long = "env", value_parser = parse_env)]
    pub env: Vec<(String, String)>,

    /// Arguments passed to the entrypoint unchanged.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

fn parse_env(value: &str) -> Result<(String, String), String> {
    value
        .split_once('=')
        .filter(|(k, _)| !k.is_empty())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=value, got {value:?}"))
}

/// Executes the `run` command.
///
/// The process exits with the entrypoint's exit status.
///
/// # Errors
///
/// Returns an error if the image cannot be built or the container cannot start.
pub fn execute(ctx: &Context, args: RunArgs) -> anyhow::Result<ExitCode> {
    let (definition, settings) = ctx.definition(&args.image)?;
    let engine = ctx.engine()?;
    if !args.no_build {
        let _ = engine.build(&definition, &settings.tag, false)?;
    }

    let mut spec = RunSpec::new(&settings.tag, definition.platform(), definition.repos_dir())
        .with_args(args.args);
    if let Some(repos) = args.repos {
        spec = spec.with_repos(repos);
    }
    for (key, value) in args.env {
        spec = spec.with_env(key, value);
    }

    let status = engine.run(&spec)?;
    if status != 0 {
        tracing::error!(status, "entrypoint exited with non-zero code");
    }
    Ok(output::exit_code(status))
}
