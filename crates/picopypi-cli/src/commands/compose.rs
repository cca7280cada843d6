//! `picopypi compose`: Stage a build context with a docker-compose.yml.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::Args;
use picopypi_common::constants;
use picopypi_image::BuildContext;
use picopypi_image::compose::render_compose;

use super::{Context, ImageArgs};

/// Arguments for the `compose` command.
#[derive(Args, Debug)]
pub struct ComposeArgs {
    #[command(flatten)]
    pub image: ImageArgs,

    /// Directory to write the Containerfile, script and compose file into.
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,

    /// Host repos directory, relative to `--dir` unless absolute.
    #[arg(long)]
    pub repos: Option<PathBuf>,
}

/// Executes the `compose` command.
///
/// # Errors
///
/// Returns an error if the entrypoint script is missing or a file cannot be written.
pub fn execute(ctx: &Context, args: ComposeArgs) -> anyhow::Result<ExitCode> {
    let (definition, settings) = ctx.definition(&args.image)?;
    let repos = args.repos.unwrap_or(settings.repos);

    let context = BuildContext::assemble(&definition)?;
    context.stage(&args.dir)?;

    let yaml = render_compose(&definition, &settings.tag, &repos)?;
    let path = args.dir.join(constants::COMPOSE_FILE_NAME);
    std::fs::write(&path, yaml).with_context(|| format!("failed to write {}", path.display()))?;

    eprintln!("Wrote {} and build context to {}", constants::COMPOSE_FILE_NAME, args.dir.display());
    eprintln!(
        "Run with: docker compose run --build --rm {} <args...>",
        constants::COMPOSE_SERVICE
    );
    Ok(ExitCode::SUCCESS)
}
