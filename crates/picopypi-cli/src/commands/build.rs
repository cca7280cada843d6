//! `picopypi build`: Build the image from an entrypoint script.

use std::process::ExitCode;

use clap::Args;
use picopypi_runtime::engine::BuildOutcome;

use super::{Context, ImageArgs};
use crate::output::{BOLD, DIM, GREEN, RESET};

/// Arguments for the `build` command.
#[derive(Args, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub image: ImageArgs,

    /// Rebuild even if the catalog shows an identical definition.
    #[arg(short, long)]
    pub force: bool,
}

/// Executes the `build` command.
///
/// # Errors
///
/// Returns an error if the entrypoint script is missing or any build directive fails.
pub fn execute(ctx: &Context, args: BuildArgs) -> anyhow::Result<ExitCode> {
    let (definition, settings) = ctx.definition(&args.image)?;
    tracing::info!(tag = %settings.tag, base = %definition.base(), "building image");

    let engine = ctx.engine()?;
    let outcome = engine.build(&definition, &settings.tag, args.force)?;
    let entry = outcome.entry();
    match &outcome {
        BuildOutcome::Built(_) => {
            eprintln!("  {GREEN}{BOLD}Built{RESET} {}", entry.tag);
        }
        BuildOutcome::UpToDate(_) => {
            eprintln!("  {BOLD}Up to date{RESET} {}", entry.tag);
        }
    }
    eprintln!("  {DIM}base: {}{RESET}", entry.base);
    eprintln!("  {DIM}fingerprint: {}{RESET}", entry.fingerprint);
    Ok(ExitCode::SUCCESS)
}
