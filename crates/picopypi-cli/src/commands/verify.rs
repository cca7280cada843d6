//! `picopypi verify`: Check a built image against its definition.

use std::process::ExitCode;

use clap::Args;

use super::{Context, ImageArgs};
use crate::output;

/// Arguments for the `verify` command.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub image: ImageArgs,

    /// Only check image metadata; do not start a probe container.
    #[arg(long)]
    pub no_probe: bool,
}

/// Executes the `verify` command.
///
/// Exits with status 1 when any check fails.
///
/// # Errors
///
/// Returns an error if the image cannot be inspected or probed.
pub fn execute(ctx: &Context, args: VerifyArgs) -> anyhow::Result<ExitCode> {
    let (definition, settings) = ctx.definition(&args.image)?;
    let engine = ctx.engine()?;
    let report = engine.verify(&definition, &settings.tag, !args.no_probe)?;

    eprint!("{}", output::format_report(&report));
    if report.passed() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
