//! `picopypi images`: List or forget locally built images.

use std::process::ExitCode;

use clap::Args;

use super::Context;
use crate::output::{BOLD, DIM, RESET};

/// Arguments for the `images` command.
#[derive(Args, Debug)]
pub struct ImagesArgs {
    /// Remove the catalog entry for this tag.
    #[arg(long, value_name = "TAG")]
    pub remove: Option<String>,
}

/// Executes the `images` command.
///
/// Removing an entry only forgets it locally; the engine's image is left alone.
///
/// # Errors
///
/// Returns an error if the catalog cannot be read or the tag is unknown.
pub fn execute(ctx: &Context, args: ImagesArgs) -> anyhow::Result<ExitCode> {
    let engine = ctx.engine()?;
    let catalog = engine.catalog();

    if let Some(tag) = args.remove {
        catalog.remove(&tag)?;
        eprintln!("Removed {tag} from the catalog");
        return Ok(ExitCode::SUCCESS);
    }

    let entries = catalog.list()?;
    if entries.is_empty() {
        eprintln!("No images built yet");
        return Ok(ExitCode::SUCCESS);
    }

    println!("{BOLD}{:<32} {:<14} {:<26} FINGERPRINT{RESET}", "TAG", "PLATFORM", "CREATED");
    for entry in entries {
        let short = entry
            .fingerprint
            .strip_prefix("sha256:")
            .unwrap_or(&entry.fingerprint)
            .get(..12)
            .unwrap_or(&entry.fingerprint);
        println!(
            "{:<32} {:<14} {DIM}{:<26}{RESET} {short}",
            entry.tag, entry.platform, entry.created_at
        );
    }
    Ok(ExitCode::SUCCESS)
}
