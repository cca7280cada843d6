//! `picopypi render`: Print the Containerfile of the build image.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::Args;
use picopypi_image::{BuildContext, Containerfile};

use super::{Context, ImageArgs};

/// Arguments for the `render` command.
#[derive(Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub image: ImageArgs,

    /// Write to a file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Read the entrypoint script and include the fingerprint label.
    #[arg(long)]
    pub fingerprint: bool,
}

/// Executes the `render` command.
///
/// # Errors
///
/// Returns an error if the definition is invalid or the output cannot be written.
pub fn execute(ctx: &Context, args: RenderArgs) -> anyhow::Result<ExitCode> {
    let (definition, _) = ctx.definition(&args.image)?;
    let text = if args.fingerprint {
        BuildContext::assemble(&definition)?.containerfile()
    } else {
        Containerfile::from_definition(&definition)?.to_string()
    };

    match args.output {
        Some(path) => {
            std::fs::write(&path, text)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "wrote Containerfile");
        }
        None => print!("{text}"),
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use clap::Parser;
    use picopypi_common::constants;

    use super::*;
    use crate::commands::{Cli, Command};

    fn render_into(dir: &Path, extra: &[&str]) -> String {
        let out = dir.join("Dockerfile.out");
        let config = dir.join("config.json");
        let mut argv = vec![
            "picopypi".to_string(),
            "--config".into(),
            config.display().to_string(),
            "render".into(),
            "--output".into(),
            out.display().to_string(),
        ];
        argv.extend(extra.iter().map(ToString::to_string));
        let cli = Cli::try_parse_from(argv).expect("parse");
        let ctx = Context::load(&cli).expect("context");
        let Command::Render(args) = cli.command else {
            panic!("expected render");
        };
        let _ = execute(&ctx, args).expect("render");
        std::fs::read_to_string(out).expect("read output")
    }

    #[test]
    fn render_writes_containerfile_to_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let text = render_into(dir.path(), &[]);
        assert!(text.starts_with(&format!("FROM {}\n", constants::MANYLINUX_ARMV7L_IMAGE)));
        assert!(text.contains("USER builder\n"));
        assert!(!text.contains(constants::LABEL_FINGERPRINT));
    }

    #[test]
    fn render_with_fingerprint_reads_entrypoint() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = dir.path().join("build_armv7l.py");
        std::fs::write(&script, "print('build')\n").expect("write script");
        let script = script.display().to_string();

        let text = render_into(dir.path(), &["--fingerprint", "--entrypoint", &script]);
        assert!(text.contains(constants::LABEL_FINGERPRINT));
        assert!(text.contains("COPY build_armv7l.py /entrypoint.py\n"));
    }
}
