//! CLI command definitions and dispatch.

pub mod armv7l;
pub mod build;
pub mod compose;
pub mod images;
pub mod render;
pub mod run;
pub mod verify;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use picopypi_common::config::{ImageSettings, PicopypiConfig};
use picopypi_image::ImageDefinition;
use picopypi_runtime::engine::Engine;

/// picopypi: ARMv7l wheel build image.
#[derive(Parser, Debug)]
#[command(name = "picopypi", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Path to the JSON config file.
    #[arg(long, global = true, env = "PICOPYPI_CONFIG")]
    pub config: Option<PathBuf>,

    /// Container engine binary.
    #[arg(long, global = true, env = "PICOPYPI_ENGINE")]
    pub engine: Option<String>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the Containerfile of the build image.
    Render(render::RenderArgs),
    /// Write a build context and docker-compose.yml for the build image.
    Compose(compose::ComposeArgs),
    /// Build the image from an entrypoint script.
    Build(build::BuildArgs),
    /// Run the entrypoint, passing arguments through unchanged.
    Run(run::RunArgs),
    /// Check a built image against the build image contract.
    Verify(verify::VerifyArgs),
    /// Manage the local image catalog.
    Images(images::ImagesArgs),
    /// Build an armv7l wheel inside the build image.
    Armv7l(armv7l::Armv7lArgs),
}

/// Image selection flags shared by several commands.
#[derive(Args, Debug, Clone, Default)]
pub struct ImageArgs {
    /// Entrypoint script copied to /entrypoint.py.
    #[arg(long)]
    pub entrypoint: Option<PathBuf>,

    /// Digest-pinned base image (`name@sha256:<hex>`).
    #[arg(long)]
    pub base: Option<String>,

    /// Tag of the built image.
    #[arg(long)]
    pub tag: Option<String>,

    /// Target platform.
    #[arg(long)]
    pub platform: Option<String>,
}

impl ImageArgs {
    fn apply(&self, settings: &mut ImageSettings) {
        if let Some(entrypoint) = &self.entrypoint {
            settings.entrypoint.clone_from(entrypoint);
        }
        if let Some(base) = &self.base {
            settings.base.clone_from(base);
        }
        if let Some(tag) = &self.tag {
            settings.tag.clone_from(tag);
        }
        if let Some(platform) = &self.platform {
            settings.platform.clone_from(platform);
        }
    }
}

/// Loaded configuration shared by command handlers.
#[derive(Debug)]
pub struct Context {
    config: PicopypiConfig,
}

impl Context {
    fn load(cli: &Cli) -> anyhow::Result<Self> {
        let path = cli
            .config
            .clone()
            .unwrap_or_else(picopypi_common::constants::default_config_file);
        let mut config = PicopypiConfig::load(&path)
            .with_context(|| format!("failed to load config {}", path.display()))?;
        if let Some(engine) = &cli.engine {
            config.engine.clone_from(engine);
        }
        Ok(Self { config })
    }

    /// Image settings with command-line overrides applied.
    pub fn settings(&self, image: &ImageArgs) -> ImageSettings {
        let mut settings = self.config.image.clone();
        image.apply(&mut settings);
        settings
    }

    /// Validated definition for the given overrides.
    pub fn definition(&self, image: &ImageArgs) -> anyhow::Result<(ImageDefinition, ImageSettings)> {
        let settings = self.settings(image);
        let definition = ImageDefinition::from_settings(&settings)?;
        Ok((definition, settings))
    }

    /// Engine over the configured container CLI.
    pub fn engine(&self) -> anyhow::Result<Engine> {
        Ok(Engine::docker(&self.config.engine, &self.config.data_dir)?)
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<ExitCode> {
    let ctx = Context::load(&cli)?;
    match cli.command {
        Command::Render(args) => render::execute(&ctx, args),
        Command::Compose(args) => compose::execute(&ctx, args),
        Command::Build(args) => build::execute(&ctx, args),
        Command::Run(args) => run::execute(&ctx, args),
        Command::Verify(args) => verify::execute(&ctx, args),
        Command::Images(args) => images::execute(&ctx, args),
        Command::Armv7l(args) => armv7l::execute(&ctx, args),
    }
}
