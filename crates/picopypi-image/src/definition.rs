//! Typed model of the ARMv7l build image.
//!
//! An [`ImageDefinition`] can only be obtained through
//! [`ImageDefinitionBuilder::build`], which enforces the image contract:
//! the base is digest-pinned, the build user is not root, every path is
//! absolute, and there is exactly one entrypoint and one volume.

use std::path::{Path, PathBuf};

use picopypi_common::config::ImageSettings;
use picopypi_common::constants;
use picopypi_common::error::{PicopypiError, Result};
use picopypi_common::types::{PinnedImage, Sha256Digest};

use crate::directive::Directive;

/// Non-root account that owns the build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildUser {
    /// Account name.
    pub name: String,
    /// Home directory, created by `useradd`.
    pub home: String,
    /// Login shell.
    pub shell: String,
}

impl Default for BuildUser {
    fn default() -> Self {
        Self {
            name: constants::BUILD_USER.to_string(),
            home: constants::BUILD_HOME.to_string(),
            shell: constants::BUILD_SHELL.to_string(),
        }
    }
}

/// Script installed into the image and launched as its only process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entrypoint {
    /// Host path of the script, read when the build context is assembled.
    pub source: PathBuf,
    /// Absolute install path inside the image.
    pub path: String,
    /// Absolute interpreter path.
    pub interpreter: String,
}

impl Entrypoint {
    /// Entrypoint installed at the fixed path and run by the system python.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            path: constants::ENTRYPOINT_PATH.to_string(),
            interpreter: constants::ENTRYPOINT_INTERPRETER.to_string(),
        }
    }

    /// File name of the script inside the build context.
    ///
    /// # Errors
    ///
    /// Returns an error if the source path has no usable file name.
    pub fn context_name(&self) -> Result<String> {
        self.source
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| is_safe_path(n))
            .map(ToString::to_string)
            .ok_or_else(|| {
                PicopypiError::config(format!(
                    "entrypoint source {} has no usable file name",
                    self.source.display()
                ))
            })
    }

    /// Exec-form argument vector.
    #[must_use]
    pub fn argv(&self) -> Vec<String> {
        vec![self.interpreter.clone(), self.path.clone()]
    }
}

/// Validated build image definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDefinition {
    base: PinnedImage,
    platform: String,
    user: BuildUser,
    repos_dir: String,
    repos_mode: u32,
    env: Vec<(String, String)>,
    entrypoint: Entrypoint,
}

impl ImageDefinition {
    /// Starts a definition from a base image and an entrypoint script,
    /// with every other setting at its contract default.
    pub fn builder(base: PinnedImage, entrypoint: impl Into<PathBuf>) -> ImageDefinitionBuilder {
        ImageDefinitionBuilder {
            base,
            platform: constants::ARMV7L_PLATFORM.to_string(),
            user: BuildUser::default(),
            repos_dir: constants::REPOS_DIR.to_string(),
            repos_mode: constants::REPOS_DIR_MODE,
            env: constants::IMAGE_ENV
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            entrypoint: Entrypoint::new(entrypoint),
        }
    }

    /// The stock `manylinux_2_31` ARMv7l definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the entrypoint path has no usable file name.
    pub fn armv7l(entrypoint: impl Into<PathBuf>) -> Result<Self> {
        let base = PinnedImage::parse(constants::MANYLINUX_ARMV7L_IMAGE)?;
        Self::builder(base, entrypoint).build()
    }

    /// Builds a definition from configuration settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the base is not digest-pinned or any setting
    /// breaks the image contract.
    pub fn from_settings(settings: &ImageSettings) -> Result<Self> {
        let base = PinnedImage::parse(&settings.base)?;
        Self::builder(base, &settings.entrypoint)
            .platform(&settings.platform)
            .repos_mode(settings.repos_mode)
            .build()
    }

    /// Pinned base image.
    #[must_use]
    pub const fn base(&self) -> &PinnedImage {
        &self.base
    }

    /// Target platform, e.g. `linux/arm/v7`.
    #[must_use]
    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Build account.
    #[must_use]
    pub const fn user(&self) -> &BuildUser {
        &self.user
    }

    /// Shared repos directory, also the declared volume.
    #[must_use]
    pub fn repos_dir(&self) -> &str {
        &self.repos_dir
    }

    /// Explicit mode of the repos directory.
    #[must_use]
    pub const fn repos_mode(&self) -> u32 {
        self.repos_mode
    }

    /// Fixed environment in declaration order.
    #[must_use]
    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }

    /// Entrypoint script.
    #[must_use]
    pub const fn entrypoint(&self) -> &Entrypoint {
        &self.entrypoint
    }

    /// The linear build sequence.
    ///
    /// Ownership of the repos directory is transferred before `USER` and
    /// `VOLUME`, so mounted content is writable by the build user.
    ///
    /// # Errors
    ///
    /// Returns an error if the entrypoint has no usable file name.
    pub fn directives(&self) -> Result<Vec<Directive>> {
        let user = &self.user;
        let repos = &self.repos_dir;
        Ok(vec![
            Directive::From {
                image: self.base.to_string(),
            },
            Directive::Run {
                command: format!(
                    "useradd --create-home --home-dir {} --shell {} {}",
                    user.home, user.shell, user.name
                ),
            },
            Directive::Run {
                command: format!(
                    "mkdir -p {repos} && chown {name}:{name} {repos} && chmod {mode:04o} {repos}",
                    name = user.name,
                    mode = self.repos_mode,
                ),
            },
            Directive::Env {
                vars: self.env.clone(),
            },
            Directive::User {
                name: user.name.clone(),
            },
            Directive::Workdir {
                path: user.home.clone(),
            },
            Directive::Copy {
                source: self.entrypoint.context_name()?,
                destination: self.entrypoint.path.clone(),
            },
            Directive::Entrypoint {
                argv: self.entrypoint.argv(),
            },
            Directive::Volume {
                paths: vec![repos.clone()],
            },
        ])
    }

    /// SHA-256 over the rendered build sequence and the entrypoint bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the directives cannot be produced.
    pub fn fingerprint(&self, script: &[u8]) -> Result<Sha256Digest> {
        let rendered: String = self
            .directives()?
            .iter()
            .map(|d| format!("{d}\n"))
            .collect();
        Ok(crate::hash::hash_parts(&[
            self.platform.as_bytes(),
            rendered.as_bytes(),
            script,
        ]))
    }
}

/// Builder for [`ImageDefinition`].
#[derive(Debug, Clone)]
pub struct ImageDefinitionBuilder {
    base: PinnedImage,
    platform: String,
    user: BuildUser,
    repos_dir: String,
    repos_mode: u32,
    env: Vec<(String, String)>,
    entrypoint: Entrypoint,
}

impl ImageDefinitionBuilder {
    /// Sets the target platform.
    #[must_use]
    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    /// Replaces the build account.
    #[must_use]
    pub fn user(mut self, user: BuildUser) -> Self {
        self.user = user;
        self
    }

    /// Sets the shared repos directory and volume path.
    #[must_use]
    pub fn repos_dir(mut self, path: impl Into<String>) -> Self {
        self.repos_dir = path.into();
        self
    }

    /// Sets the mode of the repos directory.
    #[must_use]
    pub const fn repos_mode(mut self, mode: u32) -> Self {
        self.repos_mode = mode;
        self
    }

    /// Adds or replaces an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.env.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.env.push((key, value)),
        }
        self
    }

    /// Overrides the install path of the entrypoint.
    #[must_use]
    pub fn entrypoint_path(mut self, path: impl Into<String>) -> Self {
        self.entrypoint.path = path.into();
        self
    }

    /// Overrides the entrypoint interpreter.
    #[must_use]
    pub fn interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.entrypoint.interpreter = interpreter.into();
        self
    }

    /// Validates and freezes the definition.
    ///
    /// # Errors
    ///
    /// Returns [`PicopypiError::Config`] describing the first violated rule.
    pub fn build(self) -> Result<ImageDefinition> {
        check_user(&self.user)?;
        check_absolute("repos directory", &self.repos_dir)?;
        check_absolute("entrypoint path", &self.entrypoint.path)?;
        check_absolute("entrypoint interpreter", &self.entrypoint.interpreter)?;
        if self.entrypoint.context_name()? == constants::CONTAINERFILE_NAME {
            return Err(PicopypiError::config(format!(
                "entrypoint source may not be named {}",
                constants::CONTAINERFILE_NAME
            )));
        }
        if self.repos_mode > 0o7777 {
            return Err(PicopypiError::config(format!(
                "repos mode {:o} is not a permission mode",
                self.repos_mode
            )));
        }
        if self.platform.trim().is_empty() {
            return Err(PicopypiError::config("platform is empty"));
        }
        for (key, _) in &self.env {
            if !is_env_key(key) {
                return Err(PicopypiError::config(format!(
                    "invalid environment variable name: {key:?}"
                )));
            }
        }

        tracing::debug!(base = %self.base, user = %self.user.name, "image definition validated");
        Ok(ImageDefinition {
            base: self.base,
            platform: self.platform,
            user: self.user,
            repos_dir: self.repos_dir,
            repos_mode: self.repos_mode,
            env: self.env,
            entrypoint: self.entrypoint,
        })
    }
}

fn check_user(user: &BuildUser) -> Result<()> {
    let valid_name = user.name.len() <= 32
        && user
            .name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && user
            .name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if !valid_name {
        return Err(PicopypiError::config(format!(
            "invalid build user name: {:?}",
            user.name
        )));
    }
    if user.name == "root" {
        return Err(PicopypiError::config("the build user must not be root"));
    }
    check_absolute("home directory", &user.home)?;
    check_absolute("login shell", &user.shell)
}

fn check_absolute(what: &str, path: &str) -> Result<()> {
    if !Path::new(path).is_absolute() || !is_safe_path(path) {
        return Err(PicopypiError::config(format!(
            "{what} must be an absolute path without special characters: {path:?}"
        )));
    }
    Ok(())
}

/// Paths end up in `RUN` shell lines, so only a conservative set is allowed.
fn is_safe_path(path: &str) -> bool {
    !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-'))
}

fn is_env_key(key: &str) -> bool {
    key.chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock() -> ImageDefinition {
        ImageDefinition::armv7l("build_armv7l.py").expect("stock definition")
    }

    fn base() -> PinnedImage {
        PinnedImage::parse(constants::MANYLINUX_ARMV7L_IMAGE).expect("base")
    }

    #[test]
    fn stock_definition_uses_contract_defaults() {
        let def = stock();
        assert_eq!(def.user().name, "builder");
        assert_eq!(def.user().home, "/home/builder");
        assert_eq!(def.repos_dir(), "/home/builder/repos");
        assert_eq!(def.platform(), "linux/arm/v7");
        assert_eq!(
            def.env(),
            &[
                ("DEBIAN_FRONTEND".to_string(), "noninteractive".to_string()),
                ("CI".to_string(), "1".to_string()),
            ]
        );
        assert_eq!(
            def.entrypoint().argv(),
            vec!["/usr/bin/python3", "/entrypoint.py"]
        );
    }

    #[test]
    fn directives_follow_linear_order() {
        let keywords: Vec<_> = stock()
            .directives()
            .expect("directives")
            .iter()
            .map(Directive::keyword)
            .collect();
        assert_eq!(
            keywords,
            [
                "FROM",
                "RUN",
                "RUN",
                "ENV",
                "USER",
                "WORKDIR",
                "COPY",
                "ENTRYPOINT",
                "VOLUME"
            ]
        );
    }

    #[test]
    fn repos_ownership_precedes_identity_switch() {
        let directives = stock().directives().expect("directives");
        let chown = directives
            .iter()
            .position(|d| matches!(d, Directive::Run { command } if command.contains("chown builder:builder /home/builder/repos")))
            .expect("chown directive");
        let user = directives
            .iter()
            .position(|d| matches!(d, Directive::User { .. }))
            .expect("user directive");
        assert!(chown < user);
    }

    #[test]
    fn repos_mode_is_explicit() {
        let directives = stock().directives().expect("directives");
        assert!(directives.iter().any(|d| matches!(
            d,
            Directive::Run { command } if command.ends_with("chmod 0755 /home/builder/repos")
        )));
    }

    #[test]
    fn copy_uses_script_file_name() {
        let def = ImageDefinition::armv7l("/src/scripts/build_armv7l.py").expect("definition");
        let directives = def.directives().expect("directives");
        assert!(directives.contains(&Directive::Copy {
            source: "build_armv7l.py".into(),
            destination: "/entrypoint.py".into(),
        }));
    }

    #[test]
    fn root_user_is_rejected() {
        let user = BuildUser {
            name: "root".into(),
            home: "/root".into(),
            shell: "/bin/sh".into(),
        };
        assert!(ImageDefinition::builder(base(), "e.py").user(user).build().is_err());
    }

    #[test]
    fn relative_repos_dir_is_rejected() {
        let result = ImageDefinition::builder(base(), "e.py")
            .repos_dir("repos")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn shell_metacharacters_in_paths_are_rejected() {
        let result = ImageDefinition::builder(base(), "e.py")
            .repos_dir("/home/builder/repos; rm -rf /")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn invalid_env_key_is_rejected() {
        let result = ImageDefinition::builder(base(), "e.py")
            .env("NOT-VALID", "x")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn env_override_replaces_in_place() {
        let def = ImageDefinition::builder(base(), "e.py")
            .env("CI", "true")
            .env("EXTRA", "1")
            .build()
            .expect("definition");
        assert_eq!(def.env()[1], ("CI".to_string(), "true".to_string()));
        assert_eq!(def.env().len(), 3);
    }

    #[test]
    fn oversized_mode_is_rejected() {
        let result = ImageDefinition::builder(base(), "e.py")
            .repos_mode(0o17777)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn script_named_like_containerfile_is_rejected() {
        assert!(ImageDefinition::armv7l("Dockerfile").is_err());
    }

    #[test]
    fn fingerprint_is_stable_and_content_sensitive() {
        let def = stock();
        let a = def.fingerprint(b"print('a')").expect("fingerprint");
        let b = def.fingerprint(b"print('a')").expect("fingerprint");
        let c = def.fingerprint(b"print('b')").expect("fingerprint");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn from_settings_rejects_mutable_tag() {
        let settings = ImageSettings {
            base: "quay.io/pypa/manylinux_2_31_armv7l:latest".into(),
            ..ImageSettings::default()
        };
        assert!(ImageDefinition::from_settings(&settings).is_err());
    }
}
