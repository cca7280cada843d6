//! Image inspection and contract verification.
//!
//! Metadata checks read `docker image inspect` output. Ownership and mode
//! of the repos directory can only be seen from inside a container, so a
//! probe container reports them on separate lines.

use std::collections::BTreeMap;
use std::fmt;

use picopypi_common::constants;
use picopypi_common::error::{PicopypiError, Result};
use picopypi_image::ImageDefinition;
use serde::Deserialize;

use crate::backend::ProbeRequest;
use crate::process::CommandOutput;

/// Subset of `docker image inspect` output the contract depends on.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageInspection {
    /// Image ID.
    pub id: String,
    /// Operating system.
    #[serde(default)]
    pub os: String,
    /// CPU architecture, e.g. `arm`.
    #[serde(default)]
    pub architecture: String,
    /// Architecture variant, e.g. `v7`.
    #[serde(default)]
    pub variant: Option<String>,
    /// Runtime configuration.
    pub config: ImageConfig,
}

/// Runtime configuration baked into the image.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ImageConfig {
    /// Default user.
    pub user: String,
    /// `KEY=value` environment entries.
    pub env: Option<Vec<String>>,
    /// Default working directory.
    pub working_dir: String,
    /// Exec-form entrypoint.
    pub entrypoint: Option<Vec<String>>,
    /// Default arguments.
    pub cmd: Option<Vec<String>>,
    /// Declared volumes.
    pub volumes: Option<BTreeMap<String, serde_json::Value>>,
    /// Image labels.
    pub labels: Option<BTreeMap<String, String>>,
}

impl ImageInspection {
    /// Parses the JSON array printed by `docker image inspect`.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the array is empty.
    pub fn from_json(json: &str) -> Result<Self> {
        let images: Vec<Self> = serde_json::from_str(json)?;
        images.into_iter().next().ok_or(PicopypiError::NotFound {
            kind: "image",
            id: "<inspect output>".into(),
        })
    }

    /// Platform string in `os/arch[/variant]` form.
    #[must_use]
    pub fn platform(&self) -> String {
        match &self.variant {
            Some(variant) if !variant.is_empty() => {
                format!("{}/{}/{variant}", self.os, self.architecture)
            }
            _ => format!("{}/{}", self.os, self.architecture),
        }
    }

    fn env_value(&self, key: &str) -> Option<&str> {
        self.config
            .env
            .iter()
            .flatten()
            .filter_map(|entry| entry.split_once('='))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    /// Value of an image label.
    #[must_use]
    pub fn label(&self, key: &str) -> Option<&str> {
        self.config
            .labels
            .as_ref()
            .and_then(|labels| labels.get(key))
            .map(String::as_str)
    }
}

/// Outcome of one contract property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCheck {
    /// Property name.
    pub property: String,
    /// Expected value.
    pub expected: String,
    /// Observed value.
    pub actual: String,
}

impl ContractCheck {
    fn new(property: impl Into<String>, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Whether the observed value matches.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.expected == self.actual
    }
}

impl fmt::Display for ContractCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.passed() {
            write!(f, "ok    {}: {}", self.property, self.actual)
        } else {
            write!(
                f,
                "FAIL  {}: expected {}, got {}",
                self.property, self.expected, self.actual
            )
        }
    }
}

/// All checks performed against one image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractReport {
    /// Individual checks in evaluation order.
    pub checks: Vec<ContractCheck>,
}

impl ContractReport {
    /// Whether every check passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.checks.iter().all(ContractCheck::passed)
    }

    /// Checks that did not pass.
    pub fn failures(&self) -> impl Iterator<Item = &ContractCheck> {
        self.checks.iter().filter(|c| !c.passed())
    }
}

fn or_missing(value: Option<&str>) -> String {
    value.map_or_else(|| "<missing>".to_string(), ToString::to_string)
}

/// Checks image metadata against the definition it was built from.
#[must_use]
pub fn verify_metadata(image: &ImageInspection, definition: &ImageDefinition) -> ContractReport {
    let base = definition.base();
    let user = definition.user();
    let mut checks = vec![
        ContractCheck::new(
            "base digest",
            base.digest().to_string(),
            or_missing(image.label(constants::LABEL_BASE_DIGEST)),
        ),
        ContractCheck::new(
            "base name",
            base.name(),
            or_missing(image.label(constants::LABEL_BASE_NAME)),
        ),
        ContractCheck::new("platform", definition.platform(), image.platform()),
        ContractCheck::new("user", &user.name, &image.config.user),
        ContractCheck::new("working directory", &user.home, &image.config.working_dir),
    ];

    for (key, value) in definition.env() {
        checks.push(ContractCheck::new(
            format!("env {key}"),
            value,
            or_missing(image.env_value(key)),
        ));
    }

    checks.push(ContractCheck::new(
        "entrypoint",
        format!("{:?}", definition.entrypoint().argv()),
        format!("{:?}", image.config.entrypoint.clone().unwrap_or_default()),
    ));
    checks.push(ContractCheck::new(
        "default arguments",
        "[]",
        format!("{:?}", image.config.cmd.clone().unwrap_or_default()),
    ));
    let volumes: Vec<&String> = image.config.volumes.iter().flat_map(BTreeMap::keys).collect();
    checks.push(ContractCheck::new(
        "volumes",
        format!("{:?}", [definition.repos_dir()]),
        format!("{volumes:?}"),
    ));

    ContractReport { checks }
}

/// Probe container that reports identity, cwd and directory ownership,
/// one fact per line.
#[must_use]
pub fn probe_request(definition: &ImageDefinition, tag: &str) -> ProbeRequest {
    let home = &definition.user().home;
    let repos = definition.repos_dir();
    ProbeRequest {
        tag: tag.to_string(),
        platform: definition.platform().to_string(),
        program: "/bin/sh".into(),
        args: vec![
            "-c".into(),
            format!("id -un && pwd && stat -c '%U:%G %a' {repos} && stat -c '%U:%G' {home}"),
        ],
    }
}

/// Checks the probe container's report.
#[must_use]
pub fn verify_probe(output: &CommandOutput, definition: &ImageDefinition) -> ContractReport {
    let user = definition.user();
    let owner = format!("{0}:{0}", user.name);
    let mut lines = output.stdout.lines().map(str::trim);
    let runtime_user = lines.next();
    let cwd = lines.next();
    let (repos_owner, repos_mode) = lines
        .next()
        .and_then(|l| l.split_once(' '))
        .map_or((None, None), |(o, m)| (Some(o), Some(m)));
    let home_owner = lines.next();

    let mut checks = vec![ContractCheck::new(
        "probe exit code",
        "0",
        output.exit_code.to_string(),
    )];
    checks.extend([
        ContractCheck::new("runtime user", &user.name, or_missing(runtime_user)),
        ContractCheck::new("runtime working directory", &user.home, or_missing(cwd)),
        ContractCheck::new("repos ownership", &owner, or_missing(repos_owner)),
        ContractCheck::new(
            "repos mode",
            format!("{:o}", definition.repos_mode()),
            or_missing(repos_mode),
        ),
        ContractCheck::new("home ownership", &owner, or_missing(home_owner)),
    ]);
    ContractReport { checks }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGEST: &str = "sha256:3d1bb16c69d0acafcb90fdbaa5e1b9a2d6634089006d76e2427ca6cdae136be0";

    fn inspect_json(user: &str, env: &str) -> String {
        format!(
            r#"[{{
                "Id": "sha256:feed",
                "Os": "linux",
                "Architecture": "arm",
                "Variant": "v7",
                "Config": {{
                    "User": "{user}",
                    "Env": [{env}],
                    "WorkingDir": "/home/builder",
                    "Entrypoint": ["/usr/bin/python3", "/entrypoint.py"],
                    "Cmd": null,
                    "Volumes": {{"/home/builder/repos": {{}}}},
                    "Labels": {{
                        "org.opencontainers.image.base.name": "quay.io/pypa/manylinux_2_31_armv7l",
                        "org.opencontainers.image.base.digest": "{DIGEST}"
                    }}
                }}
            }}]"#
        )
    }

    fn definition() -> ImageDefinition {
        ImageDefinition::armv7l("build_armv7l.py").expect("definition")
    }

    #[test]
    fn conforming_image_passes() {
        let json = inspect_json(
            "builder",
            r#""PATH=/usr/bin", "DEBIAN_FRONTEND=noninteractive", "CI=1""#,
        );
        let image = ImageInspection::from_json(&json).expect("parse");
        let report = verify_metadata(&image, &definition());
        assert!(report.passed(), "{:?}", report.failures().collect::<Vec<_>>());
    }

    #[test]
    fn root_user_and_missing_env_fail() {
        let json = inspect_json("root", r#""DEBIAN_FRONTEND=noninteractive""#);
        let image = ImageInspection::from_json(&json).expect("parse");
        let report = verify_metadata(&image, &definition());
        let failed: Vec<_> = report.failures().map(|c| c.property.as_str()).collect();
        assert_eq!(failed, ["user", "env CI"]);
    }

    #[test]
    fn platform_includes_variant() {
        let image = ImageInspection::from_json(&inspect_json("builder", "")).expect("parse");
        assert_eq!(image.platform(), "linux/arm/v7");
    }

    #[test]
    fn empty_inspect_output_is_not_found() {
        assert!(matches!(
            ImageInspection::from_json("[]"),
            Err(PicopypiError::NotFound { .. })
        ));
    }

    #[test]
    fn probe_report_parses_lines() {
        let output = CommandOutput {
            stdout: "builder\n/home/builder\nbuilder:builder 755\nbuilder:builder\n".into(),
            stderr: String::new(),
            exit_code: 0,
        };
        let report = verify_probe(&output, &definition());
        assert!(report.passed(), "{:?}", report.failures().collect::<Vec<_>>());
    }

    #[test]
    fn probe_report_flags_root_owned_repos() {
        let output = CommandOutput {
            stdout: "builder\n/home/builder\nroot:root 755\nbuilder:builder\n".into(),
            stderr: String::new(),
            exit_code: 0,
        };
        let report = verify_probe(&output, &definition());
        let failed: Vec<_> = report.failures().map(|c| c.property.as_str()).collect();
        assert_eq!(failed, ["repos ownership"]);
    }

    #[test]
    fn probe_request_targets_repos_and_home() {
        let request = probe_request(&definition(), "img");
        assert_eq!(request.program, "/bin/sh");
        assert!(request.args[1].contains("/home/builder/repos"));
    }
}
