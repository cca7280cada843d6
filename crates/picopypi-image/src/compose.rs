//! `docker-compose.yml` rendering for the build service.
//!
//! The compose file builds the image from a staged context directory and
//! binds a host repos directory at the image's single volume.

use std::collections::BTreeMap;
use std::path::Path;

use picopypi_common::constants;
use picopypi_common::error::Result;
use serde::Serialize;

use crate::definition::ImageDefinition;

#[derive(Debug, Serialize)]
struct ComposeFile {
    services: BTreeMap<String, Service>,
}

#[derive(Debug, Serialize)]
struct Service {
    build: BuildSection,
    image: String,
    platform: String,
    volumes: Vec<String>,
}

#[derive(Debug, Serialize)]
struct BuildSection {
    context: String,
    dockerfile: String,
}

/// Renders the compose file for `definition`.
///
/// `host_repos` is written as given; relative paths resolve against the
/// compose file's directory, as compose does.
///
/// # Errors
///
/// Returns an error if YAML serialization fails.
pub fn render_compose(definition: &ImageDefinition, tag: &str, host_repos: &Path) -> Result<String> {
    let mut host = host_repos.display().to_string();
    if host_repos.is_relative() && !host.starts_with('.') {
        host = format!("./{host}");
    }

    let service = Service {
        build: BuildSection {
            context: ".".to_string(),
            dockerfile: constants::CONTAINERFILE_NAME.to_string(),
        },
        image: tag.to_string(),
        platform: definition.platform().to_string(),
        volumes: vec![format!("{host}:{}", definition.repos_dir())],
    };
    let file = ComposeFile {
        services: BTreeMap::from([(constants::COMPOSE_SERVICE.to_string(), service)]),
    };
    Ok(serde_yaml::to_string(&file)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_binds_repos_volume() {
        let def = ImageDefinition::armv7l("build_armv7l.py").expect("definition");
        let yaml = render_compose(&def, "picopypi-builder:armv7l", Path::new("repos"))
            .expect("render");

        let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).expect("parse");
        let service = &parsed["services"]["build"];
        assert_eq!(service["platform"].as_str(), Some("linux/arm/v7"));
        assert_eq!(service["image"].as_str(), Some("picopypi-builder:armv7l"));
        assert_eq!(
            service["volumes"][0].as_str(),
            Some("./repos:/home/builder/repos")
        );
        assert_eq!(service["build"]["dockerfile"].as_str(), Some("Dockerfile"));
    }

    #[test]
    fn compose_keeps_absolute_host_path() {
        let def = ImageDefinition::armv7l("build_armv7l.py").expect("definition");
        let yaml =
            render_compose(&def, "img:1", Path::new("/host/src")).expect("render");
        assert!(yaml.contains("/host/src:/home/builder/repos"));
    }
}
