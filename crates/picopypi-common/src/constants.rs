//! Image contract constants and default paths.

use std::path::PathBuf;
use std::sync::OnceLock;

/// Pinned `manylinux_2_31` ARMv7l base image.
pub const MANYLINUX_ARMV7L_IMAGE: &str = "quay.io/pypa/manylinux_2_31_armv7l\
     @sha256:3d1bb16c69d0acafcb90fdbaa5e1b9a2d6634089006d76e2427ca6cdae136be0";

/// Platform the build image targets.
pub const ARMV7L_PLATFORM: &str = "linux/arm/v7";

/// Name of the non-root build account.
pub const BUILD_USER: &str = "builder";

/// Home directory of the build account, also the default working directory.
pub const BUILD_HOME: &str = "/home/builder";

/// Login shell of the build account.
pub const BUILD_SHELL: &str = "/bin/bash";

/// Shared directory for source repositories; the single declared volume.
pub const REPOS_DIR: &str = "/home/builder/repos";

/// Permission mode applied to [`REPOS_DIR`].
pub const REPOS_DIR_MODE: u32 = 0o755;

/// Absolute path the entrypoint script is installed to.
pub const ENTRYPOINT_PATH: &str = "/entrypoint.py";

/// Interpreter that launches the entrypoint.
pub const ENTRYPOINT_INTERPRETER: &str = "/usr/bin/python3";

/// Default host-side entrypoint script name.
pub const DEFAULT_ENTRYPOINT_SCRIPT: &str = "build_armv7l.py";

/// Process-wide environment fixed in the image, in declaration order.
pub const IMAGE_ENV: [(&str, &str); 2] = [("DEBIAN_FRONTEND", "noninteractive"), ("CI", "1")];

/// Environment marker telling the entrypoint it already runs inside the image.
pub const BUILDER_MARKER_ENV: &str = "PICOPYPI_BUILDER_DOCKER";

/// Default tag of the locally built image.
pub const DEFAULT_IMAGE_TAG: &str = "picopypi-builder:armv7l";

/// OCI annotation naming the base image.
pub const LABEL_BASE_NAME: &str = "org.opencontainers.image.base.name";

/// OCI annotation carrying the base image digest.
pub const LABEL_BASE_DIGEST: &str = "org.opencontainers.image.base.digest";

/// Label carrying the definition fingerprint.
pub const LABEL_FINGERPRINT: &str = "io.picopypi.definition.sha256";

/// Name of the Containerfile inside the build context.
pub const CONTAINERFILE_NAME: &str = "Dockerfile";

/// Default compose file name.
pub const COMPOSE_FILE_NAME: &str = "docker-compose.yml";

/// Name of the compose service that runs the build image.
pub const COMPOSE_SERVICE: &str = "build";

/// Default container engine binary.
pub const DEFAULT_ENGINE: &str = "docker";

/// SHA-256 digest length in hex characters.
pub const SHA256_HEX_LENGTH: usize = 64;

/// SHA-1 digest length in hex characters.
pub const SHA1_HEX_LENGTH: usize = 40;

/// Interpreter ABIs the manylinux image ships.
pub const INTERPRETERS: [&str; 9] = [
    "cp38", "cp39", "cp310", "cp311", "cp312", "cp313", "cp313t", "cp314", "cp314t",
];

/// ABI used when none is requested.
pub const DEFAULT_ABI: &str = "cp312";

/// Application name used in CLI output and data directories.
pub const APP_NAME: &str = "picopypi";

/// Fallback data directory when no home directory is available.
pub const SYSTEM_DATA_DIR: &str = "/var/lib/picopypi";

/// Returns the data directory, preferring `$HOME/.picopypi`.
fn resolve_data_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
        let user_dir = PathBuf::from(home).join(format!(".{APP_NAME}"));
        if std::fs::create_dir_all(&user_dir).is_ok() {
            return user_dir;
        }
    }
    PathBuf::from(SYSTEM_DATA_DIR)
}

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the resolved data directory for this session.
pub fn data_dir() -> &'static PathBuf {
    DATA_DIR.get_or_init(resolve_data_dir)
}

/// Returns the default config file path.
pub fn default_config_file() -> PathBuf {
    data_dir().join("config.json")
}
