//! Image build directives.
//!
//! Each variant renders to exactly one Containerfile instruction. Argument
//! lists use the exec (JSON array) form so no shell reinterprets them.

use std::fmt;

/// A single layer-producing or metadata instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Base image selection.
    From {
        /// Digest-pinned reference.
        image: String,
    },
    /// Shell command executed at build time.
    Run {
        /// Command line passed to `/bin/sh -c`.
        command: String,
    },
    /// Process-wide environment.
    Env {
        /// Variables in declaration order.
        vars: Vec<(String, String)>,
    },
    /// Execution identity for later directives and the container process.
    User {
        /// Account name.
        name: String,
    },
    /// Default working directory.
    Workdir {
        /// Absolute path.
        path: String,
    },
    /// File copied from the build context.
    Copy {
        /// Path relative to the context root.
        source: String,
        /// Absolute destination in the image.
        destination: String,
    },
    /// Exec-form entrypoint.
    Entrypoint {
        /// Program followed by its fixed arguments.
        argv: Vec<String>,
    },
    /// Declared mount points.
    Volume {
        /// Absolute container paths.
        paths: Vec<String>,
    },
    /// Image metadata.
    Label {
        /// Key/value pairs in declaration order.
        labels: Vec<(String, String)>,
    },
}

impl Directive {
    /// Instruction keyword, e.g. `FROM`.
    #[must_use]
    pub const fn keyword(&self) -> &'static str {
        match self {
            Self::From { .. } => "FROM",
            Self::Run { .. } => "RUN",
            Self::Env { .. } => "ENV",
            Self::User { .. } => "USER",
            Self::Workdir { .. } => "WORKDIR",
            Self::Copy { .. } => "COPY",
            Self::Entrypoint { .. } => "ENTRYPOINT",
            Self::Volume { .. } => "VOLUME",
            Self::Label { .. } => "LABEL",
        }
    }
}

/// Double-quotes a value with JSON string escaping.
fn quote(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

fn json_array(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|s| quote(s)).collect();
    format!("[{}]", quoted.join(", "))
}

fn pairs(items: &[(String, String)]) -> String {
    items
        .iter()
        .map(|(k, v)| format!("{k}={}", quote(v)))
        .collect::<Vec<_>>()
        .join(" ")
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = self.keyword();
        match self {
            Self::From { image } => write!(f, "{keyword} {image}"),
            Self::Run { command } => write!(f, "{keyword} {command}"),
            Self::Env { vars } => write!(f, "{keyword} {}", pairs(vars)),
            Self::Label { labels } => write!(f, "{keyword} {}", pairs(labels)),
            Self::User { name } => write!(f, "{keyword} {name}"),
            Self::Workdir { path } => write!(f, "{keyword} {path}"),
            Self::Copy {
                source,
                destination,
            } => write!(f, "{keyword} {source} {destination}"),
            Self::Entrypoint { argv } => write!(f, "{keyword} {}", json_array(argv)),
            Self::Volume { paths } => write!(f, "{keyword} {}", json_array(paths)),
        }
    }
}
