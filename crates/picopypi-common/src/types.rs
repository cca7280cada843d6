//! Domain primitive types used across the picopypi workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{INTERPRETERS, SHA1_HEX_LENGTH, SHA256_HEX_LENGTH};
use crate::error::{PicopypiError, Result};

fn is_hex_of_len(value: &str, len: usize) -> bool {
    value.len() == len && value.chars().all(|c| c.is_ascii_hexdigit())
}

/// SHA-256 digest used for content addressing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Creates a digest from a hex string, with or without the `sha256:` prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a 64-character hex string.
    pub fn from_hex(hex: impl Into<String>) -> Result<Self> {
        let hex = hex.into();
        let bare = hex.strip_prefix("sha256:").unwrap_or(&hex);
        if !is_hex_of_len(bare, SHA256_HEX_LENGTH) {
            return Err(PicopypiError::config(format!(
                "invalid SHA-256 hex string: {hex}"
            )));
        }
        Ok(Self(bare.to_ascii_lowercase()))
    }

    /// Creates a digest from raw hash output.
    #[must_use]
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Returns the bare hex-encoded digest.
    #[must_use]
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self.0)
    }
}

impl TryFrom<String> for Sha256Digest {
    type Error = PicopypiError;

    fn try_from(value: String) -> Result<Self> {
        Self::from_hex(value)
    }
}

impl From<Sha256Digest> for String {
    fn from(value: Sha256Digest) -> Self {
        value.to_string()
    }
}

/// Image reference pinned to an exact content digest.
///
/// Accepts `name@sha256:<hex>` and `name:tag@sha256:<hex>`. References
/// that could resolve to a different image over time are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PinnedImage {
    name: String,
    tag: Option<String>,
    digest: Sha256Digest,
}

impl PinnedImage {
    /// Parses a digest-pinned image reference.
    ///
    /// # Errors
    ///
    /// Returns [`PicopypiError::InvalidReference`] when the digest is
    /// missing, uses another algorithm, or the name is empty.
    pub fn parse(reference: &str) -> Result<Self> {
        let invalid = |reason| PicopypiError::InvalidReference {
            reference: reference.to_string(),
            reason,
        };

        let (named, digest) = reference
            .split_once('@')
            .ok_or_else(|| invalid("missing @sha256 digest, mutable tags are not allowed"))?;
        let hex = digest
            .strip_prefix("sha256:")
            .ok_or_else(|| invalid("only sha256 digests are supported"))?;
        if !is_hex_of_len(hex, SHA256_HEX_LENGTH) {
            return Err(invalid("digest must be 64 hex characters"));
        }

        // A colon after the last slash separates the tag; earlier ones are registry ports.
        let last_slash = named.rfind('/').map_or(0, |i| i + 1);
        let (name, tag) = match named[last_slash..].rfind(':') {
            Some(i) => {
                let split = last_slash + i;
                (&named[..split], Some(named[split + 1..].to_string()))
            }
            None => (named, None),
        };
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(invalid("image name is empty or contains whitespace"));
        }
        if tag.as_deref().is_some_and(str::is_empty) {
            return Err(invalid("empty tag"));
        }

        Ok(Self {
            name: name.to_string(),
            tag,
            digest: Sha256Digest(hex.to_ascii_lowercase()),
        })
    }

    /// Repository name without tag or digest.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Informational tag, if one accompanied the digest.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Content digest the reference resolves to.
    #[must_use]
    pub const fn digest(&self) -> &Sha256Digest {
        &self.digest
    }
}

impl fmt::Display for PinnedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{}:{tag}@{}", self.name, self.digest),
            None => write!(f, "{}@{}", self.name, self.digest),
        }
    }
}

impl FromStr for PinnedImage {
    type Err = PicopypiError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PinnedImage {
    type Error = PicopypiError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<PinnedImage> for String {
    fn from(value: PinnedImage) -> Self {
        value.to_string()
    }
}

/// Git repository URL; GitHub short forms are expanded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Repository(String);

impl Repository {
    /// Returns the full clone URL.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Repository {
    type Err = PicopypiError;

    fn from_str(value: &str) -> Result<Self> {
        if !value.contains('/') {
            return Err(PicopypiError::config(format!(
                "invalid repository: {value:?}"
            )));
        }
        if value.contains(':') {
            Ok(Self(value.to_string()))
        } else {
            Ok(Self(format!("https://github.com/{value}")))
        }
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Full sha1 or sha256 git revision.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Revision(String);

impl Revision {
    /// Returns the revision hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Revision {
    type Err = PicopypiError;

    fn from_str(value: &str) -> Result<Self> {
        if is_hex_of_len(value, SHA1_HEX_LENGTH) || is_hex_of_len(value, SHA256_HEX_LENGTH) {
            Ok(Self(value.to_string()))
        } else {
            Err(PicopypiError::config(format!("invalid digest: {value:?}")))
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// CPython ABI tag available in the manylinux image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Abi(&'static str);

impl Abi {
    /// Returns the ABI tag, e.g. `cp313t`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }

    /// Interpreter path inside the manylinux image.
    #[must_use]
    pub fn python_path(&self) -> String {
        let version = self.0.trim_end_matches(['t', 'm']);
        format!("/opt/python/{version}-{}/bin/python", self.0)
    }
}

impl FromStr for Abi {
    type Err = PicopypiError;

    fn from_str(value: &str) -> Result<Self> {
        INTERPRETERS
            .into_iter()
            .find(|abi| *abi == value)
            .map(Self)
            .ok_or_else(|| {
                PicopypiError::config(format!(
                    "unknown abi {value:?}, expected one of {}",
                    INTERPRETERS.join(", ")
                ))
            })
    }
}

impl fmt::Display for Abi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX: &str = "3d1bb16c69d0acafcb90fdbaa5e1b9a2d6634089006d76e2427ca6cdae136be0";

    #[test]
    fn pinned_image_parses_name_and_digest() {
        let image = PinnedImage::parse(&format!("quay.io/pypa/manylinux_2_31_armv7l@sha256:{HEX}"))
            .expect("parse");
        assert_eq!(image.name(), "quay.io/pypa/manylinux_2_31_armv7l");
        assert_eq!(image.tag(), None);
        assert_eq!(image.digest().as_hex(), HEX);
    }

    #[test]
    fn pinned_image_keeps_registry_port_in_name() {
        let image =
            PinnedImage::parse(&format!("localhost:5000/base:2024@sha256:{HEX}")).expect("parse");
        assert_eq!(image.name(), "localhost:5000/base");
        assert_eq!(image.tag(), Some("2024"));
        assert_eq!(
            image.to_string(),
            format!("localhost:5000/base:2024@sha256:{HEX}")
        );
    }

    #[test]
    fn pinned_image_rejects_tag_only_reference() {
        let err = PinnedImage::parse("quay.io/pypa/manylinux_2_31_armv7l:latest").unwrap_err();
        assert!(matches!(err, PicopypiError::InvalidReference { .. }));
    }

    #[test]
    fn pinned_image_rejects_short_digest() {
        assert!(PinnedImage::parse("alpine@sha256:abc123").is_err());
    }

    #[test]
    fn pinned_image_rejects_other_algorithms() {
        assert!(PinnedImage::parse(&format!("alpine@sha512:{HEX}")).is_err());
    }

    #[test]
    fn pinned_image_deserializes_from_string() {
        let json = format!("\"alpine@sha256:{HEX}\"");
        let image: PinnedImage = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(image.name(), "alpine");
    }

    #[test]
    fn sha256_digest_accepts_prefixed_form() {
        let digest = Sha256Digest::from_hex(format!("sha256:{HEX}")).expect("digest");
        assert_eq!(digest.to_string(), format!("sha256:{HEX}"));
    }

    #[test]
    fn repository_expands_github_short_form() {
        let repo: Repository = "yt-dlp/picopypi".parse().expect("repo");
        assert_eq!(repo.as_str(), "https://github.com/yt-dlp/picopypi");
    }

    #[test]
    fn repository_keeps_full_urls() {
        let repo: Repository = "git@github.com:yt-dlp/picopypi.git".parse().expect("repo");
        assert_eq!(repo.as_str(), "git@github.com:yt-dlp/picopypi.git");
    }

    #[test]
    fn repository_without_slash_is_rejected() {
        assert!("picopypi".parse::<Repository>().is_err());
    }

    #[test]
    fn revision_accepts_sha1_and_sha256() {
        assert!("a".repeat(40).parse::<Revision>().is_ok());
        assert!(HEX.parse::<Revision>().is_ok());
        assert!("abc123".parse::<Revision>().is_err());
        assert!("g".repeat(40).parse::<Revision>().is_err());
    }

    #[test]
    fn abi_maps_to_manylinux_python() {
        let abi: Abi = "cp313t".parse().expect("abi");
        assert_eq!(abi.python_path(), "/opt/python/cp313-cp313t/bin/python");
        let abi: Abi = "cp310".parse().expect("abi");
        assert_eq!(abi.python_path(), "/opt/python/cp310-cp310/bin/python");
    }

    #[test]
    fn abi_rejects_unknown_tags() {
        assert!("cp27".parse::<Abi>().is_err());
    }
}
