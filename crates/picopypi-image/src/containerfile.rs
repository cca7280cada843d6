//! Containerfile rendering.

use std::fmt;

use picopypi_common::constants;
use picopypi_common::error::Result;
use picopypi_common::types::Sha256Digest;

use crate::definition::ImageDefinition;
use crate::directive::Directive;

/// Rendered build sequence followed by a provenance `LABEL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Containerfile {
    directives: Vec<Directive>,
    labels: Vec<(String, String)>,
}

impl Containerfile {
    /// Builds the Containerfile of a definition, labelled with its base
    /// image name and digest.
    ///
    /// # Errors
    ///
    /// Returns an error if the definition's directives cannot be produced.
    pub fn from_definition(definition: &ImageDefinition) -> Result<Self> {
        let base = definition.base();
        Ok(Self {
            directives: definition.directives()?,
            labels: vec![
                (constants::LABEL_BASE_NAME.to_string(), base.name().to_string()),
                (constants::LABEL_BASE_DIGEST.to_string(), base.digest().to_string()),
            ],
        })
    }

    /// Adds the definition fingerprint label.
    #[must_use]
    pub fn with_fingerprint(mut self, fingerprint: &Sha256Digest) -> Self {
        self.labels.push((
            constants::LABEL_FINGERPRINT.to_string(),
            fingerprint.to_string(),
        ));
        self
    }

    /// All directives, including the trailing label.
    #[must_use]
    pub fn directives(&self) -> Vec<Directive> {
        let mut all = self.directives.clone();
        all.push(Directive::Label {
            labels: self.labels.clone(),
        });
        all
    }
}

impl fmt::Display for Containerfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for directive in self.directives() {
            writeln!(f, "{directive}")?;
        }
        Ok(())
    }
}
