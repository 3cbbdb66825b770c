//! Content fingerprints used as the change-detection equality oracle.
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

/// Lowercase hex SHA-256 of the UTF-8 bytes of a normalized text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Fingerprint of a previously observed text.
    ///
    /// An empty text means no prior observation and yields `None`, which never
    /// equals any current fingerprint.
    pub fn of_previous(text: &str) -> Option<Self> {
        if text.is_empty() {
            None
        } else {
            Some(Self::of(text))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
