//! Scanned resource descriptors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A SHA-256 content fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(pub [u8; 32]);

impl Fingerprint {
    /// Returns the raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the lowercase hex form of the digest.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Metadata for a single resource, captured once per run.
///
/// The `identity` is what the diff engine keys on: the published URI when the
/// configuration has a URL prefix, otherwise the absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Stable identity (URI or absolute path).
    pub identity: String,
    /// Location the resource was read from.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
    /// Content fingerprint, if computed.
    pub fingerprint: Option<Fingerprint>,
    /// Free-form metadata supplied by the resource source.
    pub metadata: BTreeMap<String, String>,
}

impl ResourceDescriptor {
    /// Creates a descriptor without fingerprint or metadata.
    pub fn new(
        identity: impl Into<String>,
        path: impl Into<PathBuf>,
        size: u64,
        modified: SystemTime,
    ) -> Self {
        Self {
            identity: identity.into(),
            path: path.into(),
            size,
            modified,
            fingerprint: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Sets the content fingerprint.
    #[must_use]
    pub fn with_fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns the resource path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if `other` describes different content.
    ///
    /// Fingerprints win when both sides carry one; otherwise size and
    /// modification time are compared.
    #[must_use]
    pub fn differs_from(&self, other: &ResourceDescriptor) -> bool {
        match (&self.fingerprint, &other.fingerprint) {
            (Some(a), Some(b)) => a != b,
            _ => self.size != other.size || self.modified != other.modified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn descriptor(size: u64, secs: u64) -> ResourceDescriptor {
        ResourceDescriptor::new(
            "http://example.com/a.txt",
            "/data/a.txt",
            size,
            UNIX_EPOCH + Duration::from_secs(secs),
        )
    }

    #[test]
    fn fingerprint_hex() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xab;
        bytes[31] = 0x01;
        let hex = Fingerprint(bytes).to_hex();
        assert_eq!(hex.len(), 64);
        assert!(hex.starts_with("ab00"));
        assert!(hex.ends_with("01"));
    }

    #[test]
    fn fingerprint_wins_over_timestamp() {
        let a = descriptor(10, 100).with_fingerprint(Fingerprint([1; 32]));
        let b = descriptor(10, 200).with_fingerprint(Fingerprint([1; 32]));
        assert!(!a.differs_from(&b));

        let c = descriptor(10, 100).with_fingerprint(Fingerprint([2; 32]));
        assert!(a.differs_from(&c));
    }

    #[test]
    fn falls_back_to_size_and_time() {
        let a = descriptor(10, 100);
        assert!(!a.differs_from(&descriptor(10, 100)));
        assert!(a.differs_from(&descriptor(11, 100)));
        assert!(a.differs_from(&descriptor(10, 101)));

        // One side without a fingerprint still compares size and time.
        let b = descriptor(10, 100).with_fingerprint(Fingerprint([9; 32]));
        assert!(!a.differs_from(&b));
    }

    #[test]
    fn metadata_builder() {
        let d = descriptor(1, 1).with_metadata("mime", "text/plain");
        assert_eq!(d.metadata.get("mime").map(String::as_str), Some("text/plain"));
    }
}
