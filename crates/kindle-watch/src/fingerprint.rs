//! File fingerprints
//!
//! Provides [`Fingerprint`], the per-file modification marker compared
//! between two change checks, and [`ContentDigest`], a 32-byte Blake3 digest
//! of file contents.

use crate::error::WatchError;
use std::fmt::{self, Display, Formatter};
use std::path::Path;
use std::time::SystemTime;

/// What a fingerprint captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintMode {
    /// Modification time and length (one `stat` per file)
    #[default]
    Metadata,

    /// Metadata plus a Blake3 digest of the contents
    Content,
}

/// A 32-byte content digest (Blake3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// Compute digest of arbitrary data
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Get reference to the underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for ContentDigest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Modification marker of one watched file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    /// Last modification time, when the platform reports one
    pub modified: Option<SystemTime>,

    /// File length in bytes
    pub len: u64,

    /// Content digest, in [`FingerprintMode::Content`] only
    pub digest: Option<ContentDigest>,
}

impl Fingerprint {
    /// Fingerprint `path`, or `None` if it does not exist
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read
    pub fn of(path: &Path, mode: FingerprintMode) -> Result<Option<Self>, WatchError> {
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(WatchError::io(path, err)),
        };

        let digest = match mode {
            FingerprintMode::Metadata => None,
            FingerprintMode::Content => {
                let bytes = std::fs::read(path).map_err(|err| WatchError::io(path, err))?;
                Some(ContentDigest::compute(&bytes))
            }
        };

        Ok(Some(Self {
            modified: metadata.modified().ok(),
            len: metadata.len(),
            digest,
        }))
    }
}
