//! SHA-256 digests of finished archives.
//!
//! The archive is streamed through the hasher in fixed-size chunks so that
//! memory use does not grow with archive size.

use super::error::PackagingError;
use camino::Utf8Path;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io::Read;
use thiserror::Error;

/// Bytes read from the archive per hashing step.
pub const DIGEST_CHUNK_SIZE: usize = 1024 * 1024;

/// Algorithm label used in registry checksum strings.
pub const CHECKSUM_ALGORITHM: &str = "sha256";

/// Expected length of a hex-encoded SHA-256 digest.
const DIGEST_HEX_LEN: usize = 64;

/// A string that is not a lowercase 64-character hex digest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid SHA-256 digest: {reason}")]
pub struct InvalidDigest {
    reason: String,
}

/// A validated hex-encoded SHA-256 digest string.
///
/// # Examples
///
/// ```
/// use module_packager::archive::digest::Sha256Digest;
///
/// let digest = Sha256Digest::try_from("a".repeat(64)).expect("valid digest");
/// assert_eq!(digest.checksum(), format!("sha256:{}", "a".repeat(64)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Return the digest as a hex string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Format as `<algorithm>:<hex>`, the registry checksum notation.
    #[must_use]
    pub fn checksum(&self) -> String {
        format!("{CHECKSUM_ALGORITHM}:{}", self.0)
    }

    fn from_hasher(hasher: Sha256) -> Self {
        // Lowercase hex of a 32-byte digest always satisfies the invariant.
        Self(format!("{:x}", hasher.finalize()))
    }
}

impl TryFrom<&str> for Sha256Digest {
    type Error = InvalidDigest;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        validate_sha256(value)?;
        Ok(Self(value.to_owned()))
    }
}

impl TryFrom<String> for Sha256Digest {
    type Error = InvalidDigest;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate_sha256(&value)?;
        Ok(Self(value))
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn validate_sha256(value: &str) -> Result<(), InvalidDigest> {
    if value.len() != DIGEST_HEX_LEN {
        return Err(InvalidDigest {
            reason: format!(
                "expected {DIGEST_HEX_LEN} hex characters, got {}",
                value.len()
            ),
        });
    }
    if let Some(bad) = value
        .chars()
        .find(|c| !c.is_ascii_digit() && !('a'..='f').contains(c))
    {
        return Err(InvalidDigest {
            reason: format!("'{bad}' is not a lowercase hex digit"),
        });
    }
    Ok(())
}

/// Digest and byte length of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigest {
    /// SHA-256 of the file's bytes.
    pub sha256: Sha256Digest,
    /// Number of bytes hashed.
    pub size_bytes: u64,
}

/// Hash the file at `path` and count its bytes.
///
/// # Errors
///
/// Returns [`PackagingError::Io`] if the file cannot be opened or read.
pub fn digest_file(path: &Utf8Path) -> Result<FileDigest, PackagingError> {
    let file = fs::File::open(path).map_err(PackagingError::io(path))?;
    digest_reader(file).map_err(PackagingError::io(path))
}

/// Hash everything `reader` yields, [`DIGEST_CHUNK_SIZE`] bytes at a time.
///
/// # Errors
///
/// Propagates read failures from `reader`.
pub fn digest_reader(mut reader: impl Read) -> std::io::Result<FileDigest> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; DIGEST_CHUNK_SIZE];
    let mut size_bytes = 0u64;
    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
        size_bytes += bytes_read as u64;
    }
    Ok(FileDigest {
        sha256: Sha256Digest::from_hasher(hasher),
        size_bytes,
    })
}
