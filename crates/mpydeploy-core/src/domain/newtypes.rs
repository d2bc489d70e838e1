//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for device paths, content
//! digests, and run identifiers. Each newtype ensures data validity at
//! construction time, so the diff and apply engines never see a malformed
//! or unsafe path.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

// ============================================================================
// DevicePath
// ============================================================================

/// A validated relative path on the device filesystem
///
/// DevicePath ensures the path is:
/// - Relative (no leading `/`)
/// - Slash-normalized (forward slashes, no empty or `.`/`..` components)
/// - Case-sensitive as-is (the device filesystem is case-sensitive)
///
/// Construction is the single validation point for path safety: absolute
/// paths and traversal sequences are rejected here, before any diffing or
/// transport call can see them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DevicePath(String);

impl DevicePath {
    /// Create a new DevicePath
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPath` if the path is empty, absolute,
    /// contains backslashes, NUL bytes, empty components, or `.`/`..`
    /// components.
    pub fn new(path: impl Into<String>) -> Result<Self, DomainError> {
        let path = path.into();

        if path.is_empty() {
            return Err(DomainError::InvalidPath(
                "Device path cannot be empty".to_string(),
            ));
        }

        if path.starts_with('/') {
            return Err(DomainError::InvalidPath(format!(
                "Device path must be relative: {path}"
            )));
        }

        if path.ends_with('/') {
            return Err(DomainError::InvalidPath(format!(
                "Device path cannot end with '/': {path}"
            )));
        }

        if path.contains('\\') {
            return Err(DomainError::InvalidPath(format!(
                "Device path must use forward slashes: {path}"
            )));
        }

        if path.contains('\0') {
            return Err(DomainError::InvalidPath(
                "Device path contains NUL byte".to_string(),
            ));
        }

        for component in path.split('/') {
            if component.is_empty() {
                return Err(DomainError::InvalidPath(format!(
                    "Device path contains empty component: {path}"
                )));
            }
            if component == "." || component == ".." {
                return Err(DomainError::InvalidPath(format!(
                    "Device path contains traversal component: {path}"
                )));
            }
        }

        Ok(Self(path))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the parent directory, or `None` for a root-level path
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.0.rfind('/').map(|idx| Self(self.0[..idx].to_string()))
    }

    /// All ancestor directories, outermost first
    ///
    /// `lib/drivers/pump.mpy` yields `lib`, `lib/drivers`. A root-level
    /// path yields nothing. The ordering lets callers create directories
    /// parents-before-children.
    #[must_use]
    pub fn ancestors(&self) -> Vec<Self> {
        let mut out = Vec::new();
        let mut idx = 0;
        while let Some(pos) = self.0[idx..].find('/') {
            idx += pos;
            out.push(Self(self.0[..idx].to_string()));
            idx += 1;
        }
        out
    }

    /// The final path component (file name)
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl Display for DevicePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DevicePath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DevicePath {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<DevicePath> for String {
    fn from(path: DevicePath) -> Self {
        path.0
    }
}

// ============================================================================
// ContentDigest
// ============================================================================

/// SHA-256 content digest in lowercase hex
///
/// A fingerprint of file content used for equality comparison between local
/// and remote files, not for security. Format: exactly 64 lowercase hex
/// characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Hex length of a SHA-256 digest
    const HEX_LEN: usize = 64;

    /// Create a new ContentDigest
    ///
    /// # Errors
    /// Returns `DomainError::InvalidDigest` if the string is not 64
    /// lowercase hex characters.
    pub fn new(digest: impl Into<String>) -> Result<Self, DomainError> {
        let digest = digest.into();

        if digest.len() != Self::HEX_LEN {
            return Err(DomainError::InvalidDigest(format!(
                "expected {} hex chars, got {}",
                Self::HEX_LEN,
                digest.len()
            )));
        }

        if !digest
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        {
            return Err(DomainError::InvalidDigest(format!(
                "not lowercase hex: {digest}"
            )));
        }

        Ok(Self(digest))
    }

    /// Create a digest from raw SHA-256 output bytes
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        use std::fmt::Write;

        let mut hex = String::with_capacity(Self::HEX_LEN);
        for b in bytes {
            // Writing to a String cannot fail.
            let _ = write!(hex, "{b:02x}");
        }
        Self(hex)
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ContentDigest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ContentDigest {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ContentDigest> for String {
    fn from(digest: ContentDigest) -> Self {
        digest.0
    }
}

// ============================================================================
// RunId
// ============================================================================

/// Identifier for a single deployment run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new random RunId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a RunId from an existing UUID
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID value
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RunId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::InvalidId(format!("Invalid RunId: {e}")))
    }
}

// ============================================================================
// Tests
// ============================================================================
