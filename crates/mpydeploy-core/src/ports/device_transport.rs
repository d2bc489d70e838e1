//! Device transport port (driven/secondary port)
//!
//! This module defines the interface for talking to an embedded device.
//! The primary implementation drives a serial connection through the
//! `mpremote` tool; a second adapter drives a WebREPL network connection.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are
//!   adapter-specific and don't need domain-level classification.
//! - Uses `#[async_trait]` for async trait methods.
//! - A transport declares its capability once, at startup. Engines branch
//!   on the capability tag; they never feature-probe a live connection.
//!   An `Opaque` transport must still implement the introspection methods,
//!   but may reject them, and engines must not call them.

use std::path::Path;

use async_trait::async_trait;

use crate::domain::newtypes::{ContentDigest, DevicePath};

/// What a transport can do beyond writing files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCapability {
    /// Can enumerate and hash remote files, create directories, and delete
    Introspectable,
    /// Write-and-restart only; the remote tree is invisible
    Opaque,
}

impl std::fmt::Display for TransportCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportCapability::Introspectable => write!(f, "introspectable"),
            TransportCapability::Opaque => write!(f, "opaque"),
        }
    }
}

/// A discovered device, as reported by transport discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Connection endpoint (serial port path or network address)
    pub port: String,
    /// Human-readable description from the enumerator
    pub description: String,
}

/// Interface to a connected embedded device
///
/// One instance represents one device connection for the duration of a
/// deployment run. Methods take `&self`; implementations serialize access
/// internally if the underlying channel requires it.
#[async_trait]
pub trait IDeviceTransport: Send + Sync {
    /// The transport's capability, fixed for the life of the connection
    fn capability(&self) -> TransportCapability;

    /// Short human-readable description of the endpoint, for logs
    fn describe(&self) -> String;

    /// Verify the device is reachable and responsive
    async fn check_reachable(&self) -> anyhow::Result<()>;

    /// List every file under the device root, recursively
    ///
    /// Only meaningful on introspectable transports; opaque transports
    /// reject the call.
    async fn list_files(&self) -> anyhow::Result<Vec<DevicePath>>;

    /// Compute the content digest of a remote file
    ///
    /// Returns `Ok(None)` when the device cannot hash this particular file;
    /// the caller treats such files as changed.
    async fn hash_file(&self, path: &DevicePath) -> anyhow::Result<Option<ContentDigest>>;

    /// Ensure a directory exists on the device
    ///
    /// Succeeds if the directory already exists.
    async fn make_dir(&self, path: &DevicePath) -> anyhow::Result<()>;

    /// Copy a local file to the given remote path
    async fn copy_file(&self, local: &Path, remote: &DevicePath) -> anyhow::Result<()>;

    /// Delete a file from the device
    async fn delete_file(&self, path: &DevicePath) -> anyhow::Result<()>;

    /// Restart the device runtime so the new code takes effect
    async fn restart(&self) -> anyhow::Result<()>;
}
