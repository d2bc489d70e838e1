//! Domain entities and business logic
//!
//! This module contains the core domain types for mpydeploy:
//! - Newtypes for validated device paths and content digests
//! - Manifest types describing local and remote file state
//! - The change plan produced by the diff engine
//! - The protected-file deletion policy
//! - Deployment run state tracking and apply reports
//! - The persisted version-manifest reader
//! - Domain-specific error types

pub mod errors;
pub mod manifest;
pub mod newtypes;
pub mod plan;
pub mod policy;
pub mod run;
pub mod version_manifest;

// Re-export commonly used types
pub use errors::DomainError;
pub use manifest::{Manifest, ManifestEntry, RemoteState};
pub use newtypes::{ContentDigest, DevicePath, RunId};
pub use plan::ChangePlan;
pub use policy::ProtectedFiles;
pub use run::{ApplyReport, Operation, OperationFailure, RunState};
pub use version_manifest::{VersionManifest, VERSION_MANIFEST_FILE};
