//! mpydeploy Engine - The deployment pipeline
//!
//! This crate contains the use-case layer of the deployment tool:
//! - **Manifest builder** (`scanner`) - hashes the local artifact tree
//! - **Remote prober** (`prober`) - captures the device's file state
//! - **Apply engine** (`apply`) - executes a change plan on the device
//! - **Dry-run reporter** (`report`) - renders a plan without touching
//!   the device
//! - **Pipeline** (`pipeline`) - wires the stages into one run
//!
//! All device access goes through the `IDeviceTransport` port from
//! `mpydeploy-core`; this crate never talks to hardware directly.

pub mod apply;
pub mod pipeline;
pub mod prober;
pub mod report;
pub mod scanner;

use mpydeploy_core::domain::DomainError;
use thiserror::Error;

/// Errors that abort a deployment run before any device mutation
///
/// Failures during apply are not an `Err`: they are recorded per-operation
/// in the `ApplyReport` so a partial run stays fully accountable.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A domain value failed validation
    #[error("Validation error: {0}")]
    Validation(#[from] DomainError),

    /// The local artifact tree could not be read or hashed
    #[error("Local scan failed: {0}")]
    Scan(#[source] anyhow::Error),

    /// The device could not be reached or its state could not be captured
    #[error("Remote probe failed: {0}")]
    Probe(#[source] anyhow::Error),
}

pub use apply::ApplyEngine;
pub use pipeline::{DeployEngine, DeployPlan};
pub use prober::probe_remote;
pub use report::render_plan;
pub use scanner::build_local_manifest;
