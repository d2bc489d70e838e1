//! Remote prober
//!
//! Captures the device's file state through the transport port. On an
//! introspectable transport the full remote tree is enumerated and hashed;
//! on an opaque transport the probe only verifies reachability and reports
//! the remote state as unknown.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use mpydeploy_core::domain::{Manifest, ManifestEntry, RemoteState};
use mpydeploy_core::ports::{IDeviceTransport, TransportCapability};

use crate::EngineError;

/// Capture the remote file state.
///
/// Reachability and listing failures are fatal: nothing has been mutated
/// yet and a wrong picture of the device would produce a wrong plan. A
/// per-file hash failure is not fatal; the file is recorded without a
/// digest and will be re-copied.
#[instrument(skip_all, fields(transport = %transport.describe()))]
pub async fn probe_remote(
    transport: &Arc<dyn IDeviceTransport>,
) -> Result<RemoteState, EngineError> {
    transport
        .check_reachable()
        .await
        .map_err(EngineError::Probe)?;

    if transport.capability() == TransportCapability::Opaque {
        debug!("opaque transport, remote state unknown");
        return Ok(RemoteState::Unknown);
    }

    let files = transport.list_files().await.map_err(EngineError::Probe)?;
    debug!(count = files.len(), "remote files listed");

    let mut manifest = Manifest::new();
    for path in files {
        match transport.hash_file(&path).await {
            Ok(Some(digest)) => {
                manifest.insert(ManifestEntry::new(path, digest));
            }
            Ok(None) => {
                warn!(path = %path, "device cannot hash file, will re-copy");
                manifest.insert(ManifestEntry::without_digest(path));
            }
            Err(e) => {
                warn!(path = %path, error = %e, "remote hash failed, will re-copy");
                manifest.insert(ManifestEntry::without_digest(path));
            }
        }
    }

    debug!(entries = manifest.len(), "remote manifest complete");
    Ok(RemoteState::Known(manifest))
}
