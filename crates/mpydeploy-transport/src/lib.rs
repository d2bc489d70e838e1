//! mpydeploy Transport - Device transport adapters
//!
//! Implements the `IDeviceTransport` port from `mpydeploy-core`:
//! - [`MpremoteTransport`] - serial connection via the external `mpremote`
//!   tool (introspectable)
//! - [`WebreplTransport`] - network connection via an external WebREPL
//!   command-line client (opaque)
//! - [`discovery`] - serial device enumeration via `mpremote connect list`
//!
//! Both adapters shell out to their external tool; nothing here speaks the
//! wire protocols directly.

pub mod discovery;
pub mod mpremote;
pub mod webrepl;

pub use discovery::{auto_select, discover_devices};
pub use mpremote::MpremoteTransport;
pub use webrepl::WebreplTransport;
