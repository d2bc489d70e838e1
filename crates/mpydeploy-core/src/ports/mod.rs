//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the boundaries of the domain core. The transport port is the
//! driven (secondary) port implemented by the serial and WebREPL adapters.

pub mod device_transport;

pub use device_transport::{DeviceInfo, IDeviceTransport, TransportCapability};
