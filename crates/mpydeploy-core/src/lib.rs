//! mpydeploy Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `Manifest`, `ChangePlan`, `ApplyReport`, `ProtectedFiles`
//! - **Diff engine** - pure reconciliation of local vs remote manifests
//! - **Port definitions** - the `IDeviceTransport` trait adapters implement
//! - **Configuration** - typed YAML config with env overrides
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure logic with no I/O. The transport port
//! defines the interface that the serial and WebREPL adapter crate
//! implements; the engine crate orchestrates domain logic through it.

pub mod config;
pub mod diff;
pub mod domain;
pub mod ports;
