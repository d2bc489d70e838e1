//! CLI command implementations

pub mod config;
pub mod deploy;
pub mod devices;
pub mod status;
