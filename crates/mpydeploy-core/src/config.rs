//! Configuration module for mpydeploy.
//!
//! Provides typed configuration structs that map to the YAML configuration
//! file, with loading, validation, defaults, and environment overrides for
//! the connection settings.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for mpydeploy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub deploy: DeployConfig,
    pub serial: SerialConfig,
    pub webrepl: WebreplConfig,
    pub logging: LoggingConfig,
}

/// Deployment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Directory holding the compiled artifacts to deploy.
    pub source_dir: PathBuf,
    /// Device paths exempt from deletion, relative to the device root.
    pub protected_files: Vec<String>,
    /// Maximum number of local files hashed concurrently.
    pub scan_concurrency: usize,
}

/// Serial (mpremote) connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Serial device to connect to. `None` selects the first discovered
    /// device.
    pub device: Option<String>,
    /// Name or path of the mpremote executable.
    pub mpremote_bin: String,
}

/// WebREPL connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebreplConfig {
    /// Device hostname or IP address.
    pub host: String,
    /// WebREPL TCP port.
    pub port: u16,
    /// WebREPL password. `None` means the client will prompt.
    pub password: Option<String>,
    /// Name or path of the WebREPL client executable.
    pub client_bin: String,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/mpydeploy/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("mpydeploy")
            .join("config.yaml")
    }

    /// Apply connection overrides from the environment.
    ///
    /// Recognized variables: `MPREMOTE_DEVICE`, `WEBREPL_HOST`,
    /// `WEBREPL_PORT`, `WEBREPL_PASSWORD`. An unparseable `WEBREPL_PORT`
    /// is ignored rather than failing the run.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(device) = std::env::var("MPREMOTE_DEVICE") {
            if !device.is_empty() {
                self.serial.device = Some(device);
            }
        }
        if let Ok(host) = std::env::var("WEBREPL_HOST") {
            if !host.is_empty() {
                self.webrepl.host = host;
            }
        }
        if let Ok(port) = std::env::var("WEBREPL_PORT") {
            if let Ok(port) = port.parse() {
                self.webrepl.port = port;
            }
        }
        if let Ok(password) = std::env::var("WEBREPL_PASSWORD") {
            if !password.is_empty() {
                self.webrepl.password = Some(password);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

// Config derives Default because all its fields implement Default.
// (clippy::derivable_impls)

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("mpy_xtensa"),
            protected_files: vec!["webrepl_cfg.py".to_string()],
            scan_concurrency: 8,
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: None,
            mpremote_bin: "mpremote".to_string(),
        }
    }
}

impl Default for WebreplConfig {
    fn default() -> Self {
        Self {
            host: "micropython.local".to_string(),
            port: 8266,
            password: None,
            client_bin: "webrepl_cli.py".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"deploy.scan_concurrency"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        use crate::domain::DevicePath;

        let mut errors = Vec::new();

        // --- deploy ---
        if self.deploy.source_dir.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "deploy.source_dir".into(),
                message: "must not be empty".into(),
            });
        }
        if self.deploy.scan_concurrency == 0 {
            errors.push(ValidationError {
                field: "deploy.scan_concurrency".into(),
                message: "must be greater than 0".into(),
            });
        }
        for protected in &self.deploy.protected_files {
            if let Err(e) = DevicePath::new(protected.clone()) {
                errors.push(ValidationError {
                    field: "deploy.protected_files".into(),
                    message: e.to_string(),
                });
            }
        }

        // --- serial ---
        if self.serial.mpremote_bin.is_empty() {
            errors.push(ValidationError {
                field: "serial.mpremote_bin".into(),
                message: "must not be empty".into(),
            });
        }

        // --- webrepl ---
        if self.webrepl.host.is_empty() {
            errors.push(ValidationError {
                field: "webrepl.host".into(),
                message: "must not be empty".into(),
            });
        }
        if self.webrepl.port == 0 {
            errors.push(ValidationError {
                field: "webrepl.port".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.webrepl.client_bin.is_empty() {
            errors.push(ValidationError {
                field: "webrepl.client_bin".into(),
                message: "must not be empty".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }

    /// The protected-file set as validated domain paths.
    ///
    /// Call after [`Config::validate`]; entries that do not parse are
    /// dropped here.
    pub fn protected_files(&self) -> crate::domain::ProtectedFiles {
        use crate::domain::DevicePath;

        crate::domain::ProtectedFiles::new(
            self.deploy
                .protected_files
                .iter()
                .filter_map(|p| DevicePath::new(p.clone()).ok()),
        )
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
