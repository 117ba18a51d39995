//! Runtime configuration.
//!
//! Loaded from YAML with every field optional, then adjusted from the
//! environment:
//!
//! | Variable                  | Field                   |
//! |---------------------------|-------------------------|
//! | `LAPTRACE_UDP_PORT`       | `listener.port`         |
//! | `LAPTRACE_ARCHIVE_DIR`    | `archive.directory`     |
//! | `LAPTRACE_IMPORT_WORKERS` | `import.workers`        |
//!
//! ```rust
//! use laptrace::Config;
//!
//! let config = Config::from_yaml_str("listener:\n  port: 20778\n").unwrap();
//! assert_eq!(config.listener.port, 20778);
//! assert_eq!(config.resample.ticks_per_second, 50);
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, TelemetryError};
use crate::protocol::f1_24::MAX_CONSUMED_PACKET_SIZE;
use crate::reconstruct::{DEFAULT_TICKS_PER_SECOND, Resampler};

pub const ENV_UDP_PORT: &str = "LAPTRACE_UDP_PORT";
pub const ENV_ARCHIVE_DIR: &str = "LAPTRACE_ARCHIVE_DIR";
pub const ENV_IMPORT_WORKERS: &str = "LAPTRACE_IMPORT_WORKERS";

/// Default UDP port of the game's telemetry broadcast.
pub const DEFAULT_UDP_PORT: u16 = 20777;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listener: ListenerConfig,
    pub archive: ArchiveConfig,
    pub import: ImportConfig,
    pub resample: ResampleConfig,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            archive: ArchiveConfig::default(),
            import: ImportConfig::default(),
            resample: ResampleConfig::default(),
            log_filter: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    pub bind_address: IpAddr,
    pub port: u16,
    /// Upper bound on one receive wait, so cancellation is seen promptly.
    pub recv_timeout_ms: u64,
    pub max_datagram_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_UDP_PORT,
            recv_timeout_ms: 1000,
            max_datagram_bytes: 2048,
        }
    }
}

impl ListenerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub directory: PathBuf,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self { directory: PathBuf::from("data") }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Sessions reconstructed concurrently during a full import.
    pub workers: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self { workers: 1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleConfig {
    pub ticks_per_second: u32,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self { ticks_per_second: DEFAULT_TICKS_PER_SECOND }
    }
}

impl Config {
    /// Parse YAML; missing sections and fields take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml_ng::from_str(yaml)
            .map_err(|e| TelemetryError::config(format!("failed to parse YAML: {e}")))
    }

    /// Read a YAML file, apply environment overrides and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            TelemetryError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        let mut config = Self::from_yaml_str(&yaml)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = parse_override::<u16>(&lookup, ENV_UDP_PORT) {
            self.listener.port = port;
        }
        if let Some(directory) = lookup(ENV_ARCHIVE_DIR).filter(|v| !v.trim().is_empty()) {
            self.archive.directory = PathBuf::from(directory);
        }
        if let Some(workers) = parse_override::<usize>(&lookup, ENV_IMPORT_WORKERS) {
            self.import.workers = workers;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.resample.ticks_per_second == 0 {
            return Err(TelemetryError::config("resample.ticks_per_second must be positive"));
        }
        if self.listener.recv_timeout_ms == 0 {
            return Err(TelemetryError::config("listener.recv_timeout_ms must be positive"));
        }
        if self.listener.max_datagram_bytes < MAX_CONSUMED_PACKET_SIZE {
            return Err(TelemetryError::config(format!(
                "listener.max_datagram_bytes must be at least {MAX_CONSUMED_PACKET_SIZE}, got {}",
                self.listener.max_datagram_bytes
            )));
        }
        if self.import.workers == 0 {
            return Err(TelemetryError::config("import.workers must be at least 1"));
        }
        Ok(())
    }

    pub fn resampler(&self) -> Resampler {
        Resampler::new(self.resample.ticks_per_second)
    }
}

fn parse_override<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "Ignoring unparsable environment override");
            None
        }
    }
}
