//! Error types for telemetry capture and reconstruction.
//!
//! All errors implement `std::error::Error` and carry enough context to decide
//! how far a failure should propagate.
//!
//! ## Error Categories
//!
//! - **Decode Errors**: a single datagram was malformed or of an unknown type;
//!   the packet is dropped and processing continues
//! - **Session Errors**: a session cannot be reconstructed (no player index,
//!   unreadable archive); only that session is affected
//! - **Storage Errors**: the storage collaborator rejected a write
//! - **Socket Errors**: the UDP port could not be bound or read
//! - **Config Errors**: invalid configuration values
//!
//! ## Propagation
//!
//! ```rust
//! use laptrace::TelemetryError;
//!
//! let error = TelemetryError::MissingPlayerIndex { session_id: 42 };
//! assert!(error.is_session_scoped());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

pub use crate::protocol::DecodeError;

/// Result type alias for telemetry operations.
pub type Result<T, E = TelemetryError> = std::result::Result<T, E>;

/// Main error type for telemetry operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TelemetryError {
    #[error("Packet decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("No player car index found in session {session_id}")]
    MissingPlayerIndex { session_id: u64 },

    #[error("Archive I/O error: {path}")]
    ArchiveIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed archive record in {path} at line {line}")]
    ArchiveFormat {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Storage operation failed: {reason}")]
    Storage {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Failed to bind UDP socket on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("UDP socket error")]
    Socket {
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },
}

impl TelemetryError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            TelemetryError::Storage { .. } => true,
            TelemetryError::ArchiveIo { .. } => true,
            TelemetryError::Socket { .. } => true,
            TelemetryError::Decode(_) => false,
            TelemetryError::MissingPlayerIndex { .. } => false,
            TelemetryError::ArchiveFormat { .. } => false,
            TelemetryError::Bind { .. } => false,
            TelemetryError::Config { .. } => false,
        }
    }

    /// Returns whether the failure is confined to a single session.
    ///
    /// The importer keeps going with the next session when this is true.
    pub fn is_session_scoped(&self) -> bool {
        matches!(
            self,
            TelemetryError::MissingPlayerIndex { .. }
                | TelemetryError::ArchiveIo { .. }
                | TelemetryError::ArchiveFormat { .. }
                | TelemetryError::Storage { .. }
                | TelemetryError::Decode(_)
        )
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TelemetryError::Decode(_) => vec![
                "Check the game's UDP format setting matches the decoder version",
                "Verify nothing else is sending datagrams to the telemetry port",
            ],
            TelemetryError::MissingPlayerIndex { .. } => vec![
                "Check the session archive contains packets from the player car",
                "Re-record the session with UDP telemetry enabled",
            ],
            TelemetryError::ArchiveIo { .. } => vec![
                "Check the archive directory exists and is readable",
                "Ensure sufficient disk space",
                "Check file permissions",
            ],
            TelemetryError::ArchiveFormat { .. } => vec![
                "Inspect the archive file for truncated or hand-edited lines",
                "Verify the archive was written by a compatible version",
            ],
            TelemetryError::Storage { .. } => vec![
                "Retry the import for the affected session",
                "Check the storage backend is reachable",
            ],
            TelemetryError::Bind { .. } => vec![
                "Stop any other process listening on the telemetry port",
                "Choose a different port in the listener configuration",
            ],
            TelemetryError::Socket { .. } => vec![
                "Check network interface state",
                "Restart the listener",
            ],
            TelemetryError::Config { .. } => vec![
                "Check the configuration file against the documented defaults",
                "Remove overrides from the environment",
            ],
        }
    }

    /// Helper constructor for archive I/O errors with path context.
    pub fn archive_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TelemetryError::ArchiveIo { path: path.into(), source }
    }

    /// Helper constructor for storage errors.
    pub fn storage(reason: impl Into<String>) -> Self {
        TelemetryError::Storage { reason: reason.into(), source: None }
    }

    /// Helper constructor for storage errors with source.
    pub fn storage_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        TelemetryError::Storage { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        TelemetryError::Config { reason: reason.into() }
    }
}
