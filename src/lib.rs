//! Capture and reconstruction of F1 game UDP telemetry.
//!
//! Laptrace listens to the game's binary telemetry broadcast, archives every
//! decoded packet per session, and rebuilds completed laps plus a resampled
//! telemetry timeline from that archive.
//!
//! # Features
//!
//! - **Protocol decoding**: pure, bounds-checked decoding of the 2024 packet format
//! - **Live capture**: cancellable UDP listener that never stops on a bad packet
//! - **Reconstruction**: lap detection, 50 Hz resampling with forward-fill,
//!   per-lap tyre compound attribution
//! - **Idempotent import**: reruns replace derived rows instead of appending
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use laptrace::{BatchImporter, Config, JsonlArchive, MemoryStorage, Storage};
//!
//! #[tokio::main]
//! async fn main() -> laptrace::Result<()> {
//!     let config = Config::load("laptrace.yaml")?;
//!     laptrace::logging::init(&config.log_filter);
//!
//!     let archive = Arc::new(JsonlArchive::open(&config.archive.directory)?);
//!     let storage = Arc::new(MemoryStorage::new());
//!     let importer = BatchImporter::new(archive, storage.clone(), config.import)
//!         .with_resampler(config.resampler());
//!
//!     let report = importer.run().await?;
//!     for (session_id, outcome) in &report.sessions {
//!         println!("session {session_id}: {outcome}");
//!     }
//!     for lap in storage.laps(1).await? {
//!         println!("{lap}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod config;
mod error;
pub mod importer;
pub mod listener;
pub mod logging;
pub mod protocol;
pub mod reconstruct;
pub mod storage;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Core exports
pub use error::*;
pub use types::*;

pub use archive::{JsonlArchive, MemoryArchive, RawPacket, RawPacketArchive};
pub use config::Config;
pub use importer::{BatchImporter, ImportReport, SessionOutcome};
pub use listener::{CaptureListener, ListenerStats};
pub use protocol::Packet;
pub use reconstruct::Resampler;
pub use storage::{MemoryStorage, Storage};
