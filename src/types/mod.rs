//! Session, lap and telemetry records produced by the pipeline.
//!
//! - [`Session`] is created on first sighting and never deleted by reconstruction
//! - [`Lap`] and [`TelemetrySample`] are fully derived and replaced wholesale
//!   on every import of their session

mod lap;
mod sample;
mod session;

pub use lap::Lap;
pub use sample::TelemetrySample;
pub use session::{Session, SessionMetadata};
