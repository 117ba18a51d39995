//! Resampled telemetry points.

use serde::{Deserialize, Serialize};

/// One point of the quantized telemetry timeline.
///
/// Dense fields (`speed` through `drs`) come from the car telemetry stream
/// and are only set when that stream reported on this tick. Sparse status
/// fields are forward-filled from the last tick that reported them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub session_id: u64,
    /// Number of the lap this tick falls inside, if any.
    pub lap: Option<u16>,
    /// Tick time, seconds since session start.
    pub session_time: f64,
    /// Seconds since the lap started, or `session_time` when unattributed.
    pub lap_time: f64,
    /// km/h.
    pub speed: Option<u16>,
    pub throttle: Option<f32>,
    pub brake: Option<f32>,
    pub gear: Option<i8>,
    pub rpm: Option<u16>,
    pub drs: Option<bool>,
    /// kg.
    pub fuel_in_tank: Option<f32>,
    /// Joules.
    pub ers_store_energy: Option<f32>,
    pub ers_deploy_mode: Option<u8>,
}
