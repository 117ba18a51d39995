//! Completed laps.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One completed circuit by the monitored car.
///
/// `start` and `end` are session-time offsets in seconds; a sample at time
/// `t` belongs to the lap when `start <= t < end`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lap {
    pub session_id: u64,
    pub number: u16,
    pub duration_ms: u32,
    pub start: f64,
    pub end: f64,
    /// Representative actual tyre compound, when any sample carried one.
    pub compound: Option<u8>,
}

impl Lap {
    /// Half-open interval test used for sample attribution.
    pub fn contains(&self, session_time: f64) -> bool {
        self.start <= session_time && session_time < self.end
    }

    pub fn duration_secs(&self) -> f64 {
        f64::from(self.duration_ms) / 1000.0
    }
}

impl fmt::Display for Lap {
    /// Formats as `Lap 3: 1:32.417`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let minutes = self.duration_ms / 60_000;
        let seconds = (self.duration_ms % 60_000) / 1000;
        let millis = self.duration_ms % 1000;
        write!(f, "Lap {}: {}:{:02}.{:03}", self.number, minutes, seconds, millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lap(number: u16, duration_ms: u32, start: f64, end: f64) -> Lap {
        Lap { session_id: 1, number, duration_ms, start, end, compound: None }
    }

    #[test]
    fn contains_is_half_open() {
        let lap = lap(1, 58_000, 2.0, 60.0);
        assert!(lap.contains(2.0));
        assert!(lap.contains(59.98));
        assert!(!lap.contains(60.0));
        assert!(!lap.contains(1.98));
    }

    #[test]
    fn display_formats_minutes_seconds_millis() {
        assert_eq!(lap(3, 92_417, 0.0, 92.417).to_string(), "Lap 3: 1:32.417");
        assert_eq!(lap(1, 58_000, 2.0, 60.0).to_string(), "Lap 1: 0:58.000");
        assert_eq!(lap(1, 58_000, 2.0, 60.0).duration_secs(), 58.0);
    }
}
