//! Completed-lap detection from the running lap counter.

use std::collections::HashSet;

use tracing::trace;

use crate::archive::RawPacket;
use crate::protocol::Packet;
use crate::types::Lap;

/// Emits one [`Lap`] the first time a lap-data packet reports it finished.
///
/// A lap is complete when the player's `last_lap_time_in_ms` is positive;
/// its number is `current_lap_num - 1` and it ends at the packet's session
/// time. Every later packet repeating the same lap is ignored.
#[derive(Debug, Clone)]
pub struct LapReconstructor {
    session_id: u64,
    player_index: u8,
    seen: HashSet<u16>,
}

impl LapReconstructor {
    pub fn new(session_id: u64, player_index: u8) -> Self {
        Self { session_id, player_index, seen: HashSet::new() }
    }

    /// Feed one archived packet; non lap-data packets are ignored.
    pub fn observe(&mut self, raw: &RawPacket) -> Option<Lap> {
        let Packet::LapData(packet) = &raw.packet else {
            return None;
        };
        let car = packet.car(self.player_index)?;
        if car.last_lap_time_in_ms == 0 || car.current_lap_num == 0 {
            return None;
        }

        let number = u16::from(car.current_lap_num) - 1;
        if !self.seen.insert(number) {
            return None;
        }

        let end = raw.session_time;
        let start = (end - f64::from(car.last_lap_time_in_ms) / 1000.0).max(0.0);
        trace!(session_id = self.session_id, lap = number, start, end, "Lap completed");
        Some(Lap {
            session_id: self.session_id,
            number,
            duration_ms: car.last_lap_time_in_ms,
            start,
            end,
            compound: None,
        })
    }

    /// Run a whole session's packets, ordered by session time.
    pub fn reconstruct(session_id: u64, player_index: u8, packets: &[RawPacket]) -> Vec<Lap> {
        let mut reconstructor = Self::new(session_id, player_index);
        packets.iter().filter_map(|raw| reconstructor.observe(raw)).collect()
    }
}
