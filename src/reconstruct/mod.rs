//! Derivation of laps and resampled telemetry from archived packets.
//!
//! Pipeline per session, all single-pass over time-ordered packets:
//!
//! 1. [`LapReconstructor`] turns lap-data counters into completed laps
//! 2. [`Resampler`] merges telemetry and status onto a tick grid and
//!    attributes each sample to a lap
//! 3. [`attribute_compounds`] gives every lap its majority tyre compound

mod compound;
mod laps;
mod resample;

use crate::archive::RawPacket;
use crate::protocol::Packet;
use crate::types::{Lap, SessionMetadata, TelemetrySample};

pub use compound::{attribute_compounds, majority_compound};
pub use laps::LapReconstructor;
pub use resample::{CompoundObservations, DEFAULT_TICKS_PER_SECOND, ResampleOutput, Resampler};

/// Derived rows of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconstruction {
    pub laps: Vec<Lap>,
    pub samples: Vec<TelemetrySample>,
}

/// Player car index from the first packet whose header exposes one.
pub fn resolve_player_index(packets: &[RawPacket]) -> Option<u8> {
    packets.iter().find_map(|raw| raw.packet.header().player_index())
}

/// Track, session type and game mode from the first session packet.
pub fn first_session_metadata(packets: &[RawPacket]) -> Option<SessionMetadata> {
    packets.iter().find_map(|raw| match &raw.packet {
        Packet::Session(packet) => Some(SessionMetadata::from(&packet.data)),
        _ => None,
    })
}

/// Laps, samples and compound attribution for one session.
pub fn reconstruct_session(
    session_id: u64,
    player_index: u8,
    packets: &[RawPacket],
    resampler: &Resampler,
) -> Reconstruction {
    let mut laps = LapReconstructor::reconstruct(session_id, player_index, packets);
    let ResampleOutput { samples, compounds } =
        resampler.resample(session_id, player_index, packets, &laps);
    attribute_compounds(&mut laps, &compounds);
    Reconstruction { laps, samples }
}
