//! Binary protocol decoding for the F1 game UDP telemetry feed.
//!
//! Decoding is pure and deterministic: one datagram in, one [`Packet`] out.
//! The active wire layout lives in [`f1_24`]; [`decode`] and
//! [`Packet::encode`] are re-exported from it so callers never name the
//! format year.
//!
//! ## Usage Example
//!
//! ```rust
//! use laptrace::protocol::{self, Packet};
//!
//! fn handle(datagram: &[u8]) {
//!     match protocol::decode(datagram) {
//!         Ok(Packet::CarTelemetry(p)) => {
//!             let player = p.header.player_car_index;
//!             if let Some(car) = p.car(player) {
//!                 println!("speed {} km/h", car.speed);
//!             }
//!         }
//!         Ok(other) => println!("packet id {}", other.packet_id()),
//!         Err(e) => eprintln!("dropped datagram: {}", e),
//!     }
//! }
//! ```

mod bytes;
pub mod f1_24;
mod lookup;
pub(crate) mod lossless;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use bytes::{ByteReader, ByteWriter};
pub use f1_24::{
    CarStatusData, CarStatusPacket, CarTelemetryData, CarTelemetryPacket, LapData, LapDataPacket,
    PacketHeader, SessionData, SessionPacket, decode,
};
pub use lookup::{session_type_name, track_name, tyre_compound_name};

/// Session uid the game sends before a session has been assigned one.
pub const UNASSIGNED_SESSION_UID: u64 = 0;

/// Errors produced while decoding a single datagram.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    #[error("{kind} packet too short: {actual} bytes (need {expected})")]
    TooShort { kind: &'static str, expected: usize, actual: usize },

    #[error("unrecognised packet id {packet_id}")]
    UnknownPacketId { packet_id: u8 },

    #[error("unsupported packet format {found} (decoder handles {expected})")]
    UnsupportedFormat { expected: u16, found: u16 },

    #[error("read of {width} bytes at offset {offset} exceeds buffer of {len} bytes")]
    OutOfBounds { offset: usize, width: usize, len: usize },
}

/// A packet of a kind this crate does not consume; only the header is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnknownPacket {
    pub header: PacketHeader,
}

/// One decoded datagram.
///
/// Serialized with an explicit `kind` tag so archived records describe
/// themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Packet {
    Session(SessionPacket),
    LapData(LapDataPacket),
    CarTelemetry(CarTelemetryPacket),
    CarStatus(CarStatusPacket),
    Unknown(UnknownPacket),
}

impl Packet {
    pub fn header(&self) -> &PacketHeader {
        match self {
            Packet::Session(p) => &p.header,
            Packet::LapData(p) => &p.header,
            Packet::CarTelemetry(p) => &p.header,
            Packet::CarStatus(p) => &p.header,
            Packet::Unknown(p) => &p.header,
        }
    }

    pub fn packet_id(&self) -> u8 {
        self.header().packet_id
    }

    pub fn session_uid(&self) -> u64 {
        self.header().session_uid
    }

    pub fn session_time(&self) -> f32 {
        self.header().session_time
    }

    /// Short name of the packet kind, for logging.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Packet::Session(_) => "session",
            Packet::LapData(_) => "lap_data",
            Packet::CarTelemetry(_) => "car_telemetry",
            Packet::CarStatus(_) => "car_status",
            Packet::Unknown(_) => "unknown",
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Packet::Unknown(_))
    }

    /// Encode back into the wire layout.
    pub fn encode(&self) -> Vec<u8> {
        f1_24::encode(self)
    }
}
