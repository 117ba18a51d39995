//! Durable per-session record of decoded packets.
//!
//! The archive is the authoritative input to reconstruction: the listener
//! appends to it, the importer reads it back in session-time order. Records
//! are never rewritten; [`RawPacketArchive::reset`] is the only deletion.

mod jsonl;
mod memory;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::protocol::Packet;

pub use jsonl::JsonlArchive;
pub use memory::MemoryArchive;

/// One archived datagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPacket {
    pub session_id: u64,
    pub packet_id: u8,
    /// Seconds since session start, widened from the wire's `f32`.
    #[serde(with = "crate::protocol::lossless::double_serde")]
    pub session_time: f64,
    pub packet: Packet,
}

impl RawPacket {
    pub fn from_packet(packet: Packet) -> Self {
        Self {
            session_id: packet.session_uid(),
            packet_id: packet.packet_id(),
            session_time: f64::from(packet.session_time()),
            packet,
        }
    }
}

impl From<Packet> for RawPacket {
    fn from(packet: Packet) -> Self {
        Self::from_packet(packet)
    }
}

/// Append-only, per-session packet store.
///
/// Implementations use interior mutability so one archive can be shared
/// between the listener and importer workers behind an `Arc`.
pub trait RawPacketArchive: Send + Sync {
    /// Append one record to its session's stream.
    fn append(&self, packet: &RawPacket) -> Result<()>;

    /// Push buffered records to durable storage.
    fn flush(&self) -> Result<()>;

    /// Ids of every archived session, ascending.
    fn session_ids(&self) -> Result<Vec<u64>>;

    /// All records of one session, stable-sorted by session time.
    ///
    /// Records sharing a session time keep their append order.
    fn list_raw_packets(&self, session_id: u64) -> Result<Vec<RawPacket>>;

    /// Drop every archived session.
    fn reset(&self) -> Result<()>;
}

pub(crate) fn sort_by_session_time(packets: &mut [RawPacket]) {
    packets.sort_by(|a, b| a.session_time.total_cmp(&b.session_time));
}
