//! In-process archive, used by tests and short-lived pipelines.

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{RawPacket, RawPacketArchive, sort_by_session_time};
use crate::error::{Result, TelemetryError};

#[derive(Debug, Default)]
pub struct MemoryArchive {
    sessions: Mutex<BTreeMap<u64, Vec<RawPacket>>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an archive pre-populated with `packets`.
    pub fn with_packets(packets: impl IntoIterator<Item = RawPacket>) -> Self {
        let archive = Self::new();
        {
            let mut sessions = archive.sessions();
            for packet in packets {
                sessions.entry(packet.session_id).or_default().push(packet);
            }
        }
        archive
    }

    /// Total records across every session.
    pub fn len(&self) -> usize {
        self.sessions().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sessions(&self) -> MutexGuard<'_, BTreeMap<u64, Vec<RawPacket>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RawPacketArchive for MemoryArchive {
    fn append(&self, packet: &RawPacket) -> Result<()> {
        self.sessions().entry(packet.session_id).or_default().push(packet.clone());
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn session_ids(&self) -> Result<Vec<u64>> {
        Ok(self.sessions().keys().copied().collect())
    }

    fn list_raw_packets(&self, session_id: u64) -> Result<Vec<RawPacket>> {
        let mut packets = self.sessions().get(&session_id).cloned().ok_or_else(|| {
            TelemetryError::archive_io(
                PathBuf::from(format!("memory/session_{session_id}")),
                io::Error::from(io::ErrorKind::NotFound),
            )
        })?;
        sort_by_session_time(&mut packets);
        Ok(packets)
    }

    fn reset(&self) -> Result<()> {
        self.sessions().clear();
        Ok(())
    }
}
