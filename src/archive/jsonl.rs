//! Line-delimited JSON archive on the local filesystem.
//!
//! Layout: `<root>/session_<uid>/telemetry_log.jsonl`, one [`RawPacket`] per
//! line in arrival order.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use super::{RawPacket, RawPacketArchive, sort_by_session_time};
use crate::error::{Result, TelemetryError};

const SESSION_DIR_PREFIX: &str = "session_";

/// File name of each session's record stream.
pub const LOG_FILE_NAME: &str = "telemetry_log.jsonl";

/// Filesystem-backed [`RawPacketArchive`].
///
/// Only the most recently appended session keeps a buffered writer open: the
/// first record of a different session flushes and closes the others. Reads
/// of a session flush its writer first.
#[derive(Debug)]
pub struct JsonlArchive {
    root: PathBuf,
    writers: Mutex<HashMap<u64, BufWriter<File>>>,
}

impl JsonlArchive {
    /// Open (creating if needed) an archive rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| TelemetryError::archive_io(&root, e))?;
        info!(root = %root.display(), "Opened packet archive");
        Ok(Self { root, writers: Mutex::new(HashMap::new()) })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn session_dir(&self, session_id: u64) -> PathBuf {
        self.root.join(format!("{SESSION_DIR_PREFIX}{session_id}"))
    }

    pub fn log_path(&self, session_id: u64) -> PathBuf {
        self.session_dir(session_id).join(LOG_FILE_NAME)
    }

    /// Number of session logs currently held open for appending.
    pub fn open_writers(&self) -> usize {
        self.writers().len()
    }

    fn writers(&self) -> MutexGuard<'_, HashMap<u64, BufWriter<File>>> {
        self.writers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn close_writers(&self, writers: &mut HashMap<u64, BufWriter<File>>) -> Result<()> {
        for (session_id, mut writer) in writers.drain() {
            writer.flush().map_err(|e| TelemetryError::archive_io(self.log_path(session_id), e))?;
            debug!(session_id, "Closed session log");
        }
        Ok(())
    }

    fn open_writer(&self, session_id: u64) -> Result<BufWriter<File>> {
        let dir = self.session_dir(session_id);
        fs::create_dir_all(&dir).map_err(|e| TelemetryError::archive_io(&dir, e))?;
        let path = self.log_path(session_id);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| TelemetryError::archive_io(&path, e))?;
        debug!(session_id, path = %path.display(), "Opened session log");
        Ok(BufWriter::new(file))
    }
}

fn parse_session_dir(name: &str) -> Option<u64> {
    name.strip_prefix(SESSION_DIR_PREFIX)?.parse().ok()
}

impl RawPacketArchive for JsonlArchive {
    fn append(&self, packet: &RawPacket) -> Result<()> {
        let mut writers = self.writers();
        if !writers.contains_key(&packet.session_id) {
            self.close_writers(&mut writers)?;
        }
        let writer = match writers.entry(packet.session_id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                entry.insert(self.open_writer(packet.session_id)?)
            }
        };
        serde_json::to_writer(&mut *writer, packet)
            .map_err(io::Error::from)
            .and_then(|()| writer.write_all(b"\n"))
            .map_err(|e| TelemetryError::archive_io(self.log_path(packet.session_id), e))
    }

    fn flush(&self) -> Result<()> {
        for (session_id, writer) in self.writers().iter_mut() {
            writer.flush().map_err(|e| TelemetryError::archive_io(self.log_path(*session_id), e))?;
        }
        Ok(())
    }

    fn session_ids(&self) -> Result<Vec<u64>> {
        let entries =
            fs::read_dir(&self.root).map_err(|e| TelemetryError::archive_io(&self.root, e))?;
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TelemetryError::archive_io(&self.root, e))?;
            let Some(session_id) = entry.file_name().to_str().and_then(parse_session_dir) else {
                continue;
            };
            if entry.path().join(LOG_FILE_NAME).is_file() {
                ids.push(session_id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    fn list_raw_packets(&self, session_id: u64) -> Result<Vec<RawPacket>> {
        let path = self.log_path(session_id);
        if let Some(writer) = self.writers().get_mut(&session_id) {
            writer.flush().map_err(|e| TelemetryError::archive_io(&path, e))?;
        }

        let file = File::open(&path).map_err(|e| TelemetryError::archive_io(&path, e))?;
        let mut packets = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| TelemetryError::archive_io(&path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let packet = serde_json::from_str(&line).map_err(|source| {
                TelemetryError::ArchiveFormat { path: path.clone(), line: idx + 1, source }
            })?;
            packets.push(packet);
        }
        sort_by_session_time(&mut packets);
        debug!(session_id, count = packets.len(), "Loaded archived packets");
        Ok(packets)
    }

    fn reset(&self) -> Result<()> {
        self.writers().clear();
        for session_id in self.session_ids()? {
            let dir = self.session_dir(session_id);
            fs::remove_dir_all(&dir).map_err(|e| TelemetryError::archive_io(&dir, e))?;
        }
        info!(root = %self.root.display(), "Packet archive reset");
        Ok(())
    }
}
