//! Live capture of the game's UDP broadcast.
//!
//! One sequential receive loop: each datagram is decoded, its session
//! registered and the packet archived before the next receive. The receive
//! wait is bounded so the cancellation token is observed promptly. Archive
//! writes run on tokio's blocking pool, off the runtime's worker threads.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use laptrace::{CaptureListener, JsonlArchive, MemoryStorage, config::ListenerConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> laptrace::Result<()> {
//! let archive = Arc::new(JsonlArchive::open("data")?);
//! let storage = Arc::new(MemoryStorage::new());
//! let listener = CaptureListener::bind(&ListenerConfig::default(), archive, storage).await?;
//!
//! let cancel = CancellationToken::new();
//! let handle = listener.spawn(cancel.clone());
//! // ... later
//! cancel.cancel();
//! let stats = handle.await.map_err(|e| laptrace::TelemetryError::storage(e.to_string()))??;
//! println!("archived {} packets", stats.archived);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::archive::{RawPacket, RawPacketArchive};
use crate::config::ListenerConfig;
use crate::error::{Result, TelemetryError};
use crate::protocol::{self, Packet, UNASSIGNED_SESSION_UID};
use crate::storage::Storage;
use crate::types::SessionMetadata;

/// Consecutive socket failures tolerated before the loop gives up.
const MAX_SOCKET_ERRORS: u32 = 10;

/// Counters for one listener run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ListenerStats {
    pub datagrams: u64,
    pub archived: u64,
    pub decode_errors: u64,
    pub unassigned_skipped: u64,
    pub unknown_ignored: u64,
    pub archive_errors: u64,
    pub storage_errors: u64,
}

/// Owner of the telemetry UDP socket.
pub struct CaptureListener {
    socket: UdpSocket,
    recv_timeout: Duration,
    max_datagram_bytes: usize,
    archive: Arc<dyn RawPacketArchive>,
    storage: Arc<dyn Storage>,
    /// Sessions seen this run, and whether their metadata is complete.
    known_sessions: HashMap<u64, bool>,
}

impl CaptureListener {
    /// Bind the configured address. A port already bound by another socket
    /// fails with [`TelemetryError::Bind`].
    pub async fn bind(
        config: &ListenerConfig,
        archive: Arc<dyn RawPacketArchive>,
        storage: Arc<dyn Storage>,
    ) -> Result<Self> {
        let addr = config.socket_addr();
        let socket =
            UdpSocket::bind(addr).await.map_err(|source| TelemetryError::Bind { addr, source })?;
        info!(%addr, "Telemetry listener bound");
        Ok(Self {
            socket,
            recv_timeout: config.recv_timeout(),
            max_datagram_bytes: config.max_datagram_bytes,
            archive,
            storage,
            known_sessions: HashMap::new(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(|source| TelemetryError::Socket { source })
    }

    /// Run the loop on a tokio task.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<Result<ListenerStats>> {
        tokio::spawn(self.run(cancel))
    }

    /// Receive until `cancel` fires, then flush the archive and close the
    /// socket.
    ///
    /// Bad packets, storage failures and archive failures are logged and
    /// counted; only repeated socket failures end the loop early. Archive
    /// appends and the final flush are filesystem I/O and are handed to
    /// [`tokio::task::spawn_blocking`].
    pub async fn run(mut self, cancel: CancellationToken) -> Result<ListenerStats> {
        let mut stats = ListenerStats::default();
        let mut buf = vec![0u8; self.max_datagram_bytes];
        let mut socket_errors = 0u32;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let received = tokio::select! {
                _ = cancel.cancelled() => break,
                received = tokio::time::timeout(self.recv_timeout, self.socket.recv_from(&mut buf)) => received,
            };

            match received {
                Err(_elapsed) => continue,
                Ok(Ok((len, peer))) => {
                    socket_errors = 0;
                    trace!(%peer, len, "Datagram received");
                    self.handle_datagram(&buf[..len], &mut stats).await;
                }
                Ok(Err(source)) => {
                    socket_errors += 1;
                    warn!(error = %source, attempt = socket_errors, "UDP receive failed");
                    if socket_errors >= MAX_SOCKET_ERRORS {
                        error!("Too many socket errors, stopping listener");
                        self.flush_archive().await?;
                        return Err(TelemetryError::Socket { source });
                    }
                    let backoff = Duration::from_millis(50 * (1 << socket_errors.min(5)));
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        self.flush_archive().await?;
        info!(
            datagrams = stats.datagrams,
            archived = stats.archived,
            decode_errors = stats.decode_errors,
            sessions = self.known_sessions.len(),
            "Telemetry listener stopped"
        );
        Ok(stats)
    }

    async fn handle_datagram(&mut self, datagram: &[u8], stats: &mut ListenerStats) {
        stats.datagrams += 1;

        let packet = match protocol::decode(datagram) {
            Ok(packet) => packet,
            Err(e) => {
                stats.decode_errors += 1;
                warn!(error = %e, len = datagram.len(), "Dropping undecodable datagram");
                return;
            }
        };
        if packet.is_unknown() {
            stats.unknown_ignored += 1;
            trace!(packet_id = packet.packet_id(), "Ignoring unconsumed packet kind");
            return;
        }
        if packet.session_uid() == UNASSIGNED_SESSION_UID {
            stats.unassigned_skipped += 1;
            trace!(packet_id = packet.packet_id(), "Skipping packet without session");
            return;
        }

        if let Err(e) = self.register_session(&packet).await {
            stats.storage_errors += 1;
            error!(session_id = packet.session_uid(), error = %e, "Session registration failed");
        }

        let raw = RawPacket::from_packet(packet);
        let session_id = raw.session_id;
        match self.with_archive(move |archive| archive.append(&raw)).await {
            Ok(()) => stats.archived += 1,
            Err(e) => {
                stats.archive_errors += 1;
                error!(session_id, error = %e, "Failed to archive packet");
            }
        }
    }

    async fn flush_archive(&self) -> Result<()> {
        self.with_archive(|archive| archive.flush()).await
    }

    async fn with_archive<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&dyn RawPacketArchive) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let archive = Arc::clone(&self.archive);
        tokio::task::spawn_blocking(move || op(archive.as_ref()))
            .await
            .map_err(|e| TelemetryError::storage_with_source("archive task failed", Box::new(e)))?
    }

    /// Get-or-create the session and fill its metadata from the first
    /// session packet while track or type is missing.
    async fn register_session(&mut self, packet: &Packet) -> Result<()> {
        let session_id = packet.session_uid();
        let has_metadata = match self.known_sessions.get(&session_id) {
            Some(has_metadata) => *has_metadata,
            None => {
                let (session, created) = self.storage.get_or_create_session(session_id).await?;
                if created {
                    info!(session_id, "New session detected");
                }
                let has_metadata = !session.lacks_metadata();
                self.known_sessions.insert(session_id, has_metadata);
                has_metadata
            }
        };

        if let (false, Packet::Session(session_packet)) = (has_metadata, packet) {
            let metadata = SessionMetadata::from(&session_packet.data);
            let session = self.storage.update_session_metadata(session_id, metadata).await?;
            debug!(
                session_id,
                track = session.track_name().unwrap_or("unknown"),
                session_type = session.session_type_name().unwrap_or("unknown"),
                "Session metadata recorded"
            );
            self.known_sessions.insert(session_id, !session.lacks_metadata());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryArchive;
    use crate::protocol::ByteWriter;
    use crate::storage::MemoryStorage;
    use crate::test_utils::{car_telemetry_packet, header, session_packet};

    async fn listener() -> anyhow::Result<(CaptureListener, Arc<MemoryArchive>, Arc<MemoryStorage>)> {
        let archive = Arc::new(MemoryArchive::new());
        let storage = Arc::new(MemoryStorage::new());
        let config = ListenerConfig {
            bind_address: "127.0.0.1".parse()?,
            port: 0,
            recv_timeout_ms: 20,
            ..ListenerConfig::default()
        };
        let listener = CaptureListener::bind(&config, archive.clone(), storage.clone()).await?;
        Ok((listener, archive, storage))
    }

    #[tokio::test]
    async fn datagrams_are_classified_and_counted() -> anyhow::Result<()> {
        let _ = tracing_subscriber::fmt::try_init();
        let (mut listener, archive, storage) = listener().await?;
        let mut stats = ListenerStats::default();

        let mut unknown = ByteWriter::default();
        header(3, 5, 1.0, 0).encode(&mut unknown);
        unknown.zeros(8);

        let datagrams = [
            car_telemetry_packet(0, 0.1, 0, 100).encode(),
            vec![0u8; 12],
            unknown.into_inner(),
            session_packet(5, 0.2, 5, 15).encode(),
            car_telemetry_packet(5, 0.3, 0, 120).encode(),
            session_packet(5, 0.4, 10, 1).encode(),
        ];
        for datagram in &datagrams {
            listener.handle_datagram(datagram, &mut stats).await;
        }

        assert_eq!(stats.datagrams, 6);
        assert_eq!(stats.unassigned_skipped, 1);
        assert_eq!(stats.decode_errors, 1);
        assert_eq!(stats.unknown_ignored, 1);
        assert_eq!(stats.archived, 3);
        assert_eq!(archive.session_ids()?, vec![5]);

        let sessions = storage.sessions().await?;
        assert_eq!(sessions.len(), 1);
        // Metadata comes from the first session packet only.
        assert_eq!(sessions[0].track_id, Some(5));
        assert_eq!(sessions[0].session_type, Some(15));
        Ok(())
    }

    #[tokio::test]
    async fn run_returns_promptly_after_cancel() -> anyhow::Result<()> {
        let (listener, _archive, _storage) = listener().await?;
        let cancel = CancellationToken::new();
        let handle = listener.spawn(cancel.clone());
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        let stats = tokio::time::timeout(Duration::from_secs(2), handle).await???;
        assert_eq!(stats, ListenerStats::default());
        Ok(())
    }
}
