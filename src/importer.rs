//! Batch reconstruction of archived sessions.
//!
//! A run clears every derived row, then rebuilds each archived session from
//! its raw packets. Sessions are independent: one failing session is
//! reported and the run moves on.

use std::fmt;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::archive::RawPacketArchive;
use crate::config::ImportConfig;
use crate::error::{Result, TelemetryError};
use crate::reconstruct::{Resampler, first_session_metadata, reconstruct_session, resolve_player_index};
use crate::storage::Storage;

/// What happened to one session during an import.
#[derive(Debug)]
pub enum SessionOutcome {
    Imported { laps: usize, samples: usize },
    Skipped { reason: String },
    Failed { error: TelemetryError },
}

impl SessionOutcome {
    pub fn is_imported(&self) -> bool {
        matches!(self, SessionOutcome::Imported { .. })
    }
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionOutcome::Imported { laps, samples } => {
                write!(f, "imported {laps} laps, {samples} samples")
            }
            SessionOutcome::Skipped { reason } => write!(f, "skipped: {reason}"),
            SessionOutcome::Failed { error } => write!(f, "failed: {error}"),
        }
    }
}

/// Per-session outcomes of one run, ascending by session id.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub sessions: Vec<(u64, SessionOutcome)>,
}

/// Totals over an [`ImportReport`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
    pub failed: usize,
    pub laps: usize,
    pub samples: usize,
}

impl ImportReport {
    pub fn summary(&self) -> ImportSummary {
        let mut summary = ImportSummary::default();
        for (_, outcome) in &self.sessions {
            match outcome {
                SessionOutcome::Imported { laps, samples } => {
                    summary.imported += 1;
                    summary.laps += laps;
                    summary.samples += samples;
                }
                SessionOutcome::Skipped { .. } => summary.skipped += 1,
                SessionOutcome::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }

    pub fn outcome(&self, session_id: u64) -> Option<&SessionOutcome> {
        self.sessions.iter().find(|(id, _)| *id == session_id).map(|(_, outcome)| outcome)
    }
}

/// Rebuilds laps and telemetry from the raw packet archive.
pub struct BatchImporter {
    archive: Arc<dyn RawPacketArchive>,
    storage: Arc<dyn Storage>,
    config: ImportConfig,
    resampler: Resampler,
}

impl BatchImporter {
    pub fn new(
        archive: Arc<dyn RawPacketArchive>,
        storage: Arc<dyn Storage>,
        config: ImportConfig,
    ) -> Self {
        Self { archive, storage, config, resampler: Resampler::default() }
    }

    pub fn with_resampler(mut self, resampler: Resampler) -> Self {
        self.resampler = resampler;
        self
    }

    /// Full reimport of every archived session.
    ///
    /// Derived tables are cleared before any session starts. Only a failure
    /// of that clear, or of listing the archive, fails the run.
    pub async fn run(&self) -> Result<ImportReport> {
        let session_ids = self.archive.session_ids()?;
        self.storage.clear_derived().await?;
        info!(sessions = session_ids.len(), workers = self.config.workers, "Starting import");

        let mut sessions: Vec<(u64, SessionOutcome)> = stream::iter(session_ids)
            .map(|session_id| async move {
                let outcome = match self.import_session(session_id).await {
                    Ok(outcome) => outcome,
                    Err(error) => {
                        error!(session_id, error = %error, "Session import failed");
                        SessionOutcome::Failed { error }
                    }
                };
                (session_id, outcome)
            })
            .buffer_unordered(self.config.workers.max(1))
            .collect()
            .await;
        sessions.sort_by_key(|(session_id, _)| *session_id);

        let report = ImportReport { sessions };
        let summary = report.summary();
        info!(
            imported = summary.imported,
            skipped = summary.skipped,
            failed = summary.failed,
            laps = summary.laps,
            samples = summary.samples,
            "Import finished"
        );
        Ok(report)
    }

    /// Reconstruct one session and replace its derived rows.
    ///
    /// A session with no discoverable player car is skipped, not failed.
    pub async fn import_session(&self, session_id: u64) -> Result<SessionOutcome> {
        let packets = self.archive.list_raw_packets(session_id)?;
        debug!(session_id, packets = packets.len(), "Importing session");

        let (session, _) = self.storage.get_or_create_session(session_id).await?;
        if session.lacks_metadata() || session.game_mode.is_none() {
            if let Some(metadata) = first_session_metadata(&packets) {
                let missing = metadata.missing_from(&session);
                if !missing.is_empty() {
                    self.storage.update_session_metadata(session_id, missing).await?;
                    debug!(session_id, ?missing, "Backfilled session metadata");
                }
            }
        }

        let Some(player_index) = resolve_player_index(&packets) else {
            let reason = TelemetryError::MissingPlayerIndex { session_id }.to_string();
            warn!(session_id, "No player car index, skipping session");
            return Ok(SessionOutcome::Skipped { reason });
        };

        let reconstruction = reconstruct_session(session_id, player_index, &packets, &self.resampler);
        let (laps, samples) = (reconstruction.laps.len(), reconstruction.samples.len());
        self.storage.replace_derived(session_id, reconstruction.laps, reconstruction.samples).await?;

        info!(session_id, player_index, laps, samples, "Session imported");
        Ok(SessionOutcome::Imported { laps, samples })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{MemoryArchive, RawPacket};
    use crate::protocol::Packet;
    use crate::storage::MemoryStorage;
    use crate::test_utils::{
        car_telemetry_packet, header, multi_lap_scenario, session_packet, single_lap_scenario,
    };
    use crate::types::{Lap, Session, SessionMetadata, TelemetrySample};

    fn archive_of(packets: impl IntoIterator<Item = Packet>) -> Arc<MemoryArchive> {
        Arc::new(MemoryArchive::with_packets(packets.into_iter().map(RawPacket::from_packet)))
    }

    fn hidden_player(packet: Packet) -> Packet {
        match packet {
            Packet::CarTelemetry(mut p) => {
                p.header = header(p.header.packet_id, p.header.session_uid, p.header.session_time, 255);
                Packet::CarTelemetry(p)
            }
            other => other,
        }
    }

    #[tokio::test]
    async fn imports_sessions_and_backfills_metadata() -> anyhow::Result<()> {
        let _ = tracing_subscriber::fmt::try_init();
        let archive = archive_of(single_lap_scenario(1));
        let storage = Arc::new(MemoryStorage::new());
        let importer = BatchImporter::new(archive, storage.clone(), ImportConfig::default());

        let report = importer.run().await?;
        assert!(matches!(report.outcome(1), Some(SessionOutcome::Imported { laps: 1, samples: 2901 })));

        let session = storage.session(1).await?;
        assert_eq!(session.as_ref().and_then(|s| s.track_id), Some(5));
        assert_eq!(session.and_then(|s| s.session_type), Some(15));
        assert_eq!(storage.laps(1).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn missing_player_index_skips_only_that_session() -> anyhow::Result<()> {
        let mut packets = single_lap_scenario(2);
        packets.retain(|p| matches!(p, Packet::CarTelemetry(_)));
        let packets: Vec<Packet> = packets.into_iter().map(hidden_player).collect();
        let archive = archive_of(packets.into_iter().chain(single_lap_scenario(3)));
        let storage = Arc::new(MemoryStorage::new());

        let report = BatchImporter::new(archive, storage.clone(), ImportConfig { workers: 2 })
            .run()
            .await?;
        assert!(matches!(report.outcome(2), Some(SessionOutcome::Skipped { .. })));
        assert!(report.outcome(3).is_some_and(SessionOutcome::is_imported));
        assert!(storage.telemetry(2).await?.is_empty());
        assert_eq!(report.summary().skipped, 1);
        Ok(())
    }

    #[tokio::test]
    async fn rerun_replaces_instead_of_duplicating() -> anyhow::Result<()> {
        let archive = archive_of(multi_lap_scenario(4, 3, 5));
        let storage = Arc::new(MemoryStorage::new());
        let importer = BatchImporter::new(archive, storage.clone(), ImportConfig::default());

        importer.run().await?;
        let laps_first = storage.laps(4).await?;
        let samples_first = storage.telemetry(4).await?;
        importer.run().await?;

        assert_eq!(storage.laps(4).await?, laps_first);
        assert_eq!(storage.telemetry(4).await?, samples_first);
        assert_eq!(laps_first.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_session_is_an_archive_error() {
        let importer = BatchImporter::new(
            Arc::new(MemoryArchive::new()),
            Arc::new(MemoryStorage::new()),
            ImportConfig::default(),
        );
        assert!(matches!(
            importer.import_session(42).await,
            Err(TelemetryError::ArchiveIo { .. })
        ));
    }

    /// Storage whose derived-row replace always fails for one session.
    #[derive(Default)]
    struct FlakyStorage {
        inner: MemoryStorage,
        failing_session: u64,
    }

    #[async_trait::async_trait]
    impl Storage for FlakyStorage {
        async fn get_or_create_session(&self, session_id: u64) -> Result<(Session, bool)> {
            self.inner.get_or_create_session(session_id).await
        }
        async fn update_session_metadata(
            &self,
            session_id: u64,
            metadata: SessionMetadata,
        ) -> Result<Session> {
            self.inner.update_session_metadata(session_id, metadata).await
        }
        async fn replace_laps(&self, session_id: u64, laps: Vec<Lap>) -> Result<()> {
            self.inner.replace_laps(session_id, laps).await
        }
        async fn replace_telemetry(
            &self,
            session_id: u64,
            samples: Vec<TelemetrySample>,
        ) -> Result<()> {
            self.inner.replace_telemetry(session_id, samples).await
        }
        async fn replace_derived(
            &self,
            session_id: u64,
            laps: Vec<Lap>,
            samples: Vec<TelemetrySample>,
        ) -> Result<()> {
            if session_id == self.failing_session {
                return Err(TelemetryError::storage("connection reset"));
            }
            self.inner.replace_derived(session_id, laps, samples).await
        }
        async fn clear_derived(&self) -> Result<()> {
            self.inner.clear_derived().await
        }
        async fn session(&self, session_id: u64) -> Result<Option<Session>> {
            self.inner.session(session_id).await
        }
        async fn sessions(&self) -> Result<Vec<Session>> {
            self.inner.sessions().await
        }
        async fn laps(&self, session_id: u64) -> Result<Vec<Lap>> {
            self.inner.laps(session_id).await
        }
        async fn telemetry(&self, session_id: u64) -> Result<Vec<TelemetrySample>> {
            self.inner.telemetry(session_id).await
        }
    }

    #[tokio::test]
    async fn storage_failure_is_reported_per_session() -> anyhow::Result<()> {
        let archive = archive_of(
            single_lap_scenario(7)
                .into_iter()
                .chain([session_packet(8, 0.0, 3, 1), car_telemetry_packet(8, 1.0, 0, 90)]),
        );
        let storage = Arc::new(FlakyStorage { failing_session: 7, ..FlakyStorage::default() });
        let report = BatchImporter::new(archive, storage.clone(), ImportConfig { workers: 4 })
            .run()
            .await?;

        let ids: Vec<u64> = report.sessions.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![7, 8]);
        assert!(matches!(
            report.outcome(7),
            Some(SessionOutcome::Failed { error: TelemetryError::Storage { .. } })
        ));
        assert!(matches!(report.outcome(8), Some(SessionOutcome::Imported { laps: 0, samples: 1 })));
        assert!(storage.laps(7).await?.is_empty());
        Ok(())
    }
}
