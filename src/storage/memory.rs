//! In-memory [`Storage`] backed by ordered maps under one lock.

use std::collections::{BTreeMap, HashSet};

use tokio::sync::RwLock;
use tracing::{debug, info};

use super::Storage;
use crate::error::{Result, TelemetryError};
use crate::types::{Lap, Session, SessionMetadata, TelemetrySample};

#[derive(Debug, Default)]
struct Tables {
    sessions: BTreeMap<u64, Session>,
    laps: BTreeMap<u64, Vec<Lap>>,
    telemetry: BTreeMap<u64, Vec<TelemetrySample>>,
}

/// Storage held entirely in process memory.
///
/// All three tables share one [`RwLock`], so a replace is never observed
/// half-applied. Rows are validated before anything is written.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn require_session(tables: &Tables, session_id: u64) -> Result<()> {
    if tables.sessions.contains_key(&session_id) {
        Ok(())
    } else {
        Err(TelemetryError::storage(format!("session {session_id} does not exist")))
    }
}

fn validate_laps(session_id: u64, laps: &[Lap]) -> Result<()> {
    let mut numbers = HashSet::with_capacity(laps.len());
    for lap in laps {
        if lap.session_id != session_id {
            return Err(TelemetryError::storage(format!(
                "lap {} belongs to session {}, not {}",
                lap.number, lap.session_id, session_id
            )));
        }
        if !numbers.insert(lap.number) {
            return Err(TelemetryError::storage(format!(
                "duplicate lap number {} in session {}",
                lap.number, session_id
            )));
        }
    }
    Ok(())
}

fn validate_samples(session_id: u64, samples: &[TelemetrySample]) -> Result<()> {
    match samples.iter().find(|s| s.session_id != session_id) {
        Some(stray) => Err(TelemetryError::storage(format!(
            "sample at {} belongs to session {}, not {}",
            stray.session_time, stray.session_id, session_id
        ))),
        None => Ok(()),
    }
}

/// Every sample's lap reference must name a lap in `laps`.
fn validate_lap_references(
    session_id: u64,
    laps: &[Lap],
    samples: &[TelemetrySample],
) -> Result<()> {
    let numbers: HashSet<u16> = laps.iter().map(|lap| lap.number).collect();
    match samples.iter().filter_map(|s| s.lap).find(|n| !numbers.contains(n)) {
        Some(missing) => Err(TelemetryError::storage(format!(
            "sample references unknown lap {missing} in session {session_id}"
        ))),
        None => Ok(()),
    }
}

fn sorted_laps(mut laps: Vec<Lap>) -> Vec<Lap> {
    laps.sort_by_key(|lap| lap.number);
    laps
}

fn sorted_samples(mut samples: Vec<TelemetrySample>) -> Vec<TelemetrySample> {
    samples.sort_by(|a, b| a.session_time.total_cmp(&b.session_time));
    samples
}

#[async_trait::async_trait]
impl Storage for MemoryStorage {
    async fn get_or_create_session(&self, session_id: u64) -> Result<(Session, bool)> {
        if let Some(session) = self.tables.read().await.sessions.get(&session_id) {
            return Ok((session.clone(), false));
        }
        let mut tables = self.tables.write().await;
        // Another writer may have created it between the two locks.
        if let Some(session) = tables.sessions.get(&session_id) {
            return Ok((session.clone(), false));
        }
        let session = Session::new(session_id);
        tables.sessions.insert(session_id, session.clone());
        info!(session_id, "Created session");
        Ok((session, true))
    }

    async fn update_session_metadata(
        &self,
        session_id: u64,
        metadata: SessionMetadata,
    ) -> Result<Session> {
        let mut tables = self.tables.write().await;
        let session = tables.sessions.get_mut(&session_id).ok_or_else(|| {
            TelemetryError::storage(format!("session {session_id} does not exist"))
        })?;
        session.apply(&metadata);
        debug!(session_id, ?metadata, "Updated session metadata");
        Ok(session.clone())
    }

    async fn replace_laps(&self, session_id: u64, laps: Vec<Lap>) -> Result<()> {
        let mut tables = self.tables.write().await;
        require_session(&tables, session_id)?;
        validate_laps(session_id, &laps)?;
        tables.laps.insert(session_id, sorted_laps(laps));
        Ok(())
    }

    async fn replace_telemetry(
        &self,
        session_id: u64,
        samples: Vec<TelemetrySample>,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        require_session(&tables, session_id)?;
        validate_samples(session_id, &samples)?;
        tables.telemetry.insert(session_id, sorted_samples(samples));
        Ok(())
    }

    async fn replace_derived(
        &self,
        session_id: u64,
        laps: Vec<Lap>,
        samples: Vec<TelemetrySample>,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        require_session(&tables, session_id)?;
        validate_laps(session_id, &laps)?;
        validate_samples(session_id, &samples)?;
        validate_lap_references(session_id, &laps, &samples)?;

        let (lap_count, sample_count) = (laps.len(), samples.len());
        tables.laps.insert(session_id, sorted_laps(laps));
        tables.telemetry.insert(session_id, sorted_samples(samples));
        debug!(session_id, laps = lap_count, samples = sample_count, "Replaced derived rows");
        Ok(())
    }

    async fn clear_derived(&self) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.laps.clear();
        tables.telemetry.clear();
        info!("Cleared derived tables");
        Ok(())
    }

    async fn session(&self, session_id: u64) -> Result<Option<Session>> {
        Ok(self.tables.read().await.sessions.get(&session_id).cloned())
    }

    async fn sessions(&self) -> Result<Vec<Session>> {
        Ok(self.tables.read().await.sessions.values().cloned().collect())
    }

    async fn laps(&self, session_id: u64) -> Result<Vec<Lap>> {
        Ok(self.tables.read().await.laps.get(&session_id).cloned().unwrap_or_default())
    }

    async fn telemetry(&self, session_id: u64) -> Result<Vec<TelemetrySample>> {
        Ok(self.tables.read().await.telemetry.get(&session_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lap(session_id: u64, number: u16) -> Lap {
        Lap {
            session_id,
            number,
            duration_ms: 60_000,
            start: f64::from(number - 1) * 60.0,
            end: f64::from(number) * 60.0,
            compound: None,
        }
    }

    fn sample(session_id: u64, session_time: f64, lap: Option<u16>) -> TelemetrySample {
        TelemetrySample {
            session_id,
            lap,
            session_time,
            lap_time: session_time,
            speed: Some(200),
            throttle: Some(1.0),
            brake: Some(0.0),
            gear: Some(7),
            rpm: Some(11_000),
            drs: Some(false),
            fuel_in_tank: None,
            ers_store_energy: None,
            ers_deploy_mode: None,
        }
    }

    #[tokio::test]
    async fn get_or_create_reports_creation_once() -> anyhow::Result<()> {
        let storage = MemoryStorage::new();
        let (first, created) = storage.get_or_create_session(8).await?;
        assert!(created);
        let (second, created) = storage.get_or_create_session(8).await?;
        assert!(!created);
        assert_eq!(first, second);
        assert_eq!(storage.sessions().await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn metadata_update_requires_existing_session() -> anyhow::Result<()> {
        let storage = MemoryStorage::new();
        let metadata = SessionMetadata { track_id: Some(5), ..Default::default() };
        assert!(storage.update_session_metadata(1, metadata).await.is_err());

        storage.get_or_create_session(1).await?;
        let session = storage.update_session_metadata(1, metadata).await?;
        assert_eq!(session.track_id, Some(5));
        assert_eq!(storage.session(1).await?.and_then(|s| s.track_id), Some(5));
        Ok(())
    }

    #[tokio::test]
    async fn replace_derived_is_all_or_nothing() -> anyhow::Result<()> {
        let storage = MemoryStorage::new();
        storage.get_or_create_session(1).await?;
        storage.replace_derived(1, vec![lap(1, 1)], vec![sample(1, 10.0, Some(1))]).await?;

        // Duplicate lap numbers: nothing may change.
        let result = storage
            .replace_derived(1, vec![lap(1, 2), lap(1, 2)], vec![sample(1, 70.0, Some(2))])
            .await;
        assert!(result.is_err());
        assert_eq!(storage.laps(1).await?, vec![lap(1, 1)]);
        assert_eq!(storage.telemetry(1).await?.len(), 1);

        // Dangling lap reference.
        let result = storage.replace_derived(1, vec![lap(1, 1)], vec![sample(1, 70.0, Some(3))]).await;
        assert!(result.is_err());
        assert_eq!(storage.telemetry(1).await?[0].session_time, 10.0);
        Ok(())
    }

    #[tokio::test]
    async fn replace_overwrites_and_clear_keeps_sessions() -> anyhow::Result<()> {
        let storage = MemoryStorage::new();
        storage.get_or_create_session(1).await?;
        storage.replace_laps(1, vec![lap(1, 2), lap(1, 1)]).await?;
        storage.replace_telemetry(1, vec![sample(1, 5.0, None), sample(1, 1.0, None)]).await?;

        let numbers: Vec<u16> = storage.laps(1).await?.iter().map(|l| l.number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(storage.telemetry(1).await?[0].session_time, 1.0);

        storage.replace_laps(1, vec![lap(1, 3)]).await?;
        assert_eq!(storage.laps(1).await?.len(), 1);

        storage.clear_derived().await?;
        assert!(storage.laps(1).await?.is_empty());
        assert!(storage.telemetry(1).await?.is_empty());
        assert!(storage.session(1).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn rows_for_unknown_or_foreign_sessions_are_rejected() -> anyhow::Result<()> {
        let storage = MemoryStorage::new();
        assert!(storage.replace_laps(9, vec![lap(9, 1)]).await.is_err());

        storage.get_or_create_session(9).await?;
        assert!(storage.replace_laps(9, vec![lap(4, 1)]).await.is_err());
        assert!(storage.replace_telemetry(9, vec![sample(4, 0.0, None)]).await.is_err());
        Ok(())
    }
}
