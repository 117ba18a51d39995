//! Storage collaborator for sessions and derived records.
//!
//! The pipeline only ever needs get-or-create, metadata updates and
//! wholesale replacement of a session's derived rows; it never issues
//! aggregation or filter queries. Raw packets are served by the
//! [`archive`](crate::archive) instead.

mod memory;

use crate::error::Result;
use crate::types::{Lap, Session, SessionMetadata, TelemetrySample};

pub use memory::MemoryStorage;

/// Persistence seam for sessions, laps and telemetry samples.
///
/// Implementations must make [`Storage::replace_derived`] all-or-nothing per
/// session: either both tables hold the new rows or neither changed.
#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// Fetch the session, creating it when absent.
    ///
    /// The returned flag is `true` when this call created the record.
    async fn get_or_create_session(&self, session_id: u64) -> Result<(Session, bool)>;

    /// Write every field `metadata` carries; returns the updated session.
    async fn update_session_metadata(
        &self,
        session_id: u64,
        metadata: SessionMetadata,
    ) -> Result<Session>;

    async fn replace_laps(&self, session_id: u64, laps: Vec<Lap>) -> Result<()>;

    async fn replace_telemetry(
        &self,
        session_id: u64,
        samples: Vec<TelemetrySample>,
    ) -> Result<()>;

    /// Replace both derived tables of one session atomically.
    async fn replace_derived(
        &self,
        session_id: u64,
        laps: Vec<Lap>,
        samples: Vec<TelemetrySample>,
    ) -> Result<()>;

    /// Drop every lap and sample of every session. Sessions are kept.
    async fn clear_derived(&self) -> Result<()>;

    async fn session(&self, session_id: u64) -> Result<Option<Session>>;

    /// All sessions, ascending by id.
    async fn sessions(&self) -> Result<Vec<Session>>;

    /// Laps of one session, ascending by number.
    async fn laps(&self, session_id: u64) -> Result<Vec<Lap>>;

    /// Samples of one session, ascending by session time.
    async fn telemetry(&self, session_id: u64) -> Result<Vec<TelemetrySample>>;
}
