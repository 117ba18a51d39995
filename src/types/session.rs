//! Session records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::protocol::{SessionData, session_type_name, track_name};

/// One continuous practice, qualifying or race instance.
///
/// Created the first time a packet with its uid is seen; metadata is filled
/// in once a session packet arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: u64,
    pub track_id: Option<i8>,
    pub session_type: Option<u8>,
    pub game_mode: Option<u8>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: u64) -> Self {
        Self { id, track_id: None, session_type: None, game_mode: None, created_at: Utc::now() }
    }

    /// True while track or session type is still unknown.
    pub fn lacks_metadata(&self) -> bool {
        self.track_id.is_none() || self.session_type.is_none()
    }

    /// Overwrite every field that `metadata` carries.
    pub fn apply(&mut self, metadata: &SessionMetadata) {
        if let Some(track_id) = metadata.track_id {
            self.track_id = Some(track_id);
        }
        if let Some(session_type) = metadata.session_type {
            self.session_type = Some(session_type);
        }
        if let Some(game_mode) = metadata.game_mode {
            self.game_mode = Some(game_mode);
        }
    }

    pub fn track_name(&self) -> Option<&'static str> {
        self.track_id.and_then(track_name)
    }

    pub fn session_type_name(&self) -> Option<&'static str> {
        self.session_type.map(session_type_name)
    }
}

/// Partial session metadata; `None` fields are left untouched on update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub track_id: Option<i8>,
    pub session_type: Option<u8>,
    pub game_mode: Option<u8>,
}

impl SessionMetadata {
    pub fn is_empty(&self) -> bool {
        self.track_id.is_none() && self.session_type.is_none() && self.game_mode.is_none()
    }

    /// The subset of these fields that `session` does not have yet.
    pub fn missing_from(&self, session: &Session) -> SessionMetadata {
        SessionMetadata {
            track_id: self.track_id.filter(|_| session.track_id.is_none()),
            session_type: self.session_type.filter(|_| session.session_type.is_none()),
            game_mode: self.game_mode.filter(|_| session.game_mode.is_none()),
        }
    }
}

impl From<&SessionData> for SessionMetadata {
    fn from(data: &SessionData) -> Self {
        Self {
            track_id: Some(data.track_id),
            session_type: Some(data.session_type),
            game_mode: Some(data.game_mode),
        }
    }
}
