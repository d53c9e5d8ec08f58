// ============================================================================
// LOCATION STATE - lo que la UI observa
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::models::{ChannelStatus, PositionSample, RemotePresenceEntry, TrackingStatus};
use crate::state::presence_state::PresenceCache;

/// Snapshot del estado de ubicación publicado a la UI
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationState {
    pub status: TrackingStatus,
    pub channel_status: ChannelStatus,
    pub current_position: Option<PositionSample>,
    pub last_error: Option<String>,
    pub presence: PresenceCache,
}

impl LocationState {
    pub fn is_tracking(&self) -> bool {
        self.status == TrackingStatus::Active
    }

    pub fn watched_location(&self) -> Option<&RemotePresenceEntry> {
        self.presence.watched_location()
    }

    /// Reset completo de sesión (logout)
    pub fn reset(&mut self) {
        self.status = TrackingStatus::Idle;
        self.channel_status = ChannelStatus::Disconnected;
        self.current_position = None;
        self.presence.clear();
        self.presence.clear_watched_user();
    }
}
