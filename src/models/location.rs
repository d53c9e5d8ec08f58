use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::TrackerError;

/// Lectura instantánea de la posición del dispositivo
///
/// Es también el cuerpo del evento `update_location` y del POST REST:
/// `{ lat, lng, accuracy, timestamp }` (accuracy puede ser null).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub lat: f64,
    pub lng: f64,
    pub accuracy: Option<f64>,
    /// Epoch en milisegundos
    pub timestamp: u64,
}

impl PositionSample {
    pub fn new(lat: f64, lng: f64, accuracy: Option<f64>, timestamp: u64) -> Self {
        Self {
            lat,
            lng,
            accuracy,
            timestamp,
        }
    }

    /// Obtener coordenadas como tupla (lat, lng)
    pub fn coordinates(&self) -> (f64, f64) {
        (self.lat, self.lng)
    }
}

/// Última posición conocida de otro usuario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemotePresenceEntry {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    pub timestamp: u64,
}

// ----------------------------------------------------------------------------
// Formatos de cable del backend
// ----------------------------------------------------------------------------

/// El backend emite el id de usuario como número (subject del JWT) o string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WireUserId {
    Number(i64),
    Text(String),
}

impl WireUserId {
    pub fn into_string(self) -> String {
        match self {
            WireUserId::Number(n) => n.to_string(),
            WireUserId::Text(s) => s,
        }
    }
}

/// Timestamp en epoch ms (relay del socket) o ISO-8601 (relay del POST REST)
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WireTimestamp {
    Millis(f64),
    Text(String),
}

impl WireTimestamp {
    pub fn to_millis(&self) -> Option<u64> {
        match self {
            WireTimestamp::Millis(ms) if ms.is_finite() && *ms >= 0.0 => Some(*ms as u64),
            WireTimestamp::Millis(_) => None,
            WireTimestamp::Text(text) => parse_timestamp_text(text),
        }
    }
}

fn parse_timestamp_text(text: &str) -> Option<u64> {
    let text = text.trim();
    if let Ok(ms) = text.parse::<u64>() {
        return Some(ms);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return u64::try_from(dt.timestamp_millis()).ok();
    }
    // isoformat() de Python sin zona horaria: se asume UTC
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .and_then(|dt| u64::try_from(dt.and_utc().timestamp_millis()).ok())
}

fn resolve_timestamp(timestamp: Option<WireTimestamp>, received_at: u64) -> Result<u64, TrackerError> {
    match timestamp {
        None => Ok(received_at),
        Some(ts) => ts
            .to_millis()
            .ok_or_else(|| TrackerError::Protocol(format!("Invalid timestamp: {:?}", ts))),
    }
}

/// Payload del evento entrante `location_update`
#[derive(Debug, Clone, Deserialize)]
pub struct LocationUpdatePayload {
    #[serde(rename = "userId")]
    pub user_id: WireUserId,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<WireTimestamp>,
}

impl LocationUpdatePayload {
    /// Normaliza el payload; sin timestamp se usa la hora de recepción
    pub fn into_entry(self, received_at: u64) -> Result<RemotePresenceEntry, TrackerError> {
        Ok(RemotePresenceEntry {
            user_id: self.user_id.into_string(),
            lat: self.lat,
            lng: self.lng,
            accuracy: self.accuracy,
            timestamp: resolve_timestamp(self.timestamp, received_at)?,
        })
    }
}

/// Registro de `GET /api/locations/latest/<id>`
#[derive(Debug, Clone, Deserialize)]
pub struct LatestLocationRecord {
    pub user_id: WireUserId,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<WireTimestamp>,
}

impl LatestLocationRecord {
    pub fn into_entry(self, received_at: u64) -> Result<RemotePresenceEntry, TrackerError> {
        Ok(RemotePresenceEntry {
            user_id: self.user_id.into_string(),
            lat: self.latitude,
            lng: self.longitude,
            accuracy: self.accuracy,
            timestamp: resolve_timestamp(self.timestamp, received_at)?,
        })
    }
}
