// ============================================================================
// ERRORES DEL TRACKER
// ============================================================================

use thiserror::Error;

/// Tipo de fallo reportado por la API de geolocalización (códigos W3C)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeolocationErrorKind {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    Unknown,
}

/// Error de una lectura de posición (no detiene el muestreo)
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct GeolocationError {
    pub kind: GeolocationErrorKind,
    pub message: String,
}

impl GeolocationError {
    pub fn new(kind: GeolocationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Construye el error a partir del código numérico del navegador
    pub fn from_code(code: u16, message: impl Into<String>) -> Self {
        let kind = match code {
            1 => GeolocationErrorKind::PermissionDenied,
            2 => GeolocationErrorKind::PositionUnavailable,
            3 => GeolocationErrorKind::Timeout,
            _ => GeolocationErrorKind::Unknown,
        };
        let message = message.into();
        let message = if message.is_empty() {
            match kind {
                GeolocationErrorKind::PermissionDenied => "User denied Geolocation".to_string(),
                GeolocationErrorKind::PositionUnavailable => "Position unavailable".to_string(),
                GeolocationErrorKind::Timeout => "Timeout expired".to_string(),
                GeolocationErrorKind::Unknown => format!("Unknown geolocation error ({})", code),
            }
        } else {
            message
        };
        Self { kind, message }
    }
}

/// Error del núcleo de sincronización de ubicación
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackerError {
    #[error("Geolocation is not supported by your browser")]
    GeolocationUnsupported,

    #[error("Geolocation error: {0}")]
    Geolocation(#[from] GeolocationError),

    #[error("Channel connect failed: {0}")]
    ChannelConnect(String),

    #[error("Config unavailable: {0}")]
    ConfigUnavailable(String),

    /// `stop_tracking` llegó antes de que el arranque terminara
    #[error("Tracking start was cancelled")]
    StartCancelled,

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<serde_json::Error> for TrackerError {
    fn from(e: serde_json::Error) -> Self {
        TrackerError::Protocol(format!("Parse error: {}", e))
    }
}
