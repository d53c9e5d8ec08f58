use std::rc::Rc;

use crate::error::{GeolocationError, TrackerError};
use crate::models::PositionSample;

/// Identificador de una suscripción `watchPosition`
pub type WatchId = i32;

/// Callback compartido por el watch continuo y las lecturas puntuales
pub type PositionCallback = Rc<dyn Fn(Result<PositionSample, GeolocationError>)>;

/// Opciones de adquisición (PositionOptions del navegador)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    pub timeout_ms: Option<u32>,
    pub maximum_age_ms: Option<u32>,
}

impl PositionOptions {
    /// Watch continuo: alta precisión, timeout de adquisición, sin caché
    pub fn continuous(timeout_ms: u32) -> Self {
        Self {
            enable_high_accuracy: true,
            timeout_ms: Some(timeout_ms),
            maximum_age_ms: Some(0),
        }
    }

    /// Lectura puntual del sondeo de respaldo
    pub fn one_shot() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout_ms: None,
            maximum_age_ms: None,
        }
    }
}

/// Capacidad de geolocalización del dispositivo
pub trait GeolocationProvider {
    /// `false` si el runtime no expone `navigator.geolocation`
    fn is_supported(&self) -> bool;

    fn watch_position(
        &self,
        options: PositionOptions,
        callback: PositionCallback,
    ) -> Result<WatchId, TrackerError>;

    fn clear_watch(&self, id: WatchId);

    fn get_current_position(&self, options: PositionOptions, callback: PositionCallback);
}
