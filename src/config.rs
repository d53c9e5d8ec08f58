use serde::{Deserialize, Serialize};

use crate::utils::constants::{DEFAULT_BACKEND_URL, DEFAULT_CONFIG_URL};

/// Configuración de compilación del cliente de tracking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// URL del backend usada cuando la configuración remota no trae `backendUrl`
    pub fallback_backend_url: String,
    /// Documento JSON con la configuración de runtime
    pub config_url: String,
    pub enable_logging: bool,
    pub tracking: TrackingSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            fallback_backend_url: DEFAULT_BACKEND_URL.to_string(),
            config_url: DEFAULT_CONFIG_URL.to_string(),
            enable_logging: true,
            tracking: TrackingSettings::default(),
        }
    }
}

/// Parámetros del muestreo de posición y de la caché de presencia
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingSettings {
    /// Intervalo del sondeo de respaldo (getCurrentPosition)
    pub backup_poll_interval_ms: u32,
    /// Timeout de adquisición del GPS
    pub geolocation_timeout_ms: u32,
    /// Descartar muestras más antiguas que la posición actual
    pub reject_stale_samples: bool,
    /// Expiración de entradas de presencia remota (None = sin expiración)
    pub presence_ttl_ms: Option<u64>,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            backup_poll_interval_ms: 30_000,
            geolocation_timeout_ms: 10_000,
            reject_stale_samples: false,
            presence_ttl_ms: None,
        }
    }
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno en tiempo de compilación
    pub fn from_env() -> Self {
        let defaults = TrackingSettings::default();
        Self {
            fallback_backend_url: option_env!("BACKEND_URL")
                .unwrap_or(DEFAULT_BACKEND_URL)
                .to_string(),
            config_url: option_env!("CONFIG_URL")
                .unwrap_or(DEFAULT_CONFIG_URL)
                .to_string(),
            enable_logging: option_env!("ENABLE_LOGGING")
                .unwrap_or("true").parse().unwrap_or(true),
            tracking: TrackingSettings {
                backup_poll_interval_ms: option_env!("BACKUP_POLL_INTERVAL_MS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.backup_poll_interval_ms),
                geolocation_timeout_ms: option_env!("GEOLOCATION_TIMEOUT_MS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.geolocation_timeout_ms),
                reject_stale_samples: option_env!("REJECT_STALE_SAMPLES")
                    .unwrap_or("false").parse().unwrap_or(false),
                presence_ttl_ms: option_env!("PRESENCE_TTL_MS").and_then(|v| v.parse().ok()),
            },
        }
    }

    /// Verifica si el modo de logging está habilitado
    pub fn is_logging_enabled(&self) -> bool {
        self.enable_logging
    }
}

/// Configuración de runtime publicada por el servidor (`config.json`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(rename = "backendUrl", default)]
    pub backend_url: String,
}

impl RuntimeConfig {
    /// URL efectiva del backend: la remota si existe, si no el fallback
    pub fn backend_url_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        let url = self.backend_url.trim();
        if url.is_empty() {
            fallback
        } else {
            url
        }
    }
}

// Configuración global estática
lazy_static::lazy_static! {
    pub static ref CONFIG: AppConfig = AppConfig::from_env();
}
