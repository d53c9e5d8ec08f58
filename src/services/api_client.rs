// ============================================================================
// API CLIENT - SOLO COMUNICACIÓN HTTP (Stateless)
// ============================================================================
// NO tiene lógica de negocio, solo hace requests HTTP
// ============================================================================

use std::rc::Rc;

use futures::future::LocalBoxFuture;
use serde::de::DeserializeOwned;

use crate::config::RuntimeConfig;
use crate::error::TrackerError;
use crate::models::{LatestLocationRecord, PositionSample};
use crate::utils::constants::{LATEST_LOCATION_ENDPOINT, LOCATIONS_ENDPOINT};

/// Respuesta HTTP ya leída
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TrackerError> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Convierte un status no-2xx en error
    pub fn error_for_status(self) -> Result<Self, TrackerError> {
        if self.ok() {
            Ok(self)
        } else {
            let message = if self.body.is_empty() {
                "Unknown error".to_string()
            } else {
                self.body
            };
            Err(TrackerError::Http {
                status: self.status,
                message,
            })
        }
    }
}

/// Transporte HTTP (fetch en el navegador, doble en tests)
pub trait HttpClient {
    fn get(&self, url: &str, bearer: Option<&str>)
        -> LocalBoxFuture<'static, Result<HttpResponse, TrackerError>>;

    /// POST con `Content-Type: application/json` y `Authorization: Bearer` si hay token
    fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        bearer: Option<&str>,
    ) -> LocalBoxFuture<'static, Result<HttpResponse, TrackerError>>;
}

/// Une la URL base del backend con una ruta absoluta
pub fn join_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Cliente API de ubicaciones
#[derive(Clone)]
pub struct LocationApi {
    http: Rc<dyn HttpClient>,
}

impl LocationApi {
    pub fn new(http: Rc<dyn HttpClient>) -> Self {
        Self { http }
    }

    /// Documento de configuración remota (GET sin auth)
    pub async fn fetch_runtime_config(&self, url: &str) -> Result<RuntimeConfig, TrackerError> {
        let response = self.http.get(url, None).await?.error_for_status()?;
        response.json::<RuntimeConfig>()
    }

    /// POST /api/locations con la muestra como JSON
    pub async fn post_location(
        &self,
        base_url: &str,
        sample: &PositionSample,
        token: Option<&str>,
    ) -> Result<(), TrackerError> {
        let url = join_url(base_url, LOCATIONS_ENDPOINT);
        let body = serde_json::to_value(sample)?;
        self.http.post_json(&url, &body, token).await?.error_for_status()?;
        Ok(())
    }

    /// Última ubicación registrada de un usuario (404 = sin datos)
    pub async fn fetch_latest_location(
        &self,
        base_url: &str,
        user_id: &str,
        token: Option<&str>,
    ) -> Result<Option<LatestLocationRecord>, TrackerError> {
        let url = join_url(base_url, &format!("{}/{}", LATEST_LOCATION_ENDPOINT, user_id));
        let response = self.http.get(&url, token).await?;

        if response.status == 404 {
            log::info!("⚠️ [REST] Sin ubicaciones registradas para el usuario {}", user_id);
            return Ok(None);
        }

        let record = response.error_for_status()?.json::<LatestLocationRecord>()?;
        Ok(Some(record))
    }
}
