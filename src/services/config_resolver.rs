// ============================================================================
// CONFIG RESOLVER - configuración remota memoizada
// ============================================================================
// Se descarga como máximo una vez por proceso. Las llamadas concurrentes
// comparten el mismo future pendiente; un fallo queda fijado como config vacía.
// ============================================================================

use std::cell::RefCell;

use futures::future::{FutureExt, LocalBoxFuture, Shared};

use crate::config::RuntimeConfig;
use crate::error::TrackerError;
use crate::services::api_client::LocationApi;

type PendingConfig = Shared<LocalBoxFuture<'static, RuntimeConfig>>;

pub struct ConfigResolver {
    api: LocationApi,
    config_url: String,
    fallback_backend_url: String,
    pending: RefCell<Option<PendingConfig>>,
}

impl ConfigResolver {
    pub fn new(api: LocationApi, config_url: &str, fallback_backend_url: &str) -> Self {
        Self {
            api,
            config_url: config_url.to_string(),
            fallback_backend_url: fallback_backend_url.to_string(),
            pending: RefCell::new(None),
        }
    }

    /// Resuelve la configuración de runtime (idempotente)
    pub async fn resolve(&self) -> RuntimeConfig {
        let pending = {
            let mut slot = self.pending.borrow_mut();
            slot.get_or_insert_with(|| {
                let api = self.api.clone();
                let url = self.config_url.clone();
                async move { fetch_or_default(api, url).await }
                    .boxed_local()
                    .shared()
            })
            .clone()
        };
        pending.await
    }

    /// URL efectiva del backend, con el fallback aplicado si la remota está vacía
    pub async fn backend_url(&self) -> String {
        let config = self.resolve().await;
        config.backend_url_or(&self.fallback_backend_url).to_string()
    }

    pub fn fallback_backend_url(&self) -> &str {
        &self.fallback_backend_url
    }
}

async fn fetch_or_default(api: LocationApi, url: String) -> RuntimeConfig {
    log::info!("⚙️ [CONFIG] Cargando configuración remota desde {}", url);
    match fetch_config(&api, &url).await {
        Ok(config) => {
            log::info!("✅ [CONFIG] backendUrl = {:?}", config.backend_url);
            config
        }
        Err(e) => {
            log::warn!("⚠️ [CONFIG] {}; usando valores por defecto", e);
            RuntimeConfig::default()
        }
    }
}

async fn fetch_config(api: &LocationApi, url: &str) -> Result<RuntimeConfig, TrackerError> {
    api.fetch_runtime_config(url)
        .await
        .map_err(|e| TrackerError::ConfigUnavailable(e.to_string()))
}
