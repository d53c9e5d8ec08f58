// ============================================================================
// LOCATION TRACKER PWA - núcleo de tracking en vivo (RUST + WASM)
// ============================================================================
// - Services: backend (config, REST, Socket.IO) y capacidades del navegador
// - State: estado observable de ubicación y presencia remota
// - Stores: máquina de estados de la sesión de tracking
// - Models: estructuras compartidas con el backend
// ============================================================================

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod stores;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use config::{AppConfig, RuntimeConfig, TrackingSettings, CONFIG};
pub use error::{GeolocationError, TrackerError};
pub use stores::{LocationStore, PlatformServices};

#[cfg(target_arch = "wasm32")]
pub use wasm::LocationTracker;

#[cfg(target_arch = "wasm32")]
mod wasm {
    use std::rc::Rc;

    use js_sys::{Function, Promise};
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::future_to_promise;
    use wasm_logger::Config;

    use crate::config::CONFIG;
    use crate::error::TrackerError;
    use crate::services::web::{
        BrowserGeolocation, GlooHttpClient, GlooIntervalScheduler, WasmSpawner, WebSocketConnector,
    };
    use crate::stores::{LocationStore, PlatformServices};
    use crate::utils::storage::LocalStorageTokenStore;
    use crate::utils::TOKEN_STORAGE_KEY;

    #[wasm_bindgen(start)]
    pub fn main() -> Result<(), JsValue> {
        // Inicializar panic hook para mejor debugging
        console_error_panic_hook::set_once();

        let config = if CONFIG.is_logging_enabled() {
            Config::default()
        } else {
            Config::new(log::Level::Warn)
        };
        wasm_logger::init(config);
        log::info!("🚀 Location Tracker - Rust + WASM");

        Ok(())
    }

    fn to_js_error(error: TrackerError) -> JsValue {
        js_sys::Error::new(&error.to_string()).into()
    }

    fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsValue> {
        serde_json::to_string(value).map_err(|e| to_js_error(e.into()))
    }

    /// Punto de entrada para la UI (una instancia por sesión autenticada)
    #[wasm_bindgen]
    pub struct LocationTracker {
        store: LocationStore,
    }

    #[wasm_bindgen]
    impl LocationTracker {
        #[wasm_bindgen(constructor)]
        pub fn new() -> LocationTracker {
            let platform = PlatformServices {
                http: Rc::new(GlooHttpClient),
                geolocation: Rc::new(BrowserGeolocation::new()),
                timers: Rc::new(GlooIntervalScheduler),
                connector: Rc::new(WebSocketConnector),
                tokens: Rc::new(LocalStorageTokenStore::new(TOKEN_STORAGE_KEY)),
                spawner: Rc::new(WasmSpawner),
            };
            LocationTracker {
                store: LocationStore::new(&CONFIG, platform),
            }
        }

        #[wasm_bindgen(js_name = startTracking)]
        pub fn start_tracking(&self) -> Promise {
            let store = self.store.clone();
            future_to_promise(async move {
                store.start_tracking().await.map_err(to_js_error)?;
                Ok(JsValue::UNDEFINED)
            })
        }

        #[wasm_bindgen(js_name = stopTracking)]
        pub fn stop_tracking(&self) {
            self.store.stop_tracking();
        }

        pub fn disconnect(&self) {
            self.store.disconnect();
        }

        #[wasm_bindgen(js_name = initializeSocket)]
        pub fn initialize_socket(&self, token: String) -> Promise {
            let store = self.store.clone();
            future_to_promise(async move {
                store.initialize_socket(&token).await.map_err(to_js_error)?;
                Ok(JsValue::UNDEFINED)
            })
        }

        #[wasm_bindgen(js_name = setWatchedUser)]
        pub fn set_watched_user(&self, user_id: String) {
            self.store.set_watched_user(&user_id);
        }

        #[wasm_bindgen(js_name = clearWatchedUser)]
        pub fn clear_watched_user(&self) {
            self.store.clear_watched_user();
        }

        /// Resuelve con el JSON de la entrada o `null`
        #[wasm_bindgen(js_name = refreshWatchedUser)]
        pub fn refresh_watched_user(&self) -> Promise {
            let store = self.store.clone();
            future_to_promise(async move {
                match store.refresh_watched_user().await.map_err(to_js_error)? {
                    Some(entry) => Ok(JsValue::from_str(&to_json(&entry)?)),
                    None => Ok(JsValue::NULL),
                }
            })
        }

        pub fn snapshot(&self) -> Result<String, JsValue> {
            to_json(&self.store.snapshot())
        }

        pub fn diagnostics(&self) -> Result<String, JsValue> {
            to_json(&self.store.diagnostics())
        }

        /// El callback recibe el snapshot serializado en cada cambio
        pub fn subscribe(&self, callback: Function) -> u32 {
            self.store.subscribe(move |state| {
                let json = match serde_json::to_string(state) {
                    Ok(json) => json,
                    Err(e) => {
                        log::error!("❌ [TRACKING] No se pudo serializar el estado: {}", e);
                        return;
                    }
                };
                if let Err(e) = callback.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
                    log::error!("❌ [TRACKING] Error en subscriber: {:?}", e);
                }
            })
        }

        pub fn unsubscribe(&self, id: u32) -> bool {
            self.store.unsubscribe(id)
        }
    }

    impl Default for LocationTracker {
        fn default() -> Self {
            Self::new()
        }
    }
}
