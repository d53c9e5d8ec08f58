// ============================================================================
// WEB - adaptadores del navegador (solo wasm32)
// ============================================================================

pub mod geolocation;
pub mod http;
pub mod spawner;
pub mod timers;
pub mod websocket;

pub use geolocation::BrowserGeolocation;
pub use http::GlooHttpClient;
pub use spawner::WasmSpawner;
pub use timers::GlooIntervalScheduler;
pub use websocket::WebSocketConnector;

use wasm_bindgen::JsValue;

/// Mensaje legible de un error de JS
pub(crate) fn js_error(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

/// Suelta closures fuera del callback que las está ejecutando
pub(crate) fn defer_drop<T: 'static>(value: T) {
    wasm_bindgen_futures::spawn_local(async move {
        drop(value);
    });
}
