use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Geolocation, GeolocationPosition, GeolocationPositionError};

use super::{defer_drop, js_error};
use crate::error::{GeolocationError, GeolocationErrorKind, TrackerError};
use crate::models::PositionSample;
use crate::services::geolocation::{GeolocationProvider, PositionCallback, PositionOptions, WatchId};

type JsCallback = Closure<dyn FnMut(JsValue)>;

/// Closures de éxito/error que el navegador mantiene referenciadas
struct CallbackPair {
    success: JsCallback,
    error: JsCallback,
}

impl CallbackPair {
    fn new(callback: PositionCallback, on_done: impl Fn() + Clone + 'static) -> Self {
        let success = Closure::wrap(Box::new({
            let callback = callback.clone();
            let on_done = on_done.clone();
            move |value: JsValue| {
                callback(Ok(to_sample(value)));
                on_done();
            }
        }) as Box<dyn FnMut(JsValue)>);

        let error = Closure::wrap(Box::new(move |value: JsValue| {
            callback(Err(to_error(value)));
            on_done();
        }) as Box<dyn FnMut(JsValue)>);

        Self { success, error }
    }
}

fn to_sample(value: JsValue) -> PositionSample {
    let position: GeolocationPosition = value.unchecked_into();
    let coords = position.coords();
    PositionSample::new(
        coords.latitude(),
        coords.longitude(),
        Some(coords.accuracy()),
        position.timestamp() as u64,
    )
}

fn to_error(value: JsValue) -> GeolocationError {
    let error: GeolocationPositionError = value.unchecked_into();
    GeolocationError::from_code(error.code(), error.message())
}

fn to_js_options(options: &PositionOptions) -> web_sys::PositionOptions {
    let js_options = web_sys::PositionOptions::new();
    js_options.set_enable_high_accuracy(options.enable_high_accuracy);
    if let Some(timeout) = options.timeout_ms {
        js_options.set_timeout(timeout);
    }
    if let Some(maximum_age) = options.maximum_age_ms {
        js_options.set_maximum_age(maximum_age);
    }
    js_options
}

fn navigator_geolocation() -> Option<Geolocation> {
    let navigator = web_sys::window()?.navigator();
    let present = js_sys::Reflect::has(&navigator, &JsValue::from_str("geolocation")).unwrap_or(false);
    if !present {
        return None;
    }
    navigator.geolocation().ok()
}

/// navigator.geolocation
#[derive(Default)]
pub struct BrowserGeolocation {
    watches: RefCell<HashMap<WatchId, CallbackPair>>,
    one_shots: Rc<RefCell<HashMap<u64, CallbackPair>>>,
    next_request: Cell<u64>,
}

impl BrowserGeolocation {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GeolocationProvider for BrowserGeolocation {
    fn is_supported(&self) -> bool {
        navigator_geolocation().is_some()
    }

    fn watch_position(&self, options: PositionOptions, callback: PositionCallback) -> Result<WatchId, TrackerError> {
        let geolocation = navigator_geolocation().ok_or(TrackerError::GeolocationUnsupported)?;
        let pair = CallbackPair::new(callback, || {});

        let id = geolocation
            .watch_position_with_error_callback_and_options(
                pair.success.as_ref().unchecked_ref(),
                Some(pair.error.as_ref().unchecked_ref()),
                &to_js_options(&options),
            )
            .map_err(|e| {
                TrackerError::Geolocation(GeolocationError::new(GeolocationErrorKind::Unknown, js_error(&e)))
            })?;

        self.watches.borrow_mut().insert(id, pair);
        Ok(id)
    }

    fn clear_watch(&self, id: WatchId) {
        if let Some(geolocation) = navigator_geolocation() {
            geolocation.clear_watch(id);
        }
        // Puede llamarse desde dentro del propio callback del watch
        if let Some(pair) = self.watches.borrow_mut().remove(&id) {
            defer_drop(pair);
        }
    }

    fn get_current_position(&self, options: PositionOptions, callback: PositionCallback) {
        let Some(geolocation) = navigator_geolocation() else {
            callback(Err(GeolocationError::new(
                GeolocationErrorKind::Unknown,
                TrackerError::GeolocationUnsupported.to_string(),
            )));
            return;
        };

        let request_id = self.next_request.get();
        self.next_request.set(request_id + 1);

        let one_shots = Rc::downgrade(&self.one_shots);
        let pair = CallbackPair::new(callback, move || {
            if let Some(one_shots) = one_shots.upgrade() {
                if let Some(pair) = one_shots.borrow_mut().remove(&request_id) {
                    defer_drop(pair);
                }
            }
        });

        let result = geolocation.get_current_position_with_error_callback_and_options(
            pair.success.as_ref().unchecked_ref(),
            Some(pair.error.as_ref().unchecked_ref()),
            &to_js_options(&options),
        );

        match result {
            Ok(()) => {
                self.one_shots.borrow_mut().insert(request_id, pair);
            }
            Err(e) => log::error!("❌ [GEO] getCurrentPosition falló: {}", js_error(&e)),
        }
    }
}
