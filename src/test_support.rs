// Dobles en memoria de las capacidades del navegador (solo tests)

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::channel::oneshot;
use futures::future::{FutureExt, LocalBoxFuture, Shared};
use serde_json::Value;

use crate::error::{GeolocationError, GeolocationErrorKind, TrackerError};
use crate::models::PositionSample;
use crate::services::api_client::{HttpClient, HttpResponse};
use crate::services::geolocation::{GeolocationProvider, PositionCallback, PositionOptions, WatchId};
use crate::services::socket_channel::{
    ChannelEvent, ChannelEventHandler, ChannelTarget, SocketChannel, SocketConnector,
};
use crate::services::timer::{IntervalScheduler, TimerGuard};

// ----------------------------------------------------------------------------
// HTTP
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub url: String,
    pub body: Option<Value>,
    pub bearer: Option<String>,
}

pub struct MockHttp {
    requests: RefCell<Vec<RecordedRequest>>,
    get_response: RefCell<Result<HttpResponse, TrackerError>>,
    post_status: Cell<u16>,
    gate: RefCell<Option<Shared<oneshot::Receiver<()>>>>,
}

impl MockHttp {
    pub fn new() -> Self {
        Self {
            requests: RefCell::new(Vec::new()),
            get_response: RefCell::new(Ok(HttpResponse {
                status: 200,
                body: "{}".to_string(),
            })),
            post_status: Cell::new(201),
            gate: RefCell::new(None),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.borrow().clone()
    }

    pub fn get_count(&self) -> usize {
        self.requests.borrow().iter().filter(|r| r.method == "GET").count()
    }

    pub fn post_count(&self) -> usize {
        self.requests.borrow().iter().filter(|r| r.method == "POST").count()
    }

    pub fn set_get_response(&self, response: Result<HttpResponse, TrackerError>) {
        *self.get_response.borrow_mut() = response;
    }

    pub fn set_post_status(&self, status: u16) {
        self.post_status.set(status);
    }

    /// Los GET quedan pendientes hasta que se envíe por el sender devuelto
    pub fn hold_gets(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.gate.borrow_mut() = Some(rx.shared());
        tx
    }
}

impl HttpClient for MockHttp {
    fn get(&self, url: &str, bearer: Option<&str>) -> LocalBoxFuture<'static, Result<HttpResponse, TrackerError>> {
        self.requests.borrow_mut().push(RecordedRequest {
            method: "GET",
            url: url.to_string(),
            body: None,
            bearer: bearer.map(str::to_string),
        });
        let response = self.get_response.borrow().clone();
        let gate = self.gate.borrow().clone();
        async move {
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            response
        }
        .boxed_local()
    }

    fn post_json(
        &self,
        url: &str,
        body: &Value,
        bearer: Option<&str>,
    ) -> LocalBoxFuture<'static, Result<HttpResponse, TrackerError>> {
        self.requests.borrow_mut().push(RecordedRequest {
            method: "POST",
            url: url.to_string(),
            body: Some(body.clone()),
            bearer: bearer.map(str::to_string),
        });
        let status = self.post_status.get();
        async move {
            Ok(HttpResponse {
                status,
                body: String::new(),
            })
        }
        .boxed_local()
    }
}

// ----------------------------------------------------------------------------
// Geolocalización
// ----------------------------------------------------------------------------

pub struct MockGeolocation {
    supported: Cell<bool>,
    next_id: Cell<WatchId>,
    watches: RefCell<Vec<(WatchId, PositionOptions, PositionCallback)>>,
    watch_calls: Cell<usize>,
    fail_next_watch: RefCell<Option<String>>,
    one_shots: RefCell<Vec<PositionCallback>>,
}

impl MockGeolocation {
    pub fn new() -> Self {
        Self {
            supported: Cell::new(true),
            next_id: Cell::new(1),
            watches: RefCell::new(Vec::new()),
            watch_calls: Cell::new(0),
            fail_next_watch: RefCell::new(None),
            one_shots: RefCell::new(Vec::new()),
        }
    }

    pub fn set_supported(&self, supported: bool) {
        self.supported.set(supported);
    }

    pub fn fail_next_watch(&self, message: &str) {
        *self.fail_next_watch.borrow_mut() = Some(message.to_string());
    }

    pub fn active_watches(&self) -> usize {
        self.watches.borrow().len()
    }

    pub fn watch_calls(&self) -> usize {
        self.watch_calls.get()
    }

    pub fn watch_ids(&self) -> Vec<WatchId> {
        self.watches.borrow().iter().map(|(id, _, _)| *id).collect()
    }

    pub fn last_watch_options(&self) -> Option<PositionOptions> {
        self.watches.borrow().last().map(|(_, options, _)| *options)
    }

    pub fn watch_callback(&self, id: WatchId) -> Option<PositionCallback> {
        self.watches
            .borrow()
            .iter()
            .find(|(watch_id, _, _)| *watch_id == id)
            .map(|(_, _, callback)| callback.clone())
    }

    /// Entrega una lectura a todos los watches activos
    pub fn emit_watch(&self, result: Result<PositionSample, GeolocationError>) {
        let callbacks: Vec<PositionCallback> =
            self.watches.borrow().iter().map(|(_, _, cb)| cb.clone()).collect();
        for callback in callbacks {
            callback(result.clone());
        }
    }

    pub fn pending_one_shots(&self) -> usize {
        self.one_shots.borrow().len()
    }

    /// Completa todas las lecturas puntuales pendientes
    pub fn resolve_one_shots(&self, result: Result<PositionSample, GeolocationError>) {
        let callbacks: Vec<PositionCallback> = self.one_shots.borrow_mut().drain(..).collect();
        for callback in callbacks {
            callback(result.clone());
        }
    }
}

impl GeolocationProvider for MockGeolocation {
    fn is_supported(&self) -> bool {
        self.supported.get()
    }

    fn watch_position(&self, options: PositionOptions, callback: PositionCallback) -> Result<WatchId, TrackerError> {
        self.watch_calls.set(self.watch_calls.get() + 1);
        if let Some(message) = self.fail_next_watch.borrow_mut().take() {
            return Err(TrackerError::Geolocation(GeolocationError::new(
                GeolocationErrorKind::Unknown,
                message,
            )));
        }
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.watches.borrow_mut().push((id, options, callback));
        Ok(id)
    }

    fn clear_watch(&self, id: WatchId) {
        self.watches.borrow_mut().retain(|(watch_id, _, _)| *watch_id != id);
    }

    fn get_current_position(&self, _options: PositionOptions, callback: PositionCallback) {
        self.one_shots.borrow_mut().push(callback);
    }
}

// ----------------------------------------------------------------------------
// Timers
// ----------------------------------------------------------------------------

struct MockInterval {
    period_ms: u32,
    active: Rc<Cell<bool>>,
    tick: Rc<RefCell<Box<dyn FnMut()>>>,
}

struct MockTimerGuard {
    active: Rc<Cell<bool>>,
}

impl TimerGuard for MockTimerGuard {
    fn cancel(self: Box<Self>) {
        self.active.set(false);
    }
}

pub struct MockTimers {
    intervals: RefCell<Vec<MockInterval>>,
}

impl MockTimers {
    pub fn new() -> Self {
        Self {
            intervals: RefCell::new(Vec::new()),
        }
    }

    pub fn active_count(&self) -> usize {
        self.intervals.borrow().iter().filter(|i| i.active.get()).count()
    }

    pub fn created_count(&self) -> usize {
        self.intervals.borrow().len()
    }

    pub fn periods(&self) -> Vec<u32> {
        self.intervals
            .borrow()
            .iter()
            .filter(|i| i.active.get())
            .map(|i| i.period_ms)
            .collect()
    }

    /// Dispara una vez cada intervalo activo
    pub fn tick_all(&self) {
        let ticks: Vec<_> = self
            .intervals
            .borrow()
            .iter()
            .filter(|i| i.active.get())
            .map(|i| i.tick.clone())
            .collect();
        for tick in ticks {
            let mut tick = tick.borrow_mut();
            (tick.as_mut())();
        }
    }
}

impl IntervalScheduler for MockTimers {
    fn every(&self, period_ms: u32, tick: Box<dyn FnMut()>) -> Box<dyn TimerGuard> {
        let active = Rc::new(Cell::new(true));
        self.intervals.borrow_mut().push(MockInterval {
            period_ms,
            active: active.clone(),
            tick: Rc::new(RefCell::new(tick)),
        });
        Box::new(MockTimerGuard { active })
    }
}

// ----------------------------------------------------------------------------
// Canal persistente
// ----------------------------------------------------------------------------

pub struct MockChannel {
    connected: Cell<bool>,
    disconnected: Cell<bool>,
    fail_emits: Cell<bool>,
    emitted: RefCell<Vec<(String, Value)>>,
}

impl MockChannel {
    fn new() -> Self {
        Self {
            connected: Cell::new(false),
            disconnected: Cell::new(false),
            fail_emits: Cell::new(false),
            emitted: RefCell::new(Vec::new()),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.set(connected);
    }

    pub fn fail_emits(&self, fail: bool) {
        self.fail_emits.set(fail);
    }

    pub fn emitted(&self) -> Vec<(String, Value)> {
        self.emitted.borrow().clone()
    }

    pub fn was_disconnected(&self) -> bool {
        self.disconnected.get()
    }
}

impl SocketChannel for MockChannel {
    fn is_connected(&self) -> bool {
        self.connected.get()
    }

    fn emit(&self, event: &str, payload: Value) -> Result<(), TrackerError> {
        if self.fail_emits.get() {
            return Err(TrackerError::Network("socket closed".to_string()));
        }
        self.emitted.borrow_mut().push((event.to_string(), payload));
        Ok(())
    }

    fn disconnect(&self) {
        self.connected.set(false);
        self.disconnected.set(true);
    }
}

pub struct MockConnector {
    targets: RefCell<Vec<ChannelTarget>>,
    channels: RefCell<Vec<Rc<MockChannel>>>,
    handlers: RefCell<Vec<ChannelEventHandler>>,
    fail_next: RefCell<Option<String>>,
    auto_connect: Cell<bool>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self {
            targets: RefCell::new(Vec::new()),
            channels: RefCell::new(Vec::new()),
            handlers: RefCell::new(Vec::new()),
            fail_next: RefCell::new(None),
            auto_connect: Cell::new(false),
        }
    }

    /// Los canales nuevos completan el handshake al crearse
    pub fn set_auto_connect(&self, auto_connect: bool) {
        self.auto_connect.set(auto_connect);
    }

    pub fn fail_next(&self, message: &str) {
        *self.fail_next.borrow_mut() = Some(message.to_string());
    }

    pub fn targets(&self) -> Vec<ChannelTarget> {
        self.targets.borrow().clone()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.borrow().len()
    }

    pub fn last_channel(&self) -> Option<Rc<MockChannel>> {
        self.channels.borrow().last().cloned()
    }

    pub fn last_handler(&self) -> Option<ChannelEventHandler> {
        self.handlers.borrow().last().cloned()
    }

    /// Simula un evento entrante en el último canal creado
    pub fn inject(&self, event: ChannelEvent) {
        if let Some(handler) = self.last_handler() {
            handler(event);
        }
    }
}

impl SocketConnector for MockConnector {
    fn connect(
        &self,
        target: &ChannelTarget,
        on_event: ChannelEventHandler,
    ) -> Result<Rc<dyn SocketChannel>, TrackerError> {
        self.targets.borrow_mut().push(target.clone());
        if let Some(message) = self.fail_next.borrow_mut().take() {
            return Err(TrackerError::ChannelConnect(message));
        }

        let channel = Rc::new(MockChannel::new());
        self.channels.borrow_mut().push(channel.clone());
        self.handlers.borrow_mut().push(on_event.clone());

        if self.auto_connect.get() {
            channel.set_connected(true);
            on_event(ChannelEvent::Connected);
        }
        let channel: Rc<dyn SocketChannel> = channel;
        Ok(channel)
    }
}
