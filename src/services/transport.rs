// ============================================================================
// DUAL-CHANNEL TRANSPORT - canal persistente + respaldo REST
// ============================================================================
// Por cada muestra: si el canal existe y está conectado se emite
// `update_location`; si no, un POST /api/locations fire-and-forget.
// La decisión se reevalúa en cada envío.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::task::{LocalSpawn, LocalSpawnExt};
use serde_json::{json, Value};

use crate::error::TrackerError;
use crate::models::{
    ChannelStatus, DeliveryDiagnostics, DeliveryRoute, LocationUpdatePayload, PositionSample,
    RemotePresenceEntry,
};
use crate::services::api_client::LocationApi;
use crate::services::socket_channel::{ChannelEvent, ChannelTarget, SocketChannel, SocketConnector};
use crate::utils::constants::{LOCATION_UPDATE_EVENT, SOCKET_NAMESPACE, UPDATE_LOCATION_EVENT};
use crate::utils::{now_millis, TokenStore};

/// Identifica un canal concreto; uno reemplazado deja de ser válido
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelHandle(u64);

type PresenceListener = Rc<dyn Fn(RemotePresenceEntry)>;
type StatusListener = Rc<dyn Fn(ChannelStatus)>;

/// Estado compartido con los handlers de eventos del canal
#[derive(Default)]
struct TransportShared {
    /// Id del canal vivo (0 = ninguno)
    live: Cell<u64>,
    status: Cell<ChannelStatus>,
    presence_listeners: RefCell<Vec<PresenceListener>>,
    status_listeners: RefCell<Vec<StatusListener>>,
    diagnostics: RefCell<DeliveryDiagnostics>,
}

impl TransportShared {
    fn set_status(&self, status: ChannelStatus) {
        if self.status.replace(status) == status {
            return;
        }
        let listeners = self.status_listeners.borrow().clone();
        for listener in listeners {
            listener(status);
        }
    }

    fn handle_event(&self, channel_id: u64, event: ChannelEvent) {
        if self.live.get() != channel_id {
            log::debug!("📡 [SOCKET] Evento de un canal reemplazado ignorado: {:?}", event);
            return;
        }

        match event {
            ChannelEvent::Connected => {
                log::info!("📡 [SOCKET] Socket connected");
                self.set_status(ChannelStatus::Connected);
            }
            ChannelEvent::Disconnected { reason } => {
                log::info!("🔌 [SOCKET] Socket disconnected ({})", reason);
                self.set_status(ChannelStatus::Disconnected);
            }
            ChannelEvent::ConnectError { message } => {
                log::warn!("⚠️ [SOCKET] Conexión rechazada: {}", message);
                self.set_status(ChannelStatus::Disconnected);
            }
            ChannelEvent::Message { name, data } if name == LOCATION_UPDATE_EVENT => {
                self.handle_location_update(data);
            }
            ChannelEvent::Message { name, .. } => {
                log::debug!("📡 [SOCKET] Evento sin consumidor: {}", name);
            }
        }
    }

    fn handle_location_update(&self, data: Value) {
        let entry = serde_json::from_value::<LocationUpdatePayload>(data)
            .map_err(TrackerError::from)
            .and_then(|payload| payload.into_entry(now_millis()));

        match entry {
            Ok(entry) => {
                let listeners = self.presence_listeners.borrow().clone();
                for listener in listeners {
                    listener(entry.clone());
                }
            }
            Err(e) => log::warn!("⚠️ [SOCKET] location_update inválido descartado: {}", e),
        }
    }

    fn record_rest_result(&self, result: &Result<(), TrackerError>) {
        let mut diagnostics = self.diagnostics.borrow_mut();
        match result {
            Ok(()) => diagnostics.rest_successes += 1,
            Err(e) => {
                diagnostics.rest_failures += 1;
                diagnostics.last_rest_error = Some(e.to_string());
            }
        }
    }
}

/// Payload de `update_location` y del POST de respaldo
fn sample_payload(sample: &PositionSample) -> Value {
    json!({
        "lat": sample.lat,
        "lng": sample.lng,
        "accuracy": sample.accuracy,
        "timestamp": sample.timestamp,
    })
}

pub struct DualChannelTransport {
    connector: Rc<dyn SocketConnector>,
    api: LocationApi,
    tokens: Rc<dyn TokenStore>,
    spawner: Rc<dyn LocalSpawn>,
    channel: RefCell<Option<(ChannelHandle, Rc<dyn SocketChannel>)>>,
    backend_url: RefCell<String>,
    next_id: Cell<u64>,
    shared: Rc<TransportShared>,
}

impl DualChannelTransport {
    pub fn new(
        connector: Rc<dyn SocketConnector>,
        api: LocationApi,
        tokens: Rc<dyn TokenStore>,
        spawner: Rc<dyn LocalSpawn>,
        backend_url: &str,
    ) -> Self {
        Self {
            connector,
            api,
            tokens,
            spawner,
            channel: RefCell::new(None),
            backend_url: RefCell::new(backend_url.to_string()),
            next_id: Cell::new(1),
            shared: Rc::new(TransportShared::default()),
        }
    }

    /// Abre un canal autenticado; cualquier canal previo se desconecta antes
    pub fn connect(&self, backend_url: &str, token: &str) -> Result<ChannelHandle, TrackerError> {
        self.disconnect_current();
        self.set_backend_url(backend_url);

        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let handle = ChannelHandle(id);

        let target = ChannelTarget {
            base_url: backend_url.to_string(),
            namespace: SOCKET_NAMESPACE.to_string(),
            token: token.to_string(),
        };

        // El conector puede emitir eventos de forma síncrona
        self.shared.live.set(id);
        self.shared.set_status(ChannelStatus::Connecting);

        let shared = Rc::downgrade(&self.shared);
        let on_event = Rc::new(move |event: ChannelEvent| {
            if let Some(shared) = shared.upgrade() {
                shared.handle_event(id, event);
            }
        });

        match self.connector.connect(&target, on_event) {
            Ok(channel) => {
                log::info!("📡 [SOCKET] Canal {} creado hacia {}{}", id, backend_url, SOCKET_NAMESPACE);
                *self.channel.borrow_mut() = Some((handle, channel));
                Ok(handle)
            }
            Err(e) => {
                log::error!("❌ [SOCKET] Error creando el canal: {}", e);
                self.shared.live.set(0);
                self.shared.set_status(ChannelStatus::Disconnected);
                Err(match e {
                    TrackerError::ChannelConnect(_) => e,
                    other => TrackerError::ChannelConnect(other.to_string()),
                })
            }
        }
    }

    /// Base usada por el respaldo REST (también sin canal)
    pub fn set_backend_url(&self, backend_url: &str) {
        *self.backend_url.borrow_mut() = backend_url.to_string();
    }

    pub fn backend_url(&self) -> String {
        self.backend_url.borrow().clone()
    }

    pub fn has_channel(&self) -> bool {
        self.channel.borrow().is_some()
    }

    pub fn current_handle(&self) -> Option<ChannelHandle> {
        self.channel.borrow().as_ref().map(|(handle, _)| *handle)
    }

    pub fn is_connected(&self) -> bool {
        self.channel
            .borrow()
            .as_ref()
            .map(|(_, channel)| channel.is_connected())
            .unwrap_or(false)
    }

    pub fn channel_status(&self) -> ChannelStatus {
        self.shared.status.get()
    }

    pub fn diagnostics(&self) -> DeliveryDiagnostics {
        self.shared.diagnostics.borrow().clone()
    }

    pub fn on_presence_update<F>(&self, callback: F)
    where
        F: Fn(RemotePresenceEntry) + 'static,
    {
        self.shared.presence_listeners.borrow_mut().push(Rc::new(callback));
    }

    pub fn on_status_change<F>(&self, callback: F)
    where
        F: Fn(ChannelStatus) + 'static,
    {
        self.shared.status_listeners.borrow_mut().push(Rc::new(callback));
    }

    /// Envía una muestra por el canal si está conectado, si no por REST
    pub fn send(&self, sample: &PositionSample) -> DeliveryRoute {
        let channel = self
            .channel
            .borrow()
            .as_ref()
            .map(|(_, channel)| channel.clone())
            .filter(|channel| channel.is_connected());

        if let Some(channel) = channel {
            match channel.emit(UPDATE_LOCATION_EVENT, sample_payload(sample)) {
                Ok(()) => {
                    self.shared.diagnostics.borrow_mut().channel_emits += 1;
                    return DeliveryRoute::Channel;
                }
                Err(e) => log::warn!("⚠️ [SOCKET] emit falló, usando REST: {}", e),
            }
        }

        self.send_via_rest(*sample);
        DeliveryRoute::Rest
    }

    fn send_via_rest(&self, sample: PositionSample) {
        let api = self.api.clone();
        let base_url = self.backend_url();
        let token = self.tokens.token();
        let shared = self.shared.clone();

        let request = async move {
            let result = api.post_location(&base_url, &sample, token.as_deref()).await;
            match &result {
                Ok(()) => log::debug!("🌐 [REST] Ubicación enviada por API"),
                Err(e) => log::error!("❌ [REST] Failed to send location via API: {}", e),
            }
            shared.record_rest_result(&result);
        };

        if let Err(e) = self.spawner.spawn_local(request) {
            log::error!("❌ [REST] No se pudo lanzar el envío: {}", e);
            self.shared
                .record_rest_result(&Err(TrackerError::Network(e.to_string())));
        }
    }

    /// Desconecta el canal si `handle` sigue siendo el vivo
    pub fn disconnect(&self, handle: ChannelHandle) -> bool {
        if self.current_handle() != Some(handle) {
            return false;
        }
        self.disconnect_current();
        true
    }

    pub fn disconnect_current(&self) {
        let previous = self.channel.borrow_mut().take();
        if let Some((handle, channel)) = previous {
            log::info!("🔌 [SOCKET] Desconectando canal {}", handle.0);
            self.shared.live.set(0);
            channel.disconnect();
            self.shared.set_status(ChannelStatus::Disconnected);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockConnector, MockHttp};
    use crate::utils::MemoryTokenStore;
    use futures::executor::LocalPool;

    struct Fixture {
        pool: LocalPool,
        http: Rc<MockHttp>,
        connector: Rc<MockConnector>,
        tokens: Rc<MemoryTokenStore>,
        transport: DualChannelTransport,
    }

    fn fixture() -> Fixture {
        let pool = LocalPool::new();
        let http = Rc::new(MockHttp::new());
        let connector = Rc::new(MockConnector::new());
        let tokens = Rc::new(MemoryTokenStore::new(Some("jwt")));
        let transport = DualChannelTransport::new(
            connector.clone(),
            LocationApi::new(http.clone()),
            tokens.clone(),
            Rc::new(pool.spawner()),
            "http://backend",
        );
        Fixture {
            pool,
            http,
            connector,
            tokens,
            transport,
        }
    }

    fn sample() -> PositionSample {
        PositionSample::new(48.85, 2.35, Some(4.0), 1_000)
    }

    #[test]
    fn test_connected_channel_is_preferred() {
        let mut f = fixture();
        f.transport.connect("http://backend", "jwt").unwrap();
        f.connector.last_channel().unwrap().set_connected(true);

        assert_eq!(f.transport.send(&sample()), DeliveryRoute::Channel);
        f.pool.run_until_stalled();

        let emitted = f.connector.last_channel().unwrap().emitted();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].0, "update_location");
        assert_eq!(emitted[0].1, json!({"lat": 48.85, "lng": 2.35, "accuracy": 4.0, "timestamp": 1_000}));
        assert!(f.http.requests().is_empty());
        assert_eq!(f.transport.diagnostics().channel_emits, 1);
    }

    #[test]
    fn test_rest_fallback_without_connected_channel() {
        let mut f = fixture();
        f.transport.connect("http://backend", "jwt").unwrap();

        assert_eq!(f.transport.send(&sample()), DeliveryRoute::Rest);
        f.pool.run_until_stalled();

        let requests = f.http.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "http://backend/api/locations");
        assert_eq!(requests[0].bearer.as_deref(), Some("jwt"));
        assert_eq!(requests[0].body, Some(sample_payload(&sample())));
        assert!(f.connector.last_channel().unwrap().emitted().is_empty());
    }

    #[test]
    fn test_rest_fallback_without_channel_or_token() {
        let mut f = fixture();
        f.tokens.set_token(None);

        assert_eq!(f.transport.send(&sample()), DeliveryRoute::Rest);
        f.pool.run_until_stalled();

        let requests = f.http.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].bearer, None);
    }

    #[test]
    fn test_routing_is_reevaluated_per_sample() {
        let mut f = fixture();
        f.transport.connect("http://backend", "jwt").unwrap();
        let channel = f.connector.last_channel().unwrap();

        channel.set_connected(true);
        assert_eq!(f.transport.send(&sample()), DeliveryRoute::Channel);
        channel.set_connected(false);
        assert_eq!(f.transport.send(&sample()), DeliveryRoute::Rest);
        f.pool.run_until_stalled();
        assert_eq!(f.http.requests().len(), 1);
    }

    #[test]
    fn test_emit_failure_falls_back_to_rest() {
        let mut f = fixture();
        f.transport.connect("http://backend", "jwt").unwrap();
        let channel = f.connector.last_channel().unwrap();
        channel.set_connected(true);
        channel.fail_emits(true);

        assert_eq!(f.transport.send(&sample()), DeliveryRoute::Rest);
        f.pool.run_until_stalled();
        assert_eq!(f.http.requests().len(), 1);
    }

    #[test]
    fn test_rest_failure_is_only_diagnostic() {
        let mut f = fixture();
        f.http.set_post_status(500);

        assert_eq!(f.transport.send(&sample()), DeliveryRoute::Rest);
        f.pool.run_until_stalled();

        let diagnostics = f.transport.diagnostics();
        assert_eq!(diagnostics.rest_failures, 1);
        assert!(diagnostics.last_rest_error.unwrap().contains("500"));
    }

    #[test]
    fn test_connect_replaces_previous_channel() {
        let f = fixture();
        let first = f.transport.connect("http://backend", "jwt").unwrap();
        let first_channel = f.connector.last_channel().unwrap();
        let second = f.transport.connect("http://backend", "jwt2").unwrap();

        assert_ne!(first, second);
        assert!(first_channel.was_disconnected());
        assert_eq!(f.connector.targets().len(), 2);
        assert_eq!(f.connector.targets()[1].token, "jwt2");
        assert_eq!(f.connector.targets()[1].namespace, "/ws");
        assert!(!f.transport.disconnect(first));
        assert!(f.transport.disconnect(second));
        assert!(!f.transport.has_channel());
    }

    #[test]
    fn test_inbound_location_update_reaches_listeners() {
        let f = fixture();
        let received = Rc::new(RefCell::new(Vec::new()));
        {
            let received = received.clone();
            f.transport.on_presence_update(move |entry| received.borrow_mut().push(entry));
        }
        f.transport.connect("http://backend", "jwt").unwrap();

        f.connector.inject(ChannelEvent::Message {
            name: "location_update".to_string(),
            data: json!({"userId": 4, "lat": 1.0, "lng": 2.0, "timestamp": 55}),
        });
        f.connector.inject(ChannelEvent::Message {
            name: "location_update".to_string(),
            data: json!({"lat": 1.0}),
        });

        let received = received.borrow();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].user_id, "4");
        assert_eq!(received[0].timestamp, 55);
    }

    #[test]
    fn test_lifecycle_events_update_status_only() {
        let f = fixture();
        let statuses = Rc::new(RefCell::new(Vec::new()));
        {
            let statuses = statuses.clone();
            f.transport.on_status_change(move |s| statuses.borrow_mut().push(s));
        }
        f.transport.connect("http://backend", "jwt").unwrap();
        f.connector.inject(ChannelEvent::Connected);
        f.connector.inject(ChannelEvent::Disconnected { reason: "ping timeout".to_string() });

        assert_eq!(
            *statuses.borrow(),
            vec![ChannelStatus::Connecting, ChannelStatus::Connected, ChannelStatus::Disconnected]
        );
        assert!(f.transport.has_channel());
    }

    #[test]
    fn test_events_from_replaced_channel_are_ignored() {
        let f = fixture();
        let received = Rc::new(Cell::new(0));
        {
            let received = received.clone();
            f.transport.on_presence_update(move |_| received.set(received.get() + 1));
        }
        f.transport.connect("http://backend", "jwt").unwrap();
        let stale_handler = f.connector.last_handler().unwrap();
        f.transport.connect("http://backend", "jwt").unwrap();

        stale_handler(ChannelEvent::Message {
            name: "location_update".to_string(),
            data: json!({"userId": "u1", "lat": 1.0, "lng": 2.0, "timestamp": 1}),
        });
        assert_eq!(received.get(), 0);
    }

    #[test]
    fn test_connector_failure_is_channel_connect_error() {
        let f = fixture();
        f.connector.fail_next("bad url");

        let result = f.transport.connect("http://backend", "jwt");
        assert!(matches!(result, Err(TrackerError::ChannelConnect(_))));
        assert!(!f.transport.has_channel());
        assert_eq!(f.transport.channel_status(), ChannelStatus::Disconnected);
    }
}
