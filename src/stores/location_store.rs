// ============================================================================
// LOCATION STORE - sesión de tracking (Idle → Starting → Active → Idle)
// ============================================================================
// Contexto explícito: se construye al arrancar la app con las capacidades
// de la plataforma y se resetea con `disconnect()` en el logout.
// ============================================================================

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use futures::future::{FutureExt, LocalBoxFuture, Shared};
use futures::task::LocalSpawn;

use crate::config::{AppConfig, TrackingSettings};
use crate::error::{GeolocationError, TrackerError};
use crate::models::{
    ChannelStatus, DeliveryDiagnostics, PositionSample, RemotePresenceEntry, TrackingStatus,
};
use crate::services::api_client::{HttpClient, LocationApi};
use crate::services::config_resolver::ConfigResolver;
use crate::services::geolocation::GeolocationProvider;
use crate::services::position_sampler::{PositionSampler, SamplerHandle};
use crate::services::socket_channel::SocketConnector;
use crate::services::timer::IntervalScheduler;
use crate::services::transport::{ChannelHandle, DualChannelTransport};
use crate::state::{LocationState, Observable, SubscriptionId};
use crate::utils::storage::normalize_token;
use crate::utils::{now_millis, TokenStore};

/// Capacidades de la plataforma que necesita el store
#[derive(Clone)]
pub struct PlatformServices {
    pub http: Rc<dyn HttpClient>,
    pub geolocation: Rc<dyn GeolocationProvider>,
    pub timers: Rc<dyn IntervalScheduler>,
    pub connector: Rc<dyn SocketConnector>,
    pub tokens: Rc<dyn TokenStore>,
    pub spawner: Rc<dyn LocalSpawn>,
}

type PendingStart = Shared<LocalBoxFuture<'static, Result<(), TrackerError>>>;

#[derive(Default)]
struct TrackingSession {
    sampler: Option<SamplerHandle>,
    /// Se incrementa en cada start/stop; un start pendiente con un id
    /// viejo se abandona al reanudar
    attempt: u64,
    /// Arranque en curso; quien llame durante `Starting` espera este mismo resultado
    pending: Option<PendingStart>,
}

struct StoreInner {
    settings: TrackingSettings,
    api: LocationApi,
    resolver: ConfigResolver,
    transport: DualChannelTransport,
    sampler: PositionSampler,
    tokens: Rc<dyn TokenStore>,
    session: RefCell<TrackingSession>,
    state: Observable<LocationState>,
}

impl StoreInner {
    fn handle_sample(&self, sample: PositionSample) {
        if self.settings.reject_stale_samples {
            let stale = self.state.with(|s| {
                s.current_position
                    .map(|current| sample.timestamp < current.timestamp)
                    .unwrap_or(false)
            });
            if stale {
                log::debug!("📍 [GEO] Muestra antigua descartada (ts {})", sample.timestamp);
                return;
            }
        }

        self.state.update(|s| s.current_position = Some(sample));
        let route = self.transport.send(&sample);
        log::debug!("🛰️ [TRACKING] Muestra {} enviada por {:?}", sample.timestamp, route);
    }

    fn handle_geolocation_error(&self, error: GeolocationError) {
        self.state.update(|s| s.last_error = Some(error.to_string()));
    }

    /// Expira primero y luego inserta; devuelve `false` si la entrada ya venció
    fn apply_presence(&self, entry: RemotePresenceEntry) -> bool {
        let cutoff = self
            .settings
            .presence_ttl_ms
            .map(|ttl| now_millis().saturating_sub(ttl));

        self.state.update(|s| {
            if let Some(cutoff) = cutoff {
                let pruned = s.presence.prune_older_than(cutoff);
                if pruned > 0 {
                    log::debug!("🛰️ [TRACKING] {} entradas de presencia expiradas", pruned);
                }
                if entry.timestamp < cutoff {
                    log::debug!("🛰️ [TRACKING] Presencia de {} ya expirada, descartada", entry.user_id);
                    return false;
                }
            }
            s.presence.update(entry);
            true
        })
    }

    fn next_attempt(&self) -> u64 {
        let mut session = self.session.borrow_mut();
        session.attempt += 1;
        session.attempt
    }

    fn is_current_attempt(&self, attempt: u64) -> bool {
        self.session.borrow().attempt == attempt
    }

    fn finish_attempt(&self, attempt: u64) {
        let mut session = self.session.borrow_mut();
        if session.attempt == attempt {
            session.pending = None;
        }
    }
}

/// Store de tracking de ubicación compartido por la UI
#[derive(Clone)]
pub struct LocationStore {
    inner: Rc<StoreInner>,
}

impl LocationStore {
    pub fn new(config: &AppConfig, platform: PlatformServices) -> Self {
        let api = LocationApi::new(platform.http);
        let resolver = ConfigResolver::new(
            api.clone(),
            &config.config_url,
            &config.fallback_backend_url,
        );
        let transport = DualChannelTransport::new(
            platform.connector,
            api.clone(),
            platform.tokens.clone(),
            platform.spawner,
            &config.fallback_backend_url,
        );
        let sampler = PositionSampler::new(platform.geolocation, platform.timers, &config.tracking);

        let inner = Rc::new(StoreInner {
            settings: config.tracking.clone(),
            api,
            resolver,
            transport,
            sampler,
            tokens: platform.tokens,
            session: RefCell::new(TrackingSession::default()),
            state: Observable::new(LocationState::default()),
        });

        let weak = Rc::downgrade(&inner);
        inner.transport.on_presence_update(move |entry| {
            if let Some(inner) = weak.upgrade() {
                inner.apply_presence(entry);
            }
        });

        let weak = Rc::downgrade(&inner);
        inner.transport.on_status_change(move |status| {
            if let Some(inner) = weak.upgrade() {
                inner.state.update(|s| s.channel_status = status);
            }
        });

        Self { inner }
    }

    // ========================================================================
    // Ciclo de vida
    // ========================================================================

    /// Arranca el tracking; no hace nada si ya está activo
    ///
    /// Si falla, el estado vuelve a `Idle` con `last_error` y no queda
    /// ningún recurso abierto por este intento. Las llamadas que llegan
    /// durante `Starting` reciben el resultado del arranque en curso.
    pub async fn start_tracking(&self) -> Result<(), TrackerError> {
        let status = self.inner.state.with(|s| s.status);
        let joined = match status {
            TrackingStatus::Active => {
                log::debug!("🛰️ [TRACKING] startTracking ignorado: ya activo");
                return Ok(());
            }
            TrackingStatus::Starting => self.inner.session.borrow().pending.clone(),
            TrackingStatus::Idle => None,
        };

        let pending = match joined {
            Some(pending) => {
                log::debug!("🛰️ [TRACKING] Esperando el arranque en curso");
                pending
            }
            None => self.begin_start(),
        };
        pending.await
    }

    fn begin_start(&self) -> PendingStart {
        let attempt = self.inner.next_attempt();
        let pending = self.clone().run_start(attempt).boxed_local().shared();
        self.inner.session.borrow_mut().pending = Some(pending.clone());

        self.inner.state.update(|s| {
            s.status = TrackingStatus::Starting;
            s.last_error = None;
        });
        log::info!("🛰️ [TRACKING] Iniciando tracking...");
        pending
    }

    async fn run_start(self, attempt: u64) -> Result<(), TrackerError> {
        let inner = &self.inner;
        let backend_url = inner.resolver.backend_url().await;

        if !inner.is_current_attempt(attempt) {
            log::info!("🛰️ [TRACKING] Inicio cancelado antes de completarse");
            return Err(TrackerError::StartCancelled);
        }

        let result = self.activate(&backend_url);
        inner.finish_attempt(attempt);

        match &result {
            Ok(()) => {
                inner.state.update(|s| s.status = TrackingStatus::Active);
                log::info!("✅ [TRACKING] Tracking activo");
            }
            Err(e) => {
                log::error!("❌ [TRACKING] Error iniciando tracking: {}", e);
                inner.state.update(|s| {
                    s.status = TrackingStatus::Idle;
                    s.last_error = Some(e.to_string());
                });
            }
        }
        result
    }

    fn activate(&self, backend_url: &str) -> Result<(), TrackerError> {
        let inner = &self.inner;
        if !inner.sampler.is_supported() {
            return Err(TrackerError::GeolocationUnsupported);
        }

        inner.transport.set_backend_url(backend_url);

        let mut opened: Option<ChannelHandle> = None;
        if inner.transport.channel_status() == ChannelStatus::Disconnected {
            match inner.tokens.token() {
                Some(token) => opened = Some(inner.transport.connect(backend_url, &token)?),
                None => log::warn!("⚠️ [TRACKING] Sin token de sesión: solo respaldo REST"),
            }
        }

        let on_sample: Weak<StoreInner> = Rc::downgrade(inner);
        let on_error: Weak<StoreInner> = Rc::downgrade(inner);
        let started = inner.sampler.start(
            move |sample| {
                if let Some(inner) = on_sample.upgrade() {
                    inner.handle_sample(sample);
                }
            },
            move |error| {
                if let Some(inner) = on_error.upgrade() {
                    inner.handle_geolocation_error(error);
                }
            },
        );

        match started {
            Ok(handle) => {
                inner.session.borrow_mut().sampler = Some(handle);
                Ok(())
            }
            Err(e) => {
                if let Some(channel) = opened {
                    inner.transport.disconnect(channel);
                }
                Err(e)
            }
        }
    }

    /// Detiene el muestreo; el canal sigue abierto
    pub fn stop_tracking(&self) {
        let inner = &self.inner;
        let handle = {
            let mut session = inner.session.borrow_mut();
            session.attempt += 1;
            session.pending = None;
            session.sampler.take()
        };

        if let Some(handle) = handle {
            inner.sampler.stop(handle);
        }

        if inner.state.with(|s| s.status != TrackingStatus::Idle) {
            inner.state.update(|s| s.status = TrackingStatus::Idle);
            log::info!("🛑 [TRACKING] Tracking detenido");
        }
    }

    /// Reset completo de la sesión autenticada (logout)
    pub fn disconnect(&self) {
        self.stop_tracking();
        self.inner.transport.disconnect_current();
        self.inner.state.update(|s| s.reset());
        log::info!("🔌 [TRACKING] Sesión de tracking reseteada");
    }

    /// Abre el canal persistente con un token explícito
    pub async fn initialize_socket(&self, token: &str) -> Result<ChannelHandle, TrackerError> {
        let token = normalize_token(Some(token.to_string()))
            .ok_or_else(|| TrackerError::ChannelConnect("Session token is empty".to_string()))?;
        let backend_url = self.inner.resolver.backend_url().await;
        self.inner.transport.connect(&backend_url, &token)
    }

    // ========================================================================
    // Presencia remota
    // ========================================================================

    pub fn set_watched_user(&self, user_id: &str) {
        self.inner.state.update(|s| s.presence.set_watched_user(user_id));
    }

    pub fn clear_watched_user(&self) {
        self.inner.state.update(|s| s.presence.clear_watched_user());
    }

    pub fn watched_location(&self) -> Option<RemotePresenceEntry> {
        self.inner.state.with(|s| s.watched_location().cloned())
    }

    pub fn presence_entry(&self, user_id: &str) -> Option<RemotePresenceEntry> {
        self.inner.state.with(|s| s.presence.get(user_id).cloned())
    }

    /// Consulta la última ubicación registrada del usuario vigilado
    pub async fn refresh_watched_user(&self) -> Result<Option<RemotePresenceEntry>, TrackerError> {
        let inner = &self.inner;
        let Some(user_id) = inner
            .state
            .with(|s| s.presence.watched_user_id().map(str::to_string))
        else {
            return Ok(None);
        };

        let backend_url = inner.resolver.backend_url().await;
        let token = inner.tokens.token();
        let record = inner
            .api
            .fetch_latest_location(&backend_url, &user_id, token.as_deref())
            .await?;

        let Some(record) = record else {
            return Ok(None);
        };
        let entry = record.into_entry(now_millis())?;
        if inner.apply_presence(entry.clone()) {
            Ok(Some(entry))
        } else {
            Ok(None)
        }
    }

    // ========================================================================
    // Lectura y suscripción
    // ========================================================================

    pub fn snapshot(&self) -> LocationState {
        self.inner.state.snapshot()
    }

    pub fn status(&self) -> TrackingStatus {
        self.inner.state.with(|s| s.status)
    }

    pub fn channel_status(&self) -> ChannelStatus {
        self.inner.state.with(|s| s.channel_status)
    }

    pub fn diagnostics(&self) -> DeliveryDiagnostics {
        self.inner.transport.diagnostics()
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&LocationState) + 'static,
    {
        self.inner.state.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.state.unsubscribe(id)
    }
}
