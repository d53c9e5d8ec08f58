// ============================================================================
// POSITION SAMPLER - watch continuo + sondeo de respaldo
// ============================================================================
// Dos productores independientes (watchPosition y un intervalo con
// getCurrentPosition) alimentan el mismo sink. Al parar se cierra el sink,
// así que un callback tardío del navegador ya no llega al consumidor.
// ============================================================================

use std::cell::Cell;
use std::rc::Rc;

use crate::config::TrackingSettings;
use crate::error::{GeolocationError, TrackerError};
use crate::models::PositionSample;
use crate::services::geolocation::{
    GeolocationProvider, PositionCallback, PositionOptions, WatchId,
};
use crate::services::timer::{IntervalScheduler, TimerGuard};

/// Origen de una lectura (solo para logs)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleSource {
    Watch,
    Backup,
}

/// Sink único al que escriben ambos productores
struct SampleSink {
    open: Cell<bool>,
    on_sample: Box<dyn Fn(PositionSample)>,
    on_error: Box<dyn Fn(GeolocationError)>,
}

impl SampleSink {
    fn deliver(&self, source: SampleSource, result: Result<PositionSample, GeolocationError>) {
        if !self.open.get() {
            log::debug!("📍 [GEO] Lectura {:?} descartada: sampler detenido", source);
            return;
        }
        match result {
            Ok(sample) => (self.on_sample)(sample),
            Err(error) => {
                log::warn!("⚠️ [GEO] Error de geolocalización ({:?}): {}", source, error);
                (self.on_error)(error)
            }
        }
    }

    fn callback(self: &Rc<Self>, source: SampleSource) -> PositionCallback {
        let sink = self.clone();
        Rc::new(move |result| sink.deliver(source, result))
    }
}

/// Recursos de un sampler en marcha
pub struct SamplerHandle {
    watch_id: WatchId,
    backup_timer: Box<dyn TimerGuard>,
    sink: Rc<SampleSink>,
}

impl SamplerHandle {
    pub fn watch_id(&self) -> WatchId {
        self.watch_id
    }
}

pub struct PositionSampler {
    geolocation: Rc<dyn GeolocationProvider>,
    timers: Rc<dyn IntervalScheduler>,
    backup_interval_ms: u32,
    acquisition_timeout_ms: u32,
}

impl PositionSampler {
    pub fn new(
        geolocation: Rc<dyn GeolocationProvider>,
        timers: Rc<dyn IntervalScheduler>,
        settings: &TrackingSettings,
    ) -> Self {
        Self {
            geolocation,
            timers,
            backup_interval_ms: settings.backup_poll_interval_ms,
            acquisition_timeout_ms: settings.geolocation_timeout_ms,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.geolocation.is_supported()
    }

    /// Arranca el watch continuo y el sondeo de respaldo
    ///
    /// Los errores de lectura se entregan a `on_error` y no detienen nada;
    /// solo falla el arranque si no hay geolocalización o el watch no se crea.
    pub fn start<S, E>(&self, on_sample: S, on_error: E) -> Result<SamplerHandle, TrackerError>
    where
        S: Fn(PositionSample) + 'static,
        E: Fn(GeolocationError) + 'static,
    {
        if !self.geolocation.is_supported() {
            return Err(TrackerError::GeolocationUnsupported);
        }

        let sink = Rc::new(SampleSink {
            open: Cell::new(true),
            on_sample: Box::new(on_sample),
            on_error: Box::new(on_error),
        });

        let watch_id = self.geolocation.watch_position(
            PositionOptions::continuous(self.acquisition_timeout_ms),
            sink.callback(SampleSource::Watch),
        )?;

        let backup_timer = {
            let geolocation = self.geolocation.clone();
            let callback = sink.callback(SampleSource::Backup);
            self.timers.every(
                self.backup_interval_ms,
                Box::new(move || {
                    geolocation.get_current_position(PositionOptions::one_shot(), callback.clone());
                }),
            )
        };

        log::info!(
            "📍 [GEO] Sampler iniciado (watch {}, respaldo cada {} ms)",
            watch_id,
            self.backup_interval_ms
        );

        Ok(SamplerHandle {
            watch_id,
            backup_timer,
            sink,
        })
    }

    /// Libera el watch y el intervalo de forma síncrona
    pub fn stop(&self, handle: SamplerHandle) {
        handle.sink.open.set(false);
        self.geolocation.clear_watch(handle.watch_id);
        handle.backup_timer.cancel();
        log::info!("📍 [GEO] Sampler detenido (watch {})", handle.watch_id);
    }
}
