/// Cancela un timer al consumirse
pub trait TimerGuard {
    fn cancel(self: Box<Self>);
}

/// Timers periódicos (setInterval en el navegador)
pub trait IntervalScheduler {
    fn every(&self, period_ms: u32, tick: Box<dyn FnMut()>) -> Box<dyn TimerGuard>;
}
