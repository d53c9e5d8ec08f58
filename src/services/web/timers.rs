use gloo_timers::callback::Interval;

use crate::services::timer::{IntervalScheduler, TimerGuard};

struct IntervalGuard(Interval);

impl TimerGuard for IntervalGuard {
    fn cancel(self: Box<Self>) {
        self.0.cancel();
    }
}

/// setInterval vía gloo-timers
#[derive(Debug, Clone, Copy, Default)]
pub struct GlooIntervalScheduler;

impl IntervalScheduler for GlooIntervalScheduler {
    fn every(&self, period_ms: u32, mut tick: Box<dyn FnMut()>) -> Box<dyn TimerGuard> {
        Box::new(IntervalGuard(Interval::new(period_ms, move || tick())))
    }
}
