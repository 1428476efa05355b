use std::time::{Duration, Instant};

pub fn ease_in_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// An eased move between two numbers, sampled once per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub from: f64,
    pub to: f64,
    start: Instant,
    duration: Duration,
}

impl Transition {
    pub fn new(from: f64, to: f64, start: Instant, duration: Duration) -> Self {
        Self {
            from,
            to,
            start,
            duration,
        }
    }

    /// Restarts from wherever the current transition is at `now`.
    pub fn retarget(&self, to: f64, now: Instant, duration: Duration) -> Self {
        Self::new(self.sample(now), to, now, duration)
    }

    pub fn progress(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.start);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    pub fn sample(&self, now: Instant) -> f64 {
        self.from + (self.to - self.from) * ease_in_out_cubic(self.progress(now))
    }

    pub fn finished(&self, now: Instant) -> bool {
        self.progress(now) >= 1.0
    }
}
