//! Deadline bookkeeping for the optional scheduling modes. All of it is
//! driven by explicit instants so the caller owns the clock.

use std::time::{Duration, Instant};

/// Trailing-edge debounce: every notification pushes the deadline back.
#[derive(Debug, Clone)]
pub struct Debouncer {
    interval: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.interval);
    }

    /// Consumes the deadline once it has passed.
    pub fn expired(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

/// Tracks whether the card is on screen. Always visible when disabled.
#[derive(Debug, Clone)]
pub struct VisibilityGate {
    enabled: bool,
    visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityChange {
    Shown,
    Hidden,
    Unchanged,
}

impl VisibilityGate {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            visible: true,
        }
    }

    pub fn set(&mut self, visible: bool) -> VisibilityChange {
        if !self.enabled || visible == self.visible {
            return VisibilityChange::Unchanged;
        }
        self.visible = visible;
        if visible {
            VisibilityChange::Shown
        } else {
            VisibilityChange::Hidden
        }
    }

    pub fn is_visible(&self) -> bool {
        !self.enabled || self.visible
    }
}

/// At most one trigger per interval; the first check is always due.
#[derive(Debug, Clone)]
pub struct RefreshTimer {
    interval: Duration,
    last: Option<Instant>,
}

impl RefreshTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Returns `true` and restarts the interval when a refresh is due.
    pub fn due(&mut self, now: Instant) -> bool {
        let due = self
            .last
            .is_none_or(|last| now.saturating_duration_since(last) >= self.interval);
        if due {
            self.last = Some(now);
        }
        due
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debounce_restarts_on_every_arm() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(500));
        debouncer.arm(t0);
        debouncer.arm(t0 + Duration::from_millis(400));
        assert!(!debouncer.expired(t0 + Duration::from_millis(600)));
        assert!(debouncer.expired(t0 + Duration::from_millis(900)));
        assert!(!debouncer.expired(t0 + Duration::from_millis(950)));
    }

    #[test]
    fn disabled_gate_ignores_signals() {
        let mut gate = VisibilityGate::new(false);
        assert_eq!(gate.set(false), VisibilityChange::Unchanged);
        assert!(gate.is_visible());

        let mut gate = VisibilityGate::new(true);
        assert_eq!(gate.set(false), VisibilityChange::Hidden);
        assert!(!gate.is_visible());
        assert_eq!(gate.set(true), VisibilityChange::Shown);
    }

    #[test]
    fn refresh_fires_once_per_interval() {
        let t0 = Instant::now();
        let mut timer = RefreshTimer::new(Duration::from_secs(300));
        assert!(timer.due(t0));
        assert!(!timer.due(t0 + Duration::from_secs(299)));
        assert!(timer.due(t0 + Duration::from_secs(300)));
        timer.reset();
        assert!(timer.due(t0 + Duration::from_secs(301)));
    }
}
