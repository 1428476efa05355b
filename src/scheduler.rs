//! Single-slot update scheduling.
//!
//! Notifications arrive at whatever rate the host delivers them; patches run
//! at most once per frame. The scheduler keeps the last meaningful snapshot
//! for change detection and a pending slot that is overwritten until the
//! requested frame fires. Only the newest payload is ever patched.

use std::fmt::Debug;

use tracing::debug;

use crate::hass::Lifecycle;

/// Values a card diffs between notifications.
pub trait Snapshot: Clone + Debug + Send + 'static {
    /// Whether `self` is different enough from `previous` to be worth a patch.
    fn differs_from(&self, previous: &Self) -> bool;
}

/// What a card observed for its primary entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Update<S> {
    Value(S),
    Unavailable(Lifecycle),
}

impl<S: Snapshot> Snapshot for Update<S> {
    fn differs_from(&self, previous: &Self) -> bool {
        match (self, previous) {
            (Update::Value(a), Update::Value(b)) => a.differs_from(b),
            (Update::Unavailable(a), Update::Unavailable(b)) => a != b,
            _ => true,
        }
    }
}

/// `true` when two readings differ by more than `delta`, or when only one
/// of them is present.
pub fn moved(current: Option<f64>, previous: Option<f64>, delta: f64) -> bool {
    match (current, previous) {
        (Some(a), Some(b)) => (a - b).abs() > delta,
        (None, None) => false,
        _ => true,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u64);

/// The host's "run before next repaint" primitive.
pub trait FrameRequester {
    fn request_frame(&mut self) -> FrameId;
    fn cancel_frame(&mut self, id: FrameId);
}

/// In-process frame source: requests are queued until [`FrameQueue::take`]
/// drains them.
#[derive(Debug, Default)]
pub struct FrameQueue {
    next: u64,
    requested: Vec<FrameId>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&mut self) -> Vec<FrameId> {
        std::mem::take(&mut self.requested)
    }

    pub fn pending(&self) -> usize {
        self.requested.len()
    }
}

impl FrameRequester for FrameQueue {
    fn request_frame(&mut self) -> FrameId {
        self.next += 1;
        let id = FrameId(self.next);
        self.requested.push(id);
        id
    }

    fn cancel_frame(&mut self, id: FrameId) {
        self.requested.retain(|r| *r != id);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Pending(FrameId),
}

/// Result of a fired frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome<P> {
    /// Not the frame this scheduler is waiting on, or torn down.
    Stale,
    /// A frame with nothing staged, requested for an animation step or a
    /// history repaint.
    Idle,
    Patch(P),
}

#[derive(Debug)]
pub struct UpdateScheduler<P> {
    phase: Phase,
    pending: Option<P>,
    last: Option<P>,
    needs_full: bool,
    torn_down: bool,
}

impl<P: Snapshot> Default for UpdateScheduler<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Snapshot> UpdateScheduler<P> {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            pending: None,
            last: None,
            needs_full: true,
            torn_down: false,
        }
    }

    /// The structure was rebuilt: the next observation passes the diff.
    pub fn invalidate(&mut self) {
        self.needs_full = true;
    }

    /// Records `snapshot` if it is meaningful. Returns `false` when the
    /// notification should be discarded.
    pub fn observe(&mut self, snapshot: P) -> bool {
        if self.torn_down {
            return false;
        }
        let changed = match &self.last {
            Some(previous) => self.needs_full || snapshot.differs_from(previous),
            None => true,
        };
        if changed {
            self.needs_full = false;
            self.last = Some(snapshot);
        }
        changed
    }

    /// Diffs and stages in one step.
    pub fn notify(&mut self, snapshot: P, frames: &mut impl FrameRequester) -> bool {
        if !self.observe(snapshot) {
            return false;
        }
        self.stage_latest(frames);
        true
    }

    /// Stages `payload` without diffing it.
    pub fn force(&mut self, payload: P, frames: &mut impl FrameRequester) {
        if self.torn_down {
            return;
        }
        self.last = Some(payload.clone());
        self.needs_full = false;
        self.stage(payload, frames);
    }

    /// Stages the last recorded snapshot, if any.
    pub fn stage_latest(&mut self, frames: &mut impl FrameRequester) {
        if let Some(latest) = self.last.clone() {
            self.stage(latest, frames);
        }
    }

    fn stage(&mut self, payload: P, frames: &mut impl FrameRequester) {
        if self.torn_down {
            return;
        }
        self.pending = Some(payload);
        self.request(frames);
    }

    /// Makes sure a frame is in flight.
    pub fn request(&mut self, frames: &mut impl FrameRequester) {
        if self.torn_down {
            return;
        }
        if self.phase == Phase::Idle {
            self.phase = Phase::Pending(frames.request_frame());
        }
    }

    pub fn fire(&mut self, id: FrameId) -> FrameOutcome<P> {
        if self.torn_down || self.phase != Phase::Pending(id) {
            debug!("Ignoring stale frame {:?}", id);
            return FrameOutcome::Stale;
        }
        self.phase = Phase::Idle;
        match self.pending.take() {
            Some(payload) => FrameOutcome::Patch(payload),
            None => FrameOutcome::Idle,
        }
    }

    /// Drops the in-flight frame and the staged payload; the last observed
    /// snapshot is kept.
    pub fn suspend(&mut self, frames: &mut impl FrameRequester) {
        if let Phase::Pending(id) = self.phase {
            frames.cancel_frame(id);
        }
        self.phase = Phase::Idle;
        self.pending = None;
    }

    pub fn teardown(&mut self, frames: &mut impl FrameRequester) {
        self.suspend(frames);
        self.last = None;
        self.torn_down = true;
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.phase, Phase::Pending(_))
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn last(&self) -> Option<&P> {
        self.last.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Temp(f64);

    impl Snapshot for Temp {
        fn differs_from(&self, previous: &Self) -> bool {
            moved(Some(self.0), Some(previous.0), 0.1)
        }
    }

    #[test]
    fn last_notification_in_a_frame_wins() {
        let mut frames = FrameQueue::new();
        let mut scheduler = UpdateScheduler::new();

        assert!(scheduler.notify(Temp(40.0), &mut frames));
        assert!(scheduler.notify(Temp(42.0), &mut frames));

        let ids = frames.take();
        assert_eq!(ids.len(), 1);
        assert_eq!(scheduler.fire(ids[0]), FrameOutcome::Patch(Temp(42.0)));
        assert!(!scheduler.is_pending());
    }

    #[test]
    fn small_moves_are_discarded() {
        let mut frames = FrameQueue::new();
        let mut scheduler = UpdateScheduler::new();
        scheduler.notify(Temp(20.0), &mut frames);
        let id = frames.take()[0];
        scheduler.fire(id);

        assert!(!scheduler.notify(Temp(20.05), &mut frames));
        assert_eq!(frames.pending(), 0);
        assert!(scheduler.notify(Temp(20.2), &mut frames));
    }

    #[test]
    fn drift_accumulates_against_last_recorded_value() {
        let mut frames = FrameQueue::new();
        let mut scheduler = UpdateScheduler::new();
        scheduler.notify(Temp(20.0), &mut frames);
        assert!(!scheduler.notify(Temp(20.06), &mut frames));
        assert!(scheduler.notify(Temp(20.12), &mut frames));
    }

    #[test]
    fn invalidate_lets_the_same_value_through() {
        let mut frames = FrameQueue::new();
        let mut scheduler = UpdateScheduler::new();
        scheduler.notify(Temp(20.0), &mut frames);
        scheduler.invalidate();
        assert!(scheduler.notify(Temp(20.0), &mut frames));
    }

    #[test]
    fn frames_after_teardown_are_stale() {
        let mut frames = FrameQueue::new();
        let mut scheduler = UpdateScheduler::new();
        scheduler.notify(Temp(20.0), &mut frames);
        let id = frames.requested[0];

        scheduler.teardown(&mut frames);
        assert_eq!(frames.pending(), 0);
        assert_eq!(scheduler.fire(id), FrameOutcome::Stale);
        assert!(!scheduler.notify(Temp(30.0), &mut frames));
        scheduler.request(&mut frames);
        assert_eq!(frames.pending(), 0);
    }

    #[test]
    fn lifecycle_changes_always_differ() {
        let value: Update<Temp> = Update::Value(Temp(1.0));
        let gone = Update::Unavailable(Lifecycle::Unavailable);
        assert!(gone.differs_from(&value));
        assert!(!gone.differs_from(&gone.clone()));
        assert!(Update::<Temp>::Unavailable(Lifecycle::Unknown).differs_from(&gone));
    }

    #[test]
    fn request_without_payload_fires_idle() {
        let mut frames = FrameQueue::new();
        let mut scheduler: UpdateScheduler<Temp> = UpdateScheduler::new();
        scheduler.request(&mut frames);
        scheduler.request(&mut frames);
        let ids = frames.take();
        assert_eq!(ids.len(), 1);
        assert_eq!(scheduler.fire(ids[0]), FrameOutcome::Idle);
    }
}
