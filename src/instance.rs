//! A mounted card: configuration, document, scheduler and timers owned
//! together for the card's lifetime.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::debug;

use crate::card::{Card, RenderContext};
use crate::dom::Document;
use crate::error::ConfigError;
use crate::hass::{CardEvent, HassState};
use crate::history::{self, HistoryQuery, HistoryRequest, HistorySample, HistoryTicket};
use crate::scheduler::{FrameId, FrameOutcome, FrameQueue, FrameRequester, Update, UpdateScheduler};
use crate::theme::CssVarCache;
use crate::timers::{Debouncer, RefreshTimer, VisibilityChange, VisibilityGate};

pub struct CardInstance<C: Card, F: FrameRequester = FrameQueue> {
    card: C,
    doc: Document,
    frames: F,
    scheduler: UpdateScheduler<Update<C::Snapshot>>,
    debouncer: Option<Debouncer>,
    visibility: VisibilityGate,
    refresh: Option<RefreshTimer>,
    theme: Arc<CssVarCache>,
    hass: Option<HassState>,
    history_dirty: bool,
    generation: u64,
    patches: u64,
}

impl<C: Card> CardInstance<C, FrameQueue> {
    pub fn from_config(raw: &Value, theme: Arc<CssVarCache>) -> Result<Self, ConfigError> {
        Ok(Self::new(C::from_config(raw)?, FrameQueue::new(), theme))
    }

    /// Runs every frame requested so far. Returns how many fired.
    pub fn run_due_frames(&mut self, now: Instant) -> usize {
        let ids = self.frames.take();
        let count = ids.len();
        for id in ids {
            self.run_frame(id, now);
        }
        count
    }

    pub fn frames(&self) -> &FrameQueue {
        &self.frames
    }
}

impl<C: Card, F: FrameRequester> CardInstance<C, F> {
    pub fn new(card: C, frames: F, theme: Arc<CssVarCache>) -> Self {
        let scheduling = card.scheduling();
        let mut instance = Self {
            card,
            doc: Document::new(),
            frames,
            scheduler: UpdateScheduler::new(),
            debouncer: scheduling.debounce.map(Debouncer::new),
            visibility: VisibilityGate::new(scheduling.power_save),
            refresh: scheduling.history_refresh.map(RefreshTimer::new),
            theme,
            hass: None,
            history_dirty: false,
            generation: 0,
            patches: 0,
        };
        instance.render();
        instance
    }

    fn render(&mut self) {
        let ctx = RenderContext {
            theme: &self.theme,
            hass: self.hass.as_ref(),
        };
        self.card.render(&ctx, &mut self.doc);
        self.scheduler.invalidate();
    }

    /// Takes a new state snapshot from the host. Returns the history fetches
    /// that are now due.
    pub fn set_hass(&mut self, hass: &HassState, now: Instant) -> Vec<HistoryRequest> {
        if self.scheduler.is_torn_down() {
            return Vec::new();
        }
        self.hass = Some(hass.clone());

        let Some(update) = self.card.observe(hass) else {
            debug!("{}: no usable reading, keeping last state", C::KIND);
            return Vec::new();
        };
        let requests = self.due_history(&update, now);

        if !self.scheduler.observe(update) {
            return requests;
        }
        if !self.visibility.is_visible() {
            return requests;
        }
        match &mut self.debouncer {
            Some(debouncer) => debouncer.arm(now),
            None => self.scheduler.stage_latest(&mut self.frames),
        }
        requests
    }

    fn due_history(&mut self, update: &Update<C::Snapshot>, now: Instant) -> Vec<HistoryRequest> {
        if matches!(update, Update::Unavailable(_)) {
            return Vec::new();
        }
        let Some(refresh) = &mut self.refresh else {
            return Vec::new();
        };
        if !refresh.due(now) {
            return Vec::new();
        }
        self.card
            .history_entities()
            .into_iter()
            .map(|entity_id| HistoryRequest {
                query: HistoryQuery::last_day(&entity_id),
                ticket: HistoryTicket {
                    generation: self.generation,
                    entity_id,
                },
            })
            .collect()
    }

    /// Fires expired debounce deadlines. Returns the next deadline, if any.
    pub fn poll_timers(&mut self, now: Instant) -> Option<Instant> {
        let debouncer = self.debouncer.as_mut()?;
        if debouncer.expired(now) {
            self.scheduler.stage_latest(&mut self.frames);
        }
        debouncer.deadline()
    }

    /// The host's frame callback for `id`.
    pub fn run_frame(&mut self, id: FrameId, now: Instant) {
        match self.scheduler.fire(id) {
            FrameOutcome::Stale => return,
            FrameOutcome::Idle => {}
            FrameOutcome::Patch(update) => {
                self.card.patch(&mut self.doc, &update, now);
                self.patches += 1;
            }
        }
        if self.history_dirty {
            self.history_dirty = false;
            self.card.patch_history(&mut self.doc);
        }
        if self.card.animate(&mut self.doc, now) && self.visibility.is_visible() {
            self.scheduler.request(&mut self.frames);
        }
    }

    pub fn set_visible(&mut self, visible: bool) {
        if self.scheduler.is_torn_down() {
            return;
        }
        match self.visibility.set(visible) {
            VisibilityChange::Shown => {
                debug!("{}: visible again, applying latest state", C::KIND);
                self.scheduler.stage_latest(&mut self.frames);
                if self.history_dirty {
                    self.scheduler.request(&mut self.frames);
                }
            }
            VisibilityChange::Hidden => {
                self.scheduler.suspend(&mut self.frames);
                if let Some(debouncer) = &mut self.debouncer {
                    debouncer.cancel();
                }
                self.card.cancel_animations();
            }
            VisibilityChange::Unchanged => {}
        }
    }

    /// Completes a fetch issued by [`set_hass`](Self::set_hass). Responses for
    /// a torn down card or a replaced configuration are dropped.
    pub fn deliver_history(
        &mut self,
        ticket: &HistoryTicket,
        result: anyhow::Result<Vec<HistorySample>>,
    ) {
        if self.scheduler.is_torn_down() || ticket.generation != self.generation {
            debug!("{}: dropping stale history for {}", C::KIND, ticket.entity_id);
            return;
        }
        let samples = match result {
            Ok(samples) => samples,
            Err(e) => {
                debug!("{}: history fetch for {} failed: {:?}", C::KIND, ticket.entity_id, e);
                return;
            }
        };
        let values = history::downsample(&samples, self.card.history_capacity());
        if values.len() < 2 {
            debug!("{}: not enough history for {}", C::KIND, ticket.entity_id);
            return;
        }
        self.card.set_history(&ticket.entity_id, values);
        self.history_dirty = true;
        if self.visibility.is_visible() {
            self.scheduler.request(&mut self.frames);
        }
    }

    /// Replaces the configuration and rebuilds. In-flight history fetches
    /// from the previous configuration are invalidated.
    pub fn reconfigure(&mut self, raw: &Value, now: Instant) -> Result<Vec<HistoryRequest>, ConfigError> {
        if self.scheduler.is_torn_down() {
            return Ok(Vec::new());
        }
        let card = C::from_config(raw)?;
        let scheduling = card.scheduling();

        self.card.cancel_animations();
        self.scheduler.suspend(&mut self.frames);
        self.card = card;
        self.generation += 1;
        self.history_dirty = false;
        self.debouncer = scheduling.debounce.map(Debouncer::new);
        self.visibility = VisibilityGate::new(scheduling.power_save);
        self.refresh = scheduling.history_refresh.map(RefreshTimer::new);
        self.render();

        Ok(match self.hass.take() {
            Some(hass) => self.set_hass(&hass, now),
            None => Vec::new(),
        })
    }

    pub fn tap(&self, target: &str) -> Option<CardEvent> {
        if self.scheduler.is_torn_down() {
            return None;
        }
        self.card.tap(target, self.hass.as_ref())
    }

    /// Cancels the pending frame and every timer. Later calls are no-ops.
    pub fn teardown(&mut self) {
        self.scheduler.teardown(&mut self.frames);
        if let Some(debouncer) = &mut self.debouncer {
            debouncer.cancel();
        }
        self.card.cancel_animations();
        self.hass = None;
        self.history_dirty = false;
    }

    pub fn is_torn_down(&self) -> bool {
        self.scheduler.is_torn_down()
    }

    pub fn card(&self) -> &C {
        &self.card
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn markup(&self) -> String {
        self.doc.to_markup()
    }

    /// Patches applied so far.
    pub fn patches(&self) -> u64 {
        self.patches
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Object-safe view of a [`CardInstance`] driven by a [`FrameQueue`].
pub trait DynCard: Send {
    fn kind(&self) -> &'static str;
    fn set_hass(&mut self, hass: &HassState, now: Instant) -> Vec<HistoryRequest>;
    fn set_visible(&mut self, visible: bool);
    fn poll_timers(&mut self, now: Instant) -> Option<Instant>;
    fn run_due_frames(&mut self, now: Instant) -> usize;
    fn deliver_history(&mut self, ticket: &HistoryTicket, result: anyhow::Result<Vec<HistorySample>>);
    fn reconfigure(&mut self, raw: &Value, now: Instant) -> Result<Vec<HistoryRequest>, ConfigError>;
    fn tap(&self, target: &str) -> Option<CardEvent>;
    fn document(&self) -> &Document;
    fn markup(&self) -> String;
    fn patches(&self) -> u64;
    fn card_size(&self) -> u32;
    fn teardown(&mut self);
    fn is_torn_down(&self) -> bool;
}

impl<C: Card> DynCard for CardInstance<C, FrameQueue> {
    fn kind(&self) -> &'static str {
        C::KIND
    }

    fn set_hass(&mut self, hass: &HassState, now: Instant) -> Vec<HistoryRequest> {
        CardInstance::set_hass(self, hass, now)
    }

    fn set_visible(&mut self, visible: bool) {
        CardInstance::set_visible(self, visible)
    }

    fn poll_timers(&mut self, now: Instant) -> Option<Instant> {
        CardInstance::poll_timers(self, now)
    }

    fn run_due_frames(&mut self, now: Instant) -> usize {
        CardInstance::run_due_frames(self, now)
    }

    fn deliver_history(&mut self, ticket: &HistoryTicket, result: anyhow::Result<Vec<HistorySample>>) {
        CardInstance::deliver_history(self, ticket, result)
    }

    fn reconfigure(&mut self, raw: &Value, now: Instant) -> Result<Vec<HistoryRequest>, ConfigError> {
        CardInstance::reconfigure(self, raw, now)
    }

    fn tap(&self, target: &str) -> Option<CardEvent> {
        CardInstance::tap(self, target)
    }

    fn document(&self) -> &Document {
        CardInstance::document(self)
    }

    fn markup(&self) -> String {
        CardInstance::markup(self)
    }

    fn patches(&self) -> u64 {
        CardInstance::patches(self)
    }

    fn card_size(&self) -> u32 {
        self.card.card_size()
    }

    fn teardown(&mut self) {
        CardInstance::teardown(self)
    }

    fn is_torn_down(&self) -> bool {
        CardInstance::is_torn_down(self)
    }
}
