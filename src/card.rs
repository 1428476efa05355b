use std::time::{Duration, Instant};

use serde_json::Value;

use crate::dom::Document;
use crate::error::ConfigError;
use crate::hass::{CardEvent, HassState};
use crate::scheduler::{Snapshot, Update};
use crate::theme::CssVarCache;

/// Optional scheduling modes a card opts into from its configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Scheduling {
    /// Trailing debounce before staging a patch.
    pub debounce: Option<Duration>,
    /// Suspend patches while the card is off screen.
    pub power_save: bool,
    /// Minimum spacing between history fetches. `None` disables history.
    pub history_refresh: Option<Duration>,
}

/// What a renderer may read besides its own configuration.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub theme: &'a CssVarCache,
    pub hass: Option<&'a HassState>,
}

/// One kind of dashboard card.
///
/// `render` builds the whole structure and caches the handles `patch` needs.
/// `patch` only mutates through those handles and must skip any that are
/// absent.
pub trait Card: Send + Sized + 'static {
    type Snapshot: Snapshot;

    /// Registry type name, without the `custom:` prefix.
    const KIND: &'static str;

    fn from_config(raw: &Value) -> Result<Self, ConfigError>;

    /// Minimal configuration for a freshly added card.
    fn stub_config(hass: Option<&HassState>) -> Value;

    fn scheduling(&self) -> Scheduling {
        Scheduling::default()
    }

    /// Entities whose history backs a sparkline.
    fn history_entities(&self) -> Vec<String> {
        Vec::new()
    }

    /// Points kept after downsampling.
    fn history_capacity(&self) -> usize {
        25
    }

    /// Reads the bound entities. `None` skips the notification.
    fn observe(&self, hass: &HassState) -> Option<Update<Self::Snapshot>>;

    fn render(&mut self, ctx: &RenderContext<'_>, doc: &mut Document);

    fn patch(&mut self, doc: &mut Document, update: &Update<Self::Snapshot>, now: Instant);

    /// Advances running transitions. Returns `true` while another frame is
    /// needed.
    fn animate(&mut self, _doc: &mut Document, _now: Instant) -> bool {
        false
    }

    fn cancel_animations(&mut self) {}

    fn set_history(&mut self, _entity_id: &str, _values: Vec<f64>) {}

    fn patch_history(&mut self, _doc: &mut Document) {}

    /// Maps a tap on the element with id `target` to a host event.
    fn tap(&self, target: &str, hass: Option<&HassState>) -> Option<CardEvent>;

    /// Height hint in dashboard rows.
    fn card_size(&self) -> u32;
}
