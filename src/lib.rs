//! Neon dashboard cards for Home Assistant.
//!
//! Each card turns a raw config into a typed one, renders once into a
//! [`dom::Document`] and from then on only patches what a new entity
//! snapshot actually changed. Patches are coalesced into at most one frame
//! per card; hidden cards pause and repaint when they come back.

pub mod animation;
pub mod card;
pub mod cards;
pub mod color;
pub mod config;
pub mod dom;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod hass;
pub mod history;
pub mod instance;
pub mod runtime;
pub mod scheduler;
pub mod theme;
pub mod timers;

pub use card::{Card, RenderContext, Scheduling};
pub use cards::{KINDS, build_card, stub_config};
pub use editor::ConfigEditor;
pub use error::ConfigError;
pub use hass::{ActionConfig, CardEvent, EntityState, HassState};
pub use history::{HistoryQuery, HistorySample, HistorySource};
pub use instance::{CardInstance, DynCard};
pub use runtime::CardRuntime;
pub use theme::CssVarCache;
