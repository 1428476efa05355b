//! The card family and the registry that builds them from raw configs.

pub mod battery;
pub mod dual_gauge;
pub mod dual_thermo;
pub mod header;
pub mod solar;
pub mod thermo;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tracing::debug;

pub use battery::BatteryCard;
pub use dual_gauge::DualGaugeCard;
pub use dual_thermo::DualThermoCard;
pub use header::HeaderCard;
pub use solar::SolarCard;
pub use thermo::ThermoCard;

use crate::card::Card;
use crate::dom::{Document, NodeId};
use crate::error::ConfigError;
use crate::hass::{HassState, Lifecycle};
use crate::instance::{CardInstance, DynCard};
use crate::theme::CssVarCache;

pub const KINDS: [&str; 6] = [
    ThermoCard::KIND,
    DualThermoCard::KIND,
    BatteryCard::KIND,
    SolarCard::KIND,
    HeaderCard::KIND,
    DualGaugeCard::KIND,
];

fn kind_of(raw: &Value) -> Result<&str, ConfigError> {
    let kind = raw
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ConfigError::MissingField("type"))?;
    Ok(kind.strip_prefix("custom:").unwrap_or(kind))
}

fn mount<C: Card>(raw: &Value, theme: Arc<CssVarCache>) -> Result<Box<dyn DynCard>, ConfigError> {
    Ok(Box::new(CardInstance::<C>::from_config(raw, theme)?))
}

/// Builds and renders the card named by the config's `type`.
pub fn build_card(raw: &Value, theme: Arc<CssVarCache>) -> Result<Box<dyn DynCard>, ConfigError> {
    let kind = kind_of(raw)?;
    debug!("Building {} card", kind);
    match kind {
        "neon-thermo-card" => mount::<ThermoCard>(raw, theme),
        "neon-dual-thermo-card" => mount::<DualThermoCard>(raw, theme),
        "neon-battery-card" => mount::<BatteryCard>(raw, theme),
        "neon-solar-card" => mount::<SolarCard>(raw, theme),
        "neon-header-card" => mount::<HeaderCard>(raw, theme),
        "neon-dual-gauge-card" => mount::<DualGaugeCard>(raw, theme),
        other => Err(ConfigError::UnknownCardType(other.to_string())),
    }
}

/// Starter config for a newly added card of `kind`, with its `type` set.
pub fn stub_config(kind: &str, hass: Option<&HassState>) -> Result<Value, ConfigError> {
    let kind = kind.strip_prefix("custom:").unwrap_or(kind);
    let mut stub = match kind {
        "neon-thermo-card" => ThermoCard::stub_config(hass),
        "neon-dual-thermo-card" => DualThermoCard::stub_config(hass),
        "neon-battery-card" => BatteryCard::stub_config(hass),
        "neon-solar-card" => SolarCard::stub_config(hass),
        "neon-header-card" => HeaderCard::stub_config(hass),
        "neon-dual-gauge-card" => DualGaugeCard::stub_config(hass),
        other => return Err(ConfigError::UnknownCardType(other.to_string())),
    };
    if let Some(map) = stub.as_object_mut() {
        map.insert("type".to_string(), Value::String(format!("custom:{kind}")));
    }
    Ok(stub)
}

static NEXT_UID: AtomicU64 = AtomicU64::new(0);

/// Process-unique prefix for SVG gradient and clip ids.
pub(crate) fn uid(prefix: &str) -> String {
    format!("{}{}", prefix, NEXT_UID.fetch_add(1, Ordering::Relaxed) + 1)
}

pub(crate) fn placeholder(lifecycle: Lifecycle) -> &'static str {
    match lifecycle {
        Lifecycle::Unavailable => "—",
        Lifecycle::Unknown => "?",
    }
}

/// Dims `card` and shows the placeholder glyph in `value`, or undoes it.
pub(crate) fn show_lifecycle(
    doc: &mut Document,
    card: NodeId,
    value: Option<NodeId>,
    lifecycle: Option<Lifecycle>,
) {
    doc.set_class(card, "unavailable", lifecycle.is_some());
    doc.set_style(card, "opacity", if lifecycle.is_some() { "0.55" } else { "" });
    if let Some(value) = value {
        match lifecycle {
            Some(lifecycle) => {
                doc.set_text(value, placeholder(lifecycle));
                doc.set_style(value, "opacity", "0.35");
            }
            None => {
                doc.set_style(value, "opacity", "");
            }
        }
    }
}

/// Fixed-point formatting.
pub(crate) fn fixed(value: f64, decimals: usize) -> String {
    format!("{:.*}", decimals, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn registry_accepts_both_type_spellings() {
        let theme = Arc::new(CssVarCache::default());
        let card = build_card(
            &json!({ "type": "custom:neon-thermo-card", "entity": "sensor.t" }),
            theme.clone(),
        )
        .unwrap();
        assert_eq!(card.kind(), "neon-thermo-card");

        let card = build_card(&json!({ "type": "neon-header-card" }), theme).unwrap();
        assert_eq!(card.kind(), "neon-header-card");
    }

    #[test]
    fn unknown_types_are_rejected() {
        let theme = Arc::new(CssVarCache::default());
        let err = build_card(&json!({ "type": "custom:other-card" }), theme.clone()).err();
        assert_eq!(err, Some(ConfigError::UnknownCardType("other-card".into())));
        let err = build_card(&json!({ "entity": "sensor.t" }), theme).err();
        assert_eq!(err, Some(ConfigError::MissingField("type")));
    }

    #[test]
    fn every_stub_builds() {
        let theme = Arc::new(CssVarCache::default());
        for kind in KINDS {
            let stub = stub_config(kind, None).unwrap();
            assert!(build_card(&stub, theme.clone()).is_ok(), "{kind}");
        }
    }

    #[test]
    fn uids_are_unique() {
        assert_ne!(uid("x"), uid("x"));
    }
}
