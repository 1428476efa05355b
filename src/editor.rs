//! Visual configuration editor model: which fields a card kind exposes and
//! how raw form input turns into a new configuration.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ConfigError;
use crate::hass::{HassState, parse_number};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// Entity picker limited to the given domains.
    Entity { domains: &'static [&'static str] },
    Text,
    Number { min: Option<f64>, max: Option<f64>, step: f64 },
    Toggle,
    Color,
    Select { options: &'static [&'static str] },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldSpec {
    /// Dotted path into the config. `*` matches any list index.
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
}

const fn field(key: &'static str, label: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { key, label, kind }
}

const SENSORS: FieldKind = FieldKind::Entity { domains: &["sensor"] };
const SWITCHES: FieldKind = FieldKind::Entity {
    domains: &["switch", "input_boolean", "binary_sensor"],
};
const INT: FieldKind = FieldKind::Number { min: None, max: None, step: 1.0 };
const DECIMAL: FieldKind = FieldKind::Number { min: None, max: None, step: 0.1 };
const DECIMALS: FieldKind = FieldKind::Number { min: Some(0.0), max: Some(4.0), step: 1.0 };

static THERMO_FIELDS: &[FieldSpec] = &[
    field("entity", "Temperature sensor", SENSORS),
    field("humidity_entity", "Humidity sensor", SENSORS),
    field("secondary_entity", "Secondary sensor", SENSORS),
    field("secondary_label", "Secondary label", FieldKind::Text),
    field("secondary_unit", "Secondary unit", FieldKind::Text),
    field("name", "Name", FieldKind::Text),
    field("temp_min", "Minimum", DECIMAL),
    field("temp_max", "Maximum", DECIMAL),
    field("unit", "Unit", FieldKind::Text),
    field("decimal_places", "Decimals", DECIMALS),
    field("show_history", "24h history", FieldKind::Toggle),
    field("show_plasma", "Plasma effect", FieldKind::Toggle),
    field("animation_speed", "Animation speed", DECIMAL),
    field("color_primary", "Primary colour", FieldKind::Color),
    field("color_hot", "Hot colour", FieldKind::Color),
    field("color_mid", "Mid colour", FieldKind::Color),
    field("color_cold", "Cold colour", FieldKind::Color),
];

static DUAL_THERMO_FIELDS: &[FieldSpec] = &[
    field("entity_left", "Left sensor", SENSORS),
    field("humidity_entity_left", "Left humidity", SENSORS),
    field("name_left", "Left name", FieldKind::Text),
    field("entity_right", "Right sensor", SENSORS),
    field("humidity_entity_right", "Right humidity", SENSORS),
    field("name_right", "Right name", FieldKind::Text),
    field("temp_min", "Minimum", DECIMAL),
    field("temp_max", "Maximum", DECIMAL),
    field("unit", "Unit", FieldKind::Text),
    field("decimal_places", "Decimals", DECIMALS),
    field("show_history", "24h history", FieldKind::Toggle),
    field("show_plasma", "Plasma effect", FieldKind::Toggle),
    field("color_primary", "Primary colour", FieldKind::Color),
    field("color_secondary", "Secondary colour", FieldKind::Color),
    field("color_zone1", "Below 5°", FieldKind::Color),
    field("color_zone2", "Below 15°", FieldKind::Color),
    field("color_zone3", "Below 22°", FieldKind::Color),
    field("color_zone4", "Below 28°", FieldKind::Color),
    field("color_zone5", "Above 28°", FieldKind::Color),
];

static BATTERY_FIELDS: &[FieldSpec] = &[
    field("entity", "Battery level", SENSORS),
    field("charging_entity", "Charging state", FieldKind::Entity { domains: &["sensor", "binary_sensor"] }),
    field("power_entity", "Charge power", SENSORS),
    field("price_entity", "Tariff", FieldKind::Entity { domains: &["sensor", "input_select", "select"] }),
    field("surplus_entity", "Solar surplus", SENSORS),
    field("surplus_min_entity", "Surplus threshold", FieldKind::Entity { domains: &["sensor", "input_number", "number"] }),
    field("max_target_entity", "Charge target", FieldKind::Entity { domains: &["sensor", "input_number", "number"] }),
    field("smart_charging_entity", "Off-peak charging", SWITCHES),
    field("solar_charging_entity", "Solar charging", SWITCHES),
    field("charge_switch_entity", "Charge switch", FieldKind::Entity { domains: &["switch", "input_boolean"] }),
    field("name", "Name", FieldKind::Text),
    field("kwh_capacity", "Capacity (kWh)", DECIMAL),
    field("show_kwh", "Show kWh", FieldKind::Toggle),
    field("show_ticks", "Show ticks", FieldKind::Toggle),
    field("font_size_percent", "Percent font size", INT),
    field("font_size_ticks", "Tick font size", INT),
    field("color_primary", "Primary colour", FieldKind::Color),
    field("color_accent", "Accent colour", FieldKind::Color),
    field("color_percent", "Percent colour", FieldKind::Color),
    field("hc_label_on", "Off-peak label", FieldKind::Text),
    field("hc_label_off", "Peak label", FieldKind::Text),
    field("hc_state_value", "Off-peak state", FieldKind::Text),
    field("tap_action", "Tap action", FieldKind::Select { options: &["more-info", "none"] }),
    field("smooth_transitions", "Smooth transitions", FieldKind::Toggle),
    field("animation_duration", "Animation (ms)", INT),
    field("power_save_mode", "Power save", FieldKind::Toggle),
    field("debounce_updates", "Debounce", FieldKind::Toggle),
    field("update_interval", "Debounce (ms)", INT),
];

static SOLAR_FIELDS: &[FieldSpec] = &[
    field("entity", "Production sensor", SENSORS),
    field("daily_entity", "Energy today", SENSORS),
    field("secondary_entity", "Secondary sensor", SENSORS),
    field("secondary_label", "Secondary label", FieldKind::Text),
    field("secondary_unit", "Secondary unit", FieldKind::Text),
    field("forecast_entity", "Forecast", SENSORS),
    field("luminosity_entity", "Luminosity", SENSORS),
    field("weather_entity", "Weather", FieldKind::Entity { domains: &["weather"] }),
    field("name", "Name", FieldKind::Text),
    field("max_power", "Peak power (W)", INT),
    field("input_unit", "Sensor unit", FieldKind::Select { options: &["W", "kW"] }),
    field("decimal_places", "Decimals", DECIMALS),
    field("night_threshold", "Night below (lx)", INT),
    field("show_history", "24h history", FieldKind::Toggle),
    field("show_efficiency", "Efficiency", FieldKind::Toggle),
    field("glow_effect", "Glow", FieldKind::Toggle),
    field("cyberpunk_mode", "Cyberpunk", FieldKind::Toggle),
    field("neon_glow", "Neon glow", FieldKind::Toggle),
    field("font_size", "Value size", FieldKind::Select { options: &["small", "medium", "large"] }),
    field("header_font_size", "Header size", FieldKind::Select { options: &["small", "medium", "large"] }),
    field("color_primary", "Primary colour", FieldKind::Color),
    field("color_hot", "Hot colour", FieldKind::Color),
    field("color_mid", "Mid colour", FieldKind::Color),
    field("color_cold", "Cold colour", FieldKind::Color),
];

static HEADER_FIELDS: &[FieldSpec] = &[
    field("title", "Title", FieldKind::Text),
    field("subtitle", "Subtitle", FieldKind::Text),
    field("icon", "Icon", FieldKind::Text),
    field("icon_position", "Icon position", FieldKind::Select { options: &["left", "right", "top"] }),
    field("font_family", "Font", FieldKind::Text),
    field("font_size", "Font size", FieldKind::Text),
    field("italic", "Italic", FieldKind::Toggle),
    field("uppercase", "Uppercase", FieldKind::Toggle),
    field("align_h", "Horizontal alignment", FieldKind::Select { options: &["left", "center", "right"] }),
    field("align_v", "Vertical alignment", FieldKind::Select { options: &["top", "center", "bottom"] }),
    field("color", "Text colour", FieldKind::Color),
    field("icon_color", "Icon colour", FieldKind::Color),
    field("bg_color", "Background", FieldKind::Color),
    field("bg_opacity", "Background opacity", FieldKind::Number { min: Some(0.0), max: Some(1.0), step: 0.05 }),
    field("border_color", "Border colour", FieldKind::Color),
    field("effect_glow", "Glow", FieldKind::Toggle),
    field("effect_scanline", "Scanlines", FieldKind::Toggle),
    field("effect_gradient", "Gradient text", FieldKind::Toggle),
    field("effect_flicker", "Flicker", FieldKind::Toggle),
    field("tap_action", "Tap action", FieldKind::Select { options: &["none", "navigate", "more-info"] }),
    field("navigation_path", "Navigation path", FieldKind::Text),
    field("entity", "Entity", FieldKind::Entity { domains: &[] }),
];

static DUAL_GAUGE_FIELDS: &[FieldSpec] = &[
    field("name", "Name", FieldKind::Text),
    field("gauge_size", "Gauge size", INT),
    field("inner_gauge_size", "Inner gauge size", INT),
    field("update_interval", "Debounce (ms)", INT),
    field("power_save_mode", "Power save", FieldKind::Toggle),
    field("debounce_updates", "Debounce", FieldKind::Toggle),
    field("hide_shadows", "Hide shadows", FieldKind::Toggle),
    field("primary_gauge", "Primary gauge", FieldKind::Select { options: &["inner", "outer"] }),
    field("gauges.*.entity", "Entity", FieldKind::Entity { domains: &["sensor", "input_number", "number"] }),
    field("gauges.*.min", "Minimum", DECIMAL),
    field("gauges.*.max", "Maximum", DECIMAL),
    field("gauges.*.unit", "Unit", FieldKind::Text),
    field("gauges.*.decimals", "Decimals", DECIMALS),
    field("gauges.*.leds_count", "LEDs", INT),
    field("gauges.*.led_size", "LED size", INT),
    field("gauges.*.hide_inactive_leds", "Hide inactive LEDs", FieldKind::Toggle),
    field("gauges.*.smooth_transitions", "Smooth transitions", FieldKind::Toggle),
    field("gauges.*.animation_duration", "Animation (ms)", INT),
    field("gauges.*.bidirectional", "Bidirectional", FieldKind::Toggle),
    field("gauges.*.severity_mode", "Severity scale", FieldKind::Select { options: &["value", "percent"] }),
    field("gauges.*.center_shadow", "Centre shadow", FieldKind::Toggle),
    field("gauges.*.outer_shadow", "Outer shadow", FieldKind::Toggle),
    field("gauges.*.enable_shadow", "Card shadow", FieldKind::Toggle),
];

/// Field descriptors for `kind`, with or without the `custom:` prefix.
pub fn fields_for(kind: &str) -> Result<&'static [FieldSpec], ConfigError> {
    let fields = match kind.strip_prefix("custom:").unwrap_or(kind) {
        "neon-thermo-card" => THERMO_FIELDS,
        "neon-dual-thermo-card" => DUAL_THERMO_FIELDS,
        "neon-battery-card" => BATTERY_FIELDS,
        "neon-solar-card" => SOLAR_FIELDS,
        "neon-header-card" => HEADER_FIELDS,
        "neon-dual-gauge-card" => DUAL_GAUGE_FIELDS,
        other => return Err(ConfigError::UnknownCardType(other.to_string())),
    };
    Ok(fields)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityOption {
    pub entity_id: String,
    pub name: String,
}

/// Edits one card configuration in place.
#[derive(Debug, Clone)]
pub struct ConfigEditor {
    fields: &'static [FieldSpec],
    config: Map<String, Value>,
}

impl ConfigEditor {
    pub fn new(config: &Value) -> Result<Self, ConfigError> {
        let config = config
            .as_object()
            .cloned()
            .ok_or_else(|| ConfigError::Malformed("configuration must be an object".to_string()))?;
        let kind = config
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ConfigError::MissingField("type"))?;
        Ok(Self {
            fields: fields_for(kind)?,
            config,
        })
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    pub fn config(&self) -> Value {
        Value::Object(self.config.clone())
    }

    /// Spec for a dotted `key`, list indices matching `*`.
    pub fn field(&self, key: &str) -> Option<&'static FieldSpec> {
        let pattern: Vec<&str> = key
            .split('.')
            .map(|part| if part.parse::<usize>().is_ok() { "*" } else { part })
            .collect();
        let pattern = pattern.join(".");
        self.fields.iter().find(|f| f.key == pattern)
    }

    /// Entities offered by the picker for `key`, sorted by id. An entity
    /// field without domains offers everything.
    pub fn entity_options(&self, hass: &HassState, key: &str) -> Vec<EntityOption> {
        let Some(FieldSpec {
            kind: FieldKind::Entity { domains },
            ..
        }) = self.field(key)
        else {
            return Vec::new();
        };
        let ids: Vec<&str> = if domains.is_empty() {
            hass.entity_ids()
        } else {
            domains.iter().flat_map(|d| hass.entities_in(d)).collect()
        };
        let mut options: Vec<EntityOption> = ids
            .into_iter()
            .map(|id| EntityOption {
                entity_id: id.to_string(),
                name: hass
                    .get(id)
                    .and_then(|s| s.friendly_name())
                    .unwrap_or(id)
                    .to_string(),
            })
            .collect();
        options.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        options
    }

    /// Applies raw form input to `key` and returns the new configuration.
    ///
    /// Empty input removes the key. `true` and `false` become booleans and
    /// number fields are parsed; everything else is stored as text.
    pub fn change(&mut self, key: &str, raw: &str) -> Result<Value, ConfigError> {
        let spec = self.field(key);
        let raw = raw.trim();
        let value = match (spec.map(|s| s.kind), raw) {
            (_, "") => None,
            (_, "true") => Some(Value::Bool(true)),
            (_, "false") => Some(Value::Bool(false)),
            (Some(FieldKind::Number { min, max, .. }), raw) => {
                let n = parse_number(raw)
                    .ok_or_else(|| ConfigError::invalid(field_name(spec), format!("{raw:?} is not a number")))?;
                if min.is_some_and(|m| n < m) || max.is_some_and(|m| n > m) {
                    return Err(ConfigError::invalid(field_name(spec), format!("{n} is out of range")));
                }
                Some(number(n))
            }
            (_, raw) => Some(Value::String(raw.to_string())),
        };
        debug!("Editor change {} -> {:?}", key, value);
        let path: Vec<&str> = key.split('.').collect();
        set_path(&mut self.config, &path, value)?;
        Ok(self.config())
    }
}

fn field_name(spec: Option<&'static FieldSpec>) -> &'static str {
    spec.map_or("value", |s| s.key)
}

/// Integers stay integers so the YAML the host writes back stays tidy.
fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

fn set_path(map: &mut Map<String, Value>, path: &[&str], value: Option<Value>) -> Result<(), ConfigError> {
    match path {
        [] => Ok(()),
        [last] => {
            match value {
                Some(value) => map.insert(last.to_string(), value),
                None => map.remove(*last),
            };
            Ok(())
        }
        [list, index, rest @ ..] if index.parse::<usize>().is_ok() => {
            let i: usize = index.parse().map_err(|_| ConfigError::Malformed(format!("bad index {index}")))?;
            let items = map
                .get_mut(*list)
                .and_then(Value::as_array_mut)
                .ok_or_else(|| ConfigError::Malformed(format!("`{list}` is not a list")))?;
            let item = items
                .get_mut(i)
                .and_then(Value::as_object_mut)
                .ok_or_else(|| ConfigError::Malformed(format!("`{list}` has no entry {i}")))?;
            set_path(item, rest, value)
        }
        [head, rest @ ..] => {
            let child = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            let child = child
                .as_object_mut()
                .ok_or_else(|| ConfigError::Malformed(format!("`{head}` is not an object")))?;
            set_path(child, rest, value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hass::EntityState;
    use serde_json::json;

    fn editor(config: Value) -> ConfigEditor {
        ConfigEditor::new(&config).unwrap()
    }

    #[test]
    fn every_kind_has_fields() {
        for kind in crate::cards::KINDS {
            assert!(!fields_for(kind).unwrap().is_empty(), "{kind}");
        }
        assert!(fields_for("custom:neon-thermo-card").is_ok());
        assert!(std::ptr::eq(
            fields_for("custom:neon-dual-thermo-card").unwrap(),
            DUAL_THERMO_FIELDS
        ));
        assert_eq!(
            fields_for("clock").unwrap_err(),
            ConfigError::UnknownCardType("clock".to_string())
        );
    }

    #[test]
    fn change_coerces_input() {
        let mut e = editor(json!({ "type": "custom:neon-thermo-card", "entity": "sensor.t", "name": "Salon" }));
        let out = e.change("show_history", "false").unwrap();
        assert_eq!(out["show_history"], json!(false));
        let out = e.change("temp_max", "35").unwrap();
        assert_eq!(out["temp_max"], json!(35));
        let out = e.change("temp_min", "-7.5").unwrap();
        assert_eq!(out["temp_min"], json!(-7.5));
        let out = e.change("name", "").unwrap();
        assert!(out.get("name").is_none());
        let out = e.change("unit", "°F").unwrap();
        assert_eq!(out["unit"], json!("°F"));
        assert!(matches!(e.change("temp_max", "hot"), Err(ConfigError::Invalid { field: "temp_max", .. })));
    }

    #[test]
    fn number_bounds_are_enforced() {
        let mut e = editor(json!({ "type": "neon-header-card", "title": "x" }));
        assert!(e.change("bg_opacity", "0.4").is_ok());
        assert!(e.change("bg_opacity", "3").is_err());
    }

    #[test]
    fn gauge_fields_address_list_entries() {
        let mut e = editor(json!({
            "type": "custom:neon-dual-gauge-card",
            "gauges": [{ "entity": "sensor.a" }, { "entity": "sensor.b" }],
        }));
        assert_eq!(e.field("gauges.1.max").map(|f| f.key), Some("gauges.*.max"));
        let out = e.change("gauges.1.max", "250").unwrap();
        assert_eq!(out["gauges"][1]["max"], json!(250));
        assert!(e.change("gauges.5.max", "1").is_err());
    }

    #[test]
    fn entity_options_follow_domains() {
        let hass = HassState::new()
            .with("sensor.b", EntityState::new("1"))
            .with("sensor.a", EntityState::new("2").with_attribute("friendly_name", "Alpha"))
            .with("switch.pump", EntityState::new("on"))
            .with("weather.home", EntityState::new("sunny"));
        let e = editor(json!({ "type": "neon-solar-card", "entity": "sensor.a" }));
        let options = e.entity_options(&hass, "entity");
        assert_eq!(
            options,
            vec![
                EntityOption { entity_id: "sensor.a".into(), name: "Alpha".into() },
                EntityOption { entity_id: "sensor.b".into(), name: "sensor.b".into() },
            ]
        );
        let weather = e.entity_options(&hass, "weather_entity");
        assert_eq!(weather.len(), 1);
        assert!(e.entity_options(&hass, "name").is_empty());
    }
}
