//! Two thermometers side by side on a shared scale, mercury colored by
//! comfort band.

use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::{Value, json};

use crate::card::{Card, RenderContext, Scheduling};
use crate::cards::thermo::{Palette, SensorPart, SensorZone, TubeHandles, spark_svg, thermo_svg};
use crate::cards::{fixed, show_lifecycle, uid};
use crate::color::band_color;
use crate::config::{self, non_empty};
use crate::dom::{Document, El, NodeId};
use crate::error::ConfigError;
use crate::geometry::{MAX_TEMP_SPAN, ThermoGeometry};
use crate::hass::{CardEvent, HassState, Reading};
use crate::history;
use crate::scheduler::{Snapshot, Update, moved};

const HISTORY_REFRESH: Duration = Duration::from_secs(10 * 60);
const TICK_REPAINT_EVERY: u32 = 30;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DualThermoConfig {
    #[serde(deserialize_with = "non_empty")]
    pub entity_left: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub humidity_entity_left: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub secondary_entity_left: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub secondary_label_left: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub secondary_unit_left: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub name_left: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub entity_right: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub humidity_entity_right: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub secondary_entity_right: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub secondary_label_right: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub secondary_unit_right: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub name_right: Option<String>,
    pub temp_min: f64,
    pub temp_max: f64,
    pub unit: String,
    pub show_history: bool,
    pub show_plasma: bool,
    pub decimal_places: usize,
    #[serde(deserialize_with = "non_empty")]
    pub color_primary: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub color_secondary: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub color_zone1: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub color_zone2: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub color_zone3: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub color_zone4: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub color_zone5: Option<String>,
    pub animation_speed: f64,
}

impl Default for DualThermoConfig {
    fn default() -> Self {
        Self {
            entity_left: None,
            humidity_entity_left: None,
            secondary_entity_left: None,
            secondary_label_left: None,
            secondary_unit_left: None,
            name_left: None,
            entity_right: None,
            humidity_entity_right: None,
            secondary_entity_right: None,
            secondary_label_right: None,
            secondary_unit_right: None,
            name_right: None,
            temp_min: -20.0,
            temp_max: 40.0,
            unit: "°C".to_string(),
            show_history: true,
            show_plasma: true,
            decimal_places: 1,
            color_primary: None,
            color_secondary: None,
            color_zone1: None,
            color_zone2: None,
            color_zone3: None,
            color_zone4: None,
            color_zone5: None,
            animation_speed: 1.0,
        }
    }
}

impl DualThermoConfig {
    pub fn from_value(raw: &Value) -> Result<Self, ConfigError> {
        let config: Self = config::parse(raw)?;
        if config.entity_left.is_none() && config.entity_right.is_none() {
            return Err(ConfigError::MissingField("entity_left"));
        }
        config::check_span("temp_min/temp_max", config.temp_min, config.temp_max, MAX_TEMP_SPAN)?;
        config::check_positive("animation_speed", config.animation_speed)?;
        Ok(config)
    }

    fn side(&self, side: Side) -> SideConfig<'_> {
        match side {
            Side::Left => SideConfig {
                entity: self.entity_left.as_deref(),
                humidity: self.humidity_entity_left.as_ref(),
                secondary: self.secondary_entity_left.as_ref(),
                secondary_label: self.secondary_label_left.as_deref(),
                secondary_unit: self.secondary_unit_left.as_deref(),
                name: self.name_left.as_deref(),
            },
            Side::Right => SideConfig {
                entity: self.entity_right.as_deref(),
                humidity: self.humidity_entity_right.as_ref(),
                secondary: self.secondary_entity_right.as_ref(),
                secondary_label: self.secondary_label_right.as_deref(),
                secondary_unit: self.secondary_unit_right.as_deref(),
                name: self.name_right.as_deref(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    const BOTH: [Side; 2] = [Side::Left, Side::Right];

    fn prefix(self) -> &'static str {
        match self {
            Side::Left => "left-",
            Side::Right => "right-",
        }
    }
}

struct SideConfig<'a> {
    entity: Option<&'a str>,
    humidity: Option<&'a String>,
    secondary: Option<&'a String>,
    secondary_label: Option<&'a str>,
    secondary_unit: Option<&'a str>,
    name: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SideReading {
    pub temp: f64,
    pub humidity: Option<f64>,
    pub secondary: Option<String>,
}

impl Snapshot for SideReading {
    fn differs_from(&self, previous: &Self) -> bool {
        moved(Some(self.temp), Some(previous.temp), 0.2)
            || self.humidity != previous.humidity
            || self.secondary != previous.secondary
    }
}

/// Both sides; a side is `None` when its entity is missing or unreadable.
#[derive(Debug, Clone, PartialEq)]
pub struct DualReading {
    pub left: Option<Update<SideReading>>,
    pub right: Option<Update<SideReading>>,
}

impl DualReading {
    fn get(&self, side: Side) -> Option<&Update<SideReading>> {
        match side {
            Side::Left => self.left.as_ref(),
            Side::Right => self.right.as_ref(),
        }
    }
}

impl Snapshot for DualReading {
    fn differs_from(&self, previous: &Self) -> bool {
        Side::BOTH.iter().any(|side| match (self.get(*side), previous.get(*side)) {
            (Some(a), Some(b)) => a.differs_from(b),
            (None, None) => false,
            _ => true,
        })
    }
}

#[derive(Debug, Clone)]
struct SideHandles {
    top: Option<NodeId>,
    value: Option<NodeId>,
    tube: TubeHandles,
    sensors: Option<SensorZone>,
}

pub struct DualThermoCard {
    config: DualThermoConfig,
    geometry: ThermoGeometry,
    palette: Option<Palette>,
    secondary: String,
    zones: Vec<(f64, String)>,
    above: String,
    handles: Option<[SideHandles; 2]>,
    spark: Option<NodeId>,
    history: [Vec<f64>; 2],
    spark_key: String,
}

impl DualThermoCard {
    /// Mercury color for `temp`: five comfort bands.
    pub fn zone_color(&self, temp: f64) -> &str {
        let bands: Vec<(f64, &str)> = self.zones.iter().map(|(b, c)| (*b, c.as_str())).collect();
        band_color(temp, &bands, &self.above)
    }

    fn observe_side(&self, hass: &HassState, side: Side) -> Option<Update<SideReading>> {
        let c = self.config.side(side);
        let temp = match hass.get(c.entity?)?.reading() {
            Reading::Number(v) => v,
            Reading::Missing(lifecycle) => return Some(Update::Unavailable(lifecycle)),
            Reading::Text(_) => return None,
        };
        Some(Update::Value(SideReading {
            temp,
            humidity: hass.number(c.humidity.map(String::as_str)),
            secondary: hass.text(c.secondary.map(String::as_str)).map(str::to_string),
        }))
    }

    fn render_side(&self, side: Side, palette: &Palette, color: &str, hass: Option<&HassState>) -> El {
        let c = self.config.side(side);
        let p = side.prefix();
        let name = c.name.map(str::to_string).or_else(|| {
            hass.and_then(|h| h.get(c.entity?))
                .and_then(|s| s.friendly_name().map(str::to_string))
        });
        let has_sensors = c.humidity.is_some() || c.secondary.is_some();
        let side_palette = Palette {
            primary: color.to_string(),
            ..palette.clone()
        };
        let first_zone = self.zone_color(self.config.temp_min).to_string();

        El::new("div")
            .id(format!("{p}side"))
            .class("side")
            .child(
                El::new("div")
                    .id(format!("{p}top"))
                    .class("zone-top")
                    .child_if(name.is_some(), || {
                        El::new("div")
                            .class("top-name")
                            .style("color", color)
                            .text(name.clone().unwrap_or_default().to_uppercase())
                    })
                    .child(
                        El::new("div")
                            .class("top-value")
                            .style("color", color)
                            .child(El::new("span").id(format!("{p}temp-val")).text("--"))
                            .child(El::new("span").class("top-unit").text(self.config.unit.clone())),
                    ),
            )
            .child(
                El::new("div")
                    .id(format!("{p}thermo"))
                    .class("zone-thermo")
                    .child(thermo_svg(
                        &self.geometry,
                        &side_palette,
                        &first_zone,
                        Vec::new(),
                        &uid("ndt"),
                        p,
                        self.config.show_plasma.then_some(self.config.animation_speed),
                    )),
            )
            .child_if(has_sensors, || {
                El::new("div").id(format!("{p}sensors")).class("zone-sensors")
            })
    }
}

impl Card for DualThermoCard {
    type Snapshot = DualReading;

    const KIND: &'static str = "neon-dual-thermo-card";

    fn from_config(raw: &Value) -> Result<Self, ConfigError> {
        let config = DualThermoConfig::from_value(raw)?;
        let zone = |value: &Option<String>, default: &str| {
            value.clone().unwrap_or_else(|| default.to_string())
        };
        Ok(Self {
            geometry: ThermoGeometry::new(config.temp_min, config.temp_max),
            zones: vec![
                (5.0, zone(&config.color_zone1, "#0099FF")),
                (15.0, zone(&config.color_zone2, "#00E8FF")),
                (22.0, zone(&config.color_zone3, "#00FFB3")),
                (28.0, zone(&config.color_zone4, "#FF9D00")),
            ],
            above: zone(&config.color_zone5, "#FF2D78"),
            config,
            palette: None,
            secondary: String::new(),
            handles: None,
            spark: None,
            history: [Vec::new(), Vec::new()],
            spark_key: String::new(),
        })
    }

    fn stub_config(hass: Option<&HassState>) -> Value {
        let sensors: Vec<&str> = hass
            .map(|h| h.entities_in("sensor"))
            .unwrap_or_default()
            .into_iter()
            .filter(|id| id.contains("temp"))
            .collect();
        json!({
            "entity_left": sensors.first().copied().unwrap_or("sensor.temperature_inside"),
            "entity_right": sensors.get(1).copied().unwrap_or("sensor.temperature_outside"),
            "name_left": "Intérieur",
            "name_right": "Extérieur",
            "show_history": true,
        })
    }

    fn scheduling(&self) -> Scheduling {
        Scheduling {
            history_refresh: self.config.show_history.then_some(HISTORY_REFRESH),
            ..Scheduling::default()
        }
    }

    fn history_entities(&self) -> Vec<String> {
        [&self.config.entity_left, &self.config.entity_right]
            .into_iter()
            .flatten()
            .cloned()
            .collect()
    }

    fn observe(&self, hass: &HassState) -> Option<Update<DualReading>> {
        let reading = DualReading {
            left: self.observe_side(hass, Side::Left),
            right: self.observe_side(hass, Side::Right),
        };
        if reading.left.is_none() && reading.right.is_none() {
            return None;
        }
        Some(Update::Value(reading))
    }

    fn render(&mut self, ctx: &RenderContext<'_>, doc: &mut Document) {
        let c = &self.config;
        let palette = Palette {
            primary: c
                .color_primary
                .clone()
                .unwrap_or_else(|| ctx.theme.lookup("--primary-color", "#00E8FF")),
            hot: self.above.clone(),
            mid: self.zones[2].1.clone(),
            cold: self.zones[0].1.clone(),
        };
        let secondary = c
            .color_secondary
            .clone()
            .unwrap_or_else(|| ctx.theme.lookup("--accent-color", "#E946FF"));

        let tree = El::new("ha-card")
            .id("card")
            .class("neon-dual-thermo")
            .child(El::new("div").class("divider"))
            .child(
                El::new("div")
                    .class("card-grid")
                    .child(self.render_side(Side::Left, &palette, &palette.primary, ctx.hass))
                    .child(self.render_side(Side::Right, &palette, &secondary, ctx.hass)),
            )
            .child_if(c.show_history, || El::new("div").id("zone-spark").class("zone-spark"));

        doc.replace_root(tree);
        let sides = Side::BOTH.map(|side| {
            let p = side.prefix();
            let scope = doc.find(&format!("{p}thermo")).unwrap_or(doc.root());
            SideHandles {
                top: doc.find(&format!("{p}top")),
                value: doc.find(&format!("{p}temp-val")),
                tube: TubeHandles::find(doc, scope, p),
                sensors: doc
                    .find(&format!("{p}sensors"))
                    .map(|zone| SensorZone::new(zone, p)),
            }
        });
        self.handles = Some(sides);
        self.spark = doc.find("zone-spark");
        self.palette = Some(palette);
        self.secondary = secondary;
        self.spark_key.clear();
    }

    fn patch(&mut self, doc: &mut Document, update: &Update<DualReading>, _now: Instant) {
        let Update::Value(reading) = update else {
            return;
        };
        let (Some(mut handles), Some(palette)) = (self.handles.take(), self.palette.clone()) else {
            return;
        };
        for (side, h) in Side::BOTH.into_iter().zip(handles.iter_mut()) {
            let Some(side_update) = reading.get(side) else {
                continue;
            };
            let lifecycle = match side_update {
                Update::Unavailable(lifecycle) => Some(*lifecycle),
                Update::Value(_) => None,
            };
            if let Some(top) = h.top {
                show_lifecycle(doc, top, h.value, lifecycle);
            }
            let Update::Value(r) = side_update else {
                continue;
            };
            if let Some(value) = h.value {
                doc.set_text(value, fixed(r.temp, self.config.decimal_places));
            }
            let color = self.zone_color(r.temp).to_string();
            if let Some(merc) = h.tube.merc {
                doc.set_attr(merc, "fill", &color);
            }
            let side_palette = Palette {
                primary: match side {
                    Side::Left => palette.primary.clone(),
                    Side::Right => self.secondary.clone(),
                },
                ..palette.clone()
            };
            h.tube.patch(doc, &self.geometry, r.temp, &side_palette, TICK_REPAINT_EVERY);

            if let Some(zone) = &mut h.sensors {
                let c = self.config.side(side);
                let parts = SensorPart::collect(
                    r.humidity.zip(c.humidity),
                    r.secondary.as_ref().zip(c.secondary),
                    c.secondary_label,
                    c.secondary_unit,
                );
                zone.patch(doc, &parts, None);
            }
        }
        self.handles = Some(handles);
        self.patch_history(doc);
    }

    fn set_history(&mut self, entity_id: &str, values: Vec<f64>) {
        if self.config.entity_left.as_deref() == Some(entity_id) {
            self.history[0] = values.clone();
        }
        if self.config.entity_right.as_deref() == Some(entity_id) {
            self.history[1] = values;
        }
    }

    fn patch_history(&mut self, doc: &mut Document) {
        let (Some(zone), Some(palette)) = (self.spark, &self.palette) else {
            return;
        };
        if self.history.iter().all(Vec::is_empty) {
            return;
        }
        let key = format!(
            "{}|{}",
            history::fingerprint(&self.history[0]),
            history::fingerprint(&self.history[1])
        );
        if key == self.spark_key {
            return;
        }
        let series: Vec<(&[f64], &str)> = [
            (self.history[0].as_slice(), palette.primary.as_str()),
            (self.history[1].as_slice(), self.secondary.as_str()),
        ]
        .into_iter()
        .filter(|(values, _)| !values.is_empty())
        .collect();
        let svg = spark_svg(&series, palette, 640.0);
        doc.replace_children(zone, vec![svg]);
        self.spark_key = key;
    }

    fn tap(&self, target: &str, _hass: Option<&HassState>) -> Option<CardEvent> {
        for side in Side::BOTH {
            let Some(rest) = target.strip_prefix(side.prefix()) else {
                continue;
            };
            if let Some(index) = rest.strip_prefix("sensor-") {
                let index: usize = index.parse().ok()?;
                let handles = self.handles.as_ref()?;
                let zone = handles[side as usize].sensors.as_ref()?;
                return zone.entity(index).map(CardEvent::more_info);
            }
            return self.config.side(side).entity.map(CardEvent::more_info);
        }
        None
    }

    fn card_size(&self) -> u32 {
        if self.config.show_history { 4 } else { 3 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hass::{EntityState, Lifecycle};
    use crate::theme::CssVarCache;

    fn mounted(raw: Value) -> (DualThermoCard, Document) {
        let mut card = DualThermoCard::from_config(&raw).unwrap();
        let mut doc = Document::new();
        let theme = CssVarCache::default();
        card.render(&RenderContext { theme: &theme, hass: None }, &mut doc);
        (card, doc)
    }

    #[test]
    fn needs_at_least_one_side() {
        assert_eq!(
            DualThermoConfig::from_value(&json!({})).err(),
            Some(ConfigError::MissingField("entity_left"))
        );
        let c = DualThermoConfig::from_value(&json!({ "entity_right": "sensor.out" })).unwrap();
        assert_eq!((c.temp_min, c.temp_max), (-20.0, 40.0));
        let wide = json!({ "entity_left": "sensor.a", "temp_min": -1e7, "temp_max": 1e7 });
        assert!(matches!(
            DualThermoConfig::from_value(&wide),
            Err(ConfigError::InvalidRange { .. })
        ));
    }

    #[test]
    fn mercury_follows_comfort_bands() {
        let (card, _) = mounted(json!({ "entity_left": "sensor.a" }));
        assert_eq!(card.zone_color(-3.0), "#0099FF");
        assert_eq!(card.zone_color(5.0), "#00E8FF");
        assert_eq!(card.zone_color(21.9), "#00FFB3");
        assert_eq!(card.zone_color(22.0), "#FF9D00");
        assert_eq!(card.zone_color(35.0), "#FF2D78");
    }

    #[test]
    fn sides_patch_independently() {
        let (mut card, mut doc) = mounted(json!({
            "entity_left": "sensor.a",
            "entity_right": "sensor.b",
            "show_history": false,
        }));
        let hass = HassState::new()
            .with("sensor.a", EntityState::new("23.4"))
            .with("sensor.b", EntityState::new("unavailable"));
        let update = card.observe(&hass).unwrap();
        card.patch(&mut doc, &update, Instant::now());

        let left = doc.find("left-temp-val").unwrap();
        let right = doc.find("right-temp-val").unwrap();
        assert_eq!(doc.text_of(left), Some("23.4"));
        assert_eq!(doc.text_of(right), Some("—"));
        let merc = doc.find("left-merc").unwrap();
        assert_eq!(doc.attr(merc, "fill"), Some("#FF9D00"));
    }

    #[test]
    fn diff_uses_wider_dead_band() {
        let side = |temp| {
            Some(Update::Value(SideReading {
                temp,
                humidity: None,
                secondary: None,
            }))
        };
        let a = DualReading { left: side(20.0), right: None };
        let b = DualReading { left: side(20.15), right: None };
        let c = DualReading { left: side(20.15), right: Some(Update::Unavailable(Lifecycle::Unknown)) };
        assert!(!b.differs_from(&a));
        assert!(c.differs_from(&a));
    }

    #[test]
    fn dual_sparkline_shares_one_scale() {
        let (mut card, mut doc) = mounted(json!({
            "entity_left": "sensor.a",
            "entity_right": "sensor.b",
        }));
        card.set_history("sensor.a", vec![10.0, 12.0]);
        card.set_history("sensor.b", vec![20.0, 22.0]);
        card.patch_history(&mut doc);
        let markup = doc.to_markup();
        assert_eq!(markup.matches("<polyline").count(), 2);
        assert!(markup.contains("MIN:10.0"));
        assert!(markup.contains("MAX:22.0"));
    }

    #[test]
    fn taps_route_to_the_side_entity() {
        let (card, _) = mounted(json!({ "entity_left": "sensor.a", "entity_right": "sensor.b" }));
        assert_eq!(card.tap("right-thermo", None), Some(CardEvent::more_info("sensor.b")));
        assert_eq!(card.tap("left-top", None), Some(CardEvent::more_info("sensor.a")));
        assert_eq!(card.tap("card", None), None);
    }
}
