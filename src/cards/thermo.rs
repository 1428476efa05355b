//! Neon thermometer: mercury column, graduations, side sensors and a 24 h
//! sparkline.

use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::{Value, json};

use crate::card::{Card, RenderContext, Scheduling};
use crate::cards::{fixed, show_lifecycle, uid};
use crate::config::{self, non_empty};
use crate::dom::{Document, El, NodeId};
use crate::error::ConfigError;
use crate::geometry::{MAX_TEMP_SPAN, ThermoGeometry, num};
use crate::hass::{CardEvent, HassState, Reading};
use crate::history::{self, HistoryStats};
use crate::scheduler::{Snapshot, Update, moved};

const HISTORY_REFRESH: Duration = Duration::from_secs(5 * 60);
const TICK_REPAINT_EVERY: u32 = 10;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThermoConfig {
    #[serde(deserialize_with = "non_empty")]
    pub entity: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub humidity_entity: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub secondary_entity: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub secondary_label: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub secondary_unit: Option<String>,
    pub temp_min: f64,
    pub temp_max: f64,
    pub unit: String,
    #[serde(deserialize_with = "non_empty")]
    pub name: Option<String>,
    pub show_history: bool,
    pub show_plasma: bool,
    pub decimal_places: usize,
    #[serde(deserialize_with = "non_empty")]
    pub color_primary: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub color_hot: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub color_mid: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub color_cold: Option<String>,
    pub animation_speed: f64,
}

impl Default for ThermoConfig {
    fn default() -> Self {
        Self {
            entity: None,
            humidity_entity: None,
            secondary_entity: None,
            secondary_label: None,
            secondary_unit: None,
            temp_min: -10.0,
            temp_max: 40.0,
            unit: "°C".to_string(),
            name: None,
            show_history: true,
            show_plasma: true,
            decimal_places: 1,
            color_primary: None,
            color_hot: None,
            color_mid: None,
            color_cold: None,
            animation_speed: 1.0,
        }
    }
}

impl ThermoConfig {
    pub fn from_value(raw: &Value) -> Result<Self, ConfigError> {
        let config: Self = config::parse(raw)?;
        config::require(&config.entity, "entity")?;
        config::check_span("temp_min/temp_max", config.temp_min, config.temp_max, MAX_TEMP_SPAN)?;
        config::check_positive("animation_speed", config.animation_speed)?;
        Ok(config)
    }

    fn has_sensors(&self) -> bool {
        self.humidity_entity.is_some() || self.secondary_entity.is_some()
    }
}

/// Resolved colors for one render.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Palette {
    pub primary: String,
    pub hot: String,
    pub mid: String,
    pub cold: String,
}

impl Palette {
    /// Tick color for graduation `t` with the column at `temp`.
    pub(crate) fn tick(&self, t: f64, temp: f64) -> &str {
        if t > temp {
            &self.primary
        } else if t < 0.0 {
            &self.cold
        } else if t < 20.0 {
            &self.mid
        } else {
            &self.hot
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThermoReading {
    pub temp: f64,
    pub humidity: Option<f64>,
    pub secondary: Option<String>,
    pub name: Option<String>,
}

impl Snapshot for ThermoReading {
    fn differs_from(&self, previous: &Self) -> bool {
        moved(Some(self.temp), Some(previous.temp), 0.1)
            || self.humidity != previous.humidity
            || self.secondary != previous.secondary
            || self.name != previous.name
    }
}

/// Handles into one thermometer tube, shared with the dual card.
#[derive(Debug, Clone)]
pub(crate) struct TubeHandles {
    pub merc: Option<NodeId>,
    pub shine: Option<NodeId>,
    pub meniscus: Option<NodeId>,
    pub ticks: Vec<(NodeId, f64)>,
    counter: u32,
}

impl TubeHandles {
    pub(crate) fn find(doc: &Document, scope: NodeId, prefix: &str) -> Self {
        let ticks = doc
            .find_all_with(scope, "data-t")
            .into_iter()
            .filter_map(|id| {
                let t = doc.attr(id, "data-t")?.parse::<f64>().ok()?;
                Some((id, t))
            })
            .collect();
        Self {
            merc: doc.find(&format!("{prefix}merc")),
            shine: doc.find(&format!("{prefix}shine")),
            meniscus: doc.find(&format!("{prefix}meniscus")),
            ticks,
            counter: 0,
        }
    }

    /// Moves the column. Tick colors are repainted on the first call and
    /// then every `every` calls.
    pub(crate) fn patch(
        &mut self,
        doc: &mut Document,
        geo: &ThermoGeometry,
        temp: f64,
        palette: &Palette,
        every: u32,
    ) {
        let (top, height) = geo.mercury(temp);
        let ratio = crate::geometry::ratio(temp, geo.min, geo.max);
        for rect in [self.merc, self.shine].into_iter().flatten() {
            doc.set_attr(rect, "y", num(top));
            doc.set_attr(rect, "height", num(height));
        }
        if let Some(meniscus) = self.meniscus {
            doc.set_attr(meniscus, "y", num(top - 2.0));
            doc.set_style(meniscus, "display", if ratio > 0.01 { "" } else { "none" });
        }

        self.counter += 1;
        if self.counter % every != 1 && every != 1 {
            return;
        }
        for &(id, t) in &self.ticks {
            let color = palette.tick(t, temp);
            if doc.tag(id) == "line" {
                doc.set_attr(id, "stroke", color);
            } else {
                doc.set_attr(id, "fill", color);
                doc.set_attr(id, "font-weight", if t <= temp { "700" } else { "400" });
            }
        }
    }
}

/// The tube, bulb, optional plasma and graduations. Node ids are prefixed
/// with `prefix` so two tubes can share a document.
pub(crate) fn thermo_svg(
    geo: &ThermoGeometry,
    palette: &Palette,
    mercury_fill: &str,
    defs: Vec<El>,
    svg_id: &str,
    prefix: &str,
    plasma: Option<f64>,
) -> El {
    let cx = geo.cx;
    let inner = geo.outline_path(geo.tube_half_inner, geo.bulb_r_inner, geo.tangent_inner);
    let outer = geo.outline_path(geo.tube_half_outer, geo.bulb_r_outer, geo.tangent_outer);
    let column_h = geo.bulb_cy + geo.bulb_r_inner - geo.grad_bottom;

    let column = |id: &str, x: f64, width: f64, fill: String| {
        El::new("rect")
            .id(format!("{prefix}{id}"))
            .attr("x", num(x))
            .attr("width", num(width))
            .attr("y", num(geo.grad_bottom))
            .attr("height", num(column_h))
            .attr("fill", fill)
    };

    let ticks = geo.ticks.iter().flat_map(|tick| {
        let x1 = cx + geo.bulb_r_outer + 4.0;
        let x2 = if tick.long { x1 + 12.0 } else { x1 + 7.0 };
        let y = format!("{:.1}", tick.y);
        let line = El::new("line")
            .attr("data-t", num(tick.value))
            .attr("x1", num(x1))
            .attr("x2", num(x2))
            .attr("y1", &y)
            .attr("y2", &y)
            .attr("stroke", &palette.primary)
            .attr("stroke-width", if tick.long { "1.8" } else { "1" })
            .attr("opacity", if tick.long { "0.9" } else { "0.35" });
        let label = tick.long.then(|| {
            El::new("text")
                .attr("data-t", num(tick.value))
                .attr("x", num(x2 + 3.0))
                .attr("y", format!("{:.1}", tick.y + 3.0))
                .attr("font-size", 8)
                .attr("fill", &palette.primary)
                .attr("font-weight", "400")
                .text(format!("{}°", num(tick.value)))
        });
        std::iter::once(line).chain(label)
    });

    El::new("svg")
        .attr("viewBox", format!("0 0 {} {}", num(geo.view_width), num(geo.view_height)))
        .attr("width", "100%")
        .child(
            El::new("defs")
                .child(
                    El::new("clipPath")
                        .id(format!("{svg_id}-clip"))
                        .child(El::new("path").attr("d", &inner)),
                )
                .children(defs),
        )
        .child(
            El::new("path")
                .attr("d", &inner)
                .attr("fill", "#1A1525")
                .attr("opacity", "0.7"),
        )
        .child(
            El::new("g")
                .attr("clip-path", format!("url(#{svg_id}-clip)"))
                .child(
                    column(
                        "merc",
                        cx - geo.bulb_r_inner - 4.0,
                        (geo.bulb_r_inner + 4.0) * 2.0,
                        mercury_fill.to_string(),
                    )
                    .attr("opacity", "0.95"),
                )
                .child(column(
                    "shine",
                    cx - geo.tube_half_inner + 1.0,
                    5.0,
                    "rgba(255,255,255,0.14)".to_string(),
                ))
                .child(
                    El::new("rect")
                        .id(format!("{prefix}meniscus"))
                        .attr("x", num(cx - geo.tube_half_inner + 1.0))
                        .attr("width", num(geo.tube_half_inner * 2.0 - 2.0))
                        .attr("height", 3)
                        .attr("y", num(geo.grad_bottom))
                        .attr("rx", 1.5)
                        .attr("fill", &palette.cold)
                        .attr("opacity", "0.7")
                        .style("display", "none"),
                ),
        )
        .child_if(plasma.is_some(), || {
            let speed = plasma.unwrap_or(1.0);
            let r1 = (geo.bulb_r_inner * 0.85).round();
            let r2 = (geo.bulb_r_inner * 0.38).round();
            let ring = |rx: f64, ry: f64, stroke: &str, dur: f64| {
                El::new("ellipse")
                    .attr("rx", num(rx))
                    .attr("ry", num(ry))
                    .attr("fill", "none")
                    .attr("stroke", stroke)
                    .attr("stroke-width", "1.8")
                    .attr("data-dur", format!("{:.1}s", dur / speed))
            };
            El::new("g")
                .class("plasma")
                .attr("transform", format!("translate({},{})", num(cx), num(geo.bulb_cy)))
                .child(ring(r1, r2, &palette.mid, 2.5))
                .child(ring(r2, r1, &palette.hot, 3.5))
        })
        .child(
            El::new("path")
                .class("outline")
                .attr("d", &outer)
                .attr("fill", "none")
                .attr("stroke", &palette.primary)
                .attr("stroke-width", "1.8"),
        )
        .child(El::new("g").class("ticks").children(ticks))
}

/// Vertical hot -> mid -> cold gradient for the mercury column.
pub(crate) fn mercury_gradient(id: &str, palette: &Palette) -> El {
    El::new("linearGradient")
        .id(id)
        .attr("x1", 0)
        .attr("y1", 1)
        .attr("x2", 0)
        .attr("y2", 0)
        .child(El::new("stop").attr("offset", "0%").attr("stop-color", &palette.hot))
        .child(El::new("stop").attr("offset", "45%").attr("stop-color", &palette.mid))
        .child(El::new("stop").attr("offset", "100%").attr("stop-color", &palette.cold))
}

/// Sparkline with AVG/MAX/MIN header. `series` are `(values, stroke)` drawn
/// on one shared scale.
pub(crate) fn spark_svg(series: &[(&[f64], &str)], palette: &Palette, width: f64) -> El {
    const HEIGHT: f64 = 55.0;
    const PAD_Y: f64 = 14.0;
    let all = series.iter().flat_map(|(values, _)| values.iter().copied());
    let stats = HistoryStats::from_values(all).unwrap_or_default();
    let header = |id: &str, x: f64, fill: &str, label: String| {
        El::new("text")
            .id(id)
            .attr("x", num(x))
            .attr("y", 9)
            .attr("fill", fill)
            .text(label)
    };

    El::new("svg")
        .attr("viewBox", format!("0 0 {} {}", num(width), num(PAD_Y + HEIGHT + 20.0)))
        .attr("width", "100%")
        .child(header("spark-title", 0.0, &palette.primary, "CYCLIC_ANALYSIS_24H".to_string()))
        .child(header(
            "spark-avg",
            width * 0.375,
            &palette.primary,
            format!("AVG:{}", fixed(stats.avg, 1)),
        ))
        .child(header(
            "spark-max",
            width * 0.5875,
            &palette.hot,
            format!("MAX:{}", fixed(stats.max, 1)),
        ))
        .child(header(
            "spark-min",
            width * 0.797,
            &palette.cold,
            format!("MIN:{}", fixed(stats.min, 1)),
        ))
        .children(series.iter().map(|(values, stroke)| {
            El::new("polyline")
                .attr(
                    "points",
                    history::sparkline_points_in(values, stats.min, stats.max, width, HEIGHT, PAD_Y),
                )
                .attr("fill", "none")
                .attr("stroke", *stroke)
                .attr("stroke-width", "1.8")
        }))
}

/// One humidity / secondary block of a sensor zone.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SensorPart {
    pub label: String,
    pub value: String,
    pub unit: String,
    pub entity: String,
}

impl SensorPart {
    /// Blocks for whichever of humidity and secondary are configured and read.
    pub(crate) fn collect(
        humidity: Option<(f64, &String)>,
        secondary: Option<(&String, &String)>,
        secondary_label: Option<&str>,
        secondary_unit: Option<&str>,
    ) -> Vec<Self> {
        let mut parts = Vec::new();
        if let Some((value, entity)) = humidity {
            parts.push(SensorPart {
                label: "HUMIDITY".to_string(),
                value: fixed(value, 0),
                unit: "%".to_string(),
                entity: entity.clone(),
            });
        }
        if let Some((value, entity)) = secondary {
            parts.push(SensorPart {
                label: secondary_label.unwrap_or("SENSOR").to_uppercase(),
                value: value.clone(),
                unit: secondary_unit.unwrap_or_default().to_string(),
                entity: entity.clone(),
            });
        }
        parts
    }
}

/// A sensor zone whose blocks are rebuilt only when the set of entities
/// changes; otherwise values are patched in place.
#[derive(Debug, Clone)]
pub(crate) struct SensorZone {
    zone: NodeId,
    prefix: String,
    entities: Option<Vec<String>>,
}

impl SensorZone {
    pub(crate) fn new(zone: NodeId, prefix: &str) -> Self {
        Self {
            zone,
            prefix: prefix.to_string(),
            entities: None,
        }
    }

    pub(crate) fn patch(&mut self, doc: &mut Document, parts: &[SensorPart], trend: Option<Trend>) {
        let p = &self.prefix;
        let entities: Vec<String> = parts.iter().map(|part| part.entity.clone()).collect();
        if self.entities.as_ref() != Some(&entities) {
            let blocks = parts.iter().enumerate().map(|(i, part)| {
                El::new("div")
                    .id(format!("{p}sensor-{i}"))
                    .class("sensor-block")
                    .attr("data-entity", &part.entity)
                    .child(El::new("span").class("sensor-label").text(part.label.clone()))
                    .child(
                        El::new("span")
                            .class("sensor-value")
                            .child(El::new("span").id(format!("{p}sensor-val-{i}")).text(part.value.clone()))
                            .child(El::new("span").class("sensor-unit").text(part.unit.clone())),
                    )
            });
            let trend_el = trend.map(|t| {
                El::new("div")
                    .class("trend-indicator")
                    .child(El::new("span").id(format!("{p}trend-arrow")).class("trend-arrow").class(t.class()).text(t.arrow()))
                    .child(El::new("span").id(format!("{p}trend-text")).text(t.label()))
            });
            doc.replace_children(self.zone, blocks.chain(trend_el).collect());
            self.entities = Some(entities);
            return;
        }

        for (i, part) in parts.iter().enumerate() {
            if let Some(val) = doc.find(&format!("{p}sensor-val-{i}")) {
                doc.set_text(val, part.value.clone());
            }
        }
        let Some(trend) = trend else {
            return;
        };
        if let Some(arrow) = doc.find(&format!("{p}trend-arrow")) {
            doc.set_text(arrow, trend.arrow());
            for t in [Trend::Rising, Trend::Falling, Trend::Stable] {
                doc.set_class(arrow, t.class(), t == trend);
            }
        }
        if let Some(text) = doc.find(&format!("{p}trend-text")) {
            doc.set_text(text, trend.label());
        }
    }

    /// Entity behind block `index` of the last rebuild.
    pub(crate) fn entity(&self, index: usize) -> Option<&str> {
        self.entities.as_ref()?.get(index).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Trend {
    Rising,
    Falling,
    Stable,
}

impl Trend {
    /// Moves of 0.1 or less count as stable.
    pub(crate) fn between(previous: Option<f64>, current: f64) -> Self {
        match previous {
            Some(prev) if current - prev > 0.1 => Trend::Rising,
            Some(prev) if prev - current > 0.1 => Trend::Falling,
            _ => Trend::Stable,
        }
    }

    fn arrow(self) -> &'static str {
        match self {
            Trend::Rising => "▲",
            Trend::Falling => "▼",
            Trend::Stable => "→",
        }
    }

    fn class(self) -> &'static str {
        match self {
            Trend::Rising => "trend-up",
            Trend::Falling => "trend-down",
            Trend::Stable => "trend-stable",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Trend::Rising => "TEMP RISING",
            Trend::Falling => "TEMP FALLING",
            Trend::Stable => "TEMP STABLE",
        }
    }
}

#[derive(Debug, Clone)]
struct Handles {
    card: NodeId,
    name: Option<NodeId>,
    value: Option<NodeId>,
    tube: TubeHandles,
    sensors: Option<SensorZone>,
    spark: Option<NodeId>,
}

pub struct ThermoCard {
    config: ThermoConfig,
    geometry: ThermoGeometry,
    palette: Option<Palette>,
    handles: Option<Handles>,
    history: Vec<f64>,
    spark_key: String,
    prev_temp: Option<f64>,
}

impl ThermoCard {
    pub fn config(&self) -> &ThermoConfig {
        &self.config
    }

    fn entity(&self) -> &str {
        self.config.entity.as_deref().unwrap_or_default()
    }

    fn sensor_parts(&self, reading: &ThermoReading) -> Vec<SensorPart> {
        let c = &self.config;
        SensorPart::collect(
            reading.humidity.zip(c.humidity_entity.as_ref()),
            reading.secondary.as_ref().zip(c.secondary_entity.as_ref()),
            c.secondary_label.as_deref(),
            c.secondary_unit.as_deref(),
        )
    }
}

impl Card for ThermoCard {
    type Snapshot = ThermoReading;

    const KIND: &'static str = "neon-thermo-card";

    fn from_config(raw: &Value) -> Result<Self, ConfigError> {
        let config = ThermoConfig::from_value(raw)?;
        Ok(Self {
            geometry: ThermoGeometry::new(config.temp_min, config.temp_max),
            config,
            palette: None,
            handles: None,
            history: Vec::new(),
            spark_key: String::new(),
            prev_temp: None,
        })
    }

    fn stub_config(hass: Option<&HassState>) -> Value {
        let entity = hass
            .and_then(|h| h.entities_in("sensor").into_iter().find(|id| id.contains("temp")))
            .unwrap_or("sensor.temperature");
        json!({ "entity": entity, "name": "Salon", "show_history": true })
    }

    fn scheduling(&self) -> Scheduling {
        Scheduling {
            history_refresh: self.config.show_history.then_some(HISTORY_REFRESH),
            ..Scheduling::default()
        }
    }

    fn history_entities(&self) -> Vec<String> {
        self.config.entity.iter().cloned().collect()
    }

    fn observe(&self, hass: &HassState) -> Option<Update<ThermoReading>> {
        let c = &self.config;
        let state = hass.get(self.entity())?;
        let temp = match state.reading() {
            Reading::Number(v) => v,
            Reading::Missing(lifecycle) => return Some(Update::Unavailable(lifecycle)),
            Reading::Text(_) => return None,
        };
        Some(Update::Value(ThermoReading {
            temp,
            humidity: hass.number(c.humidity_entity.as_deref()),
            secondary: hass.text(c.secondary_entity.as_deref()).map(str::to_string),
            name: state.friendly_name().map(str::to_string),
        }))
    }

    fn render(&mut self, ctx: &RenderContext<'_>, doc: &mut Document) {
        let c = &self.config;
        let palette = Palette {
            primary: c
                .color_primary
                .clone()
                .unwrap_or_else(|| ctx.theme.lookup("--primary-color", "#00E8FF")),
            hot: c.color_hot.clone().unwrap_or_else(|| "#FF2D78".to_string()),
            mid: c.color_mid.clone().unwrap_or_else(|| "#E946FF".to_string()),
            cold: c.color_cold.clone().unwrap_or_else(|| "#00E8FF".to_string()),
        };
        let svg_id = uid("ntc");
        let gradient = format!("{svg_id}-merc");
        let name = c.name.clone().or_else(|| {
            ctx.hass
                .and_then(|h| h.get(self.entity()))
                .and_then(|s| s.friendly_name().map(str::to_string))
        });

        let tree = El::new("ha-card")
            .id("card")
            .class("neon-thermo")
            .child(
                El::new("div")
                    .class("zone-top")
                    .child(
                        El::new("div")
                            .id("top-name")
                            .class("top-name")
                            .text(name.map(|n| n.to_uppercase()).unwrap_or_default()),
                    )
                    .child(
                        El::new("div")
                            .class("top-value")
                            .child(El::new("span").id("temp-val").text("--"))
                            .child(El::new("span").class("top-unit").text(c.unit.clone())),
                    ),
            )
            .child(
                El::new("div")
                    .id("zone-thermo")
                    .class("zone-thermo")
                    .child(thermo_svg(
                        &self.geometry,
                        &palette,
                        &format!("url(#{gradient})"),
                        vec![mercury_gradient(&gradient, &palette)],
                        &svg_id,
                        "",
                        c.show_plasma.then_some(c.animation_speed),
                    )),
            )
            .child_if(c.has_sensors(), || El::new("div").id("zone-sensors").class("zone-sensors"))
            .child_if(c.show_history, || El::new("div").id("zone-spark").class("zone-spark"));

        let card = doc.replace_root(tree);
        let scope = doc.find("zone-thermo").unwrap_or(card);
        self.handles = Some(Handles {
            card,
            name: doc.find("top-name"),
            value: doc.find("temp-val"),
            tube: TubeHandles::find(doc, scope, ""),
            sensors: doc.find("zone-sensors").map(|zone| SensorZone::new(zone, "")),
            spark: doc.find("zone-spark"),
        });
        self.palette = Some(palette);
        self.spark_key.clear();
    }

    fn patch(&mut self, doc: &mut Document, update: &Update<ThermoReading>, _now: Instant) {
        let (Some(mut handles), Some(palette)) = (self.handles.take(), self.palette.clone()) else {
            return;
        };
        match update {
            Update::Unavailable(lifecycle) => {
                show_lifecycle(doc, handles.card, handles.value, Some(*lifecycle));
            }
            Update::Value(reading) => {
                show_lifecycle(doc, handles.card, handles.value, None);
                if let Some(value) = handles.value {
                    doc.set_text(value, fixed(reading.temp, self.config.decimal_places));
                }
                if let (Some(name), None) = (handles.name, &self.config.name) {
                    let shown = reading.name.as_deref().unwrap_or_default().to_uppercase();
                    doc.set_text(name, shown);
                }
                handles.tube.patch(doc, &self.geometry, reading.temp, &palette, TICK_REPAINT_EVERY);
                if let Some(zone) = &mut handles.sensors {
                    let parts = self.sensor_parts(reading);
                    zone.patch(doc, &parts, Some(Trend::between(self.prev_temp, reading.temp)));
                }
                self.prev_temp = Some(reading.temp);
            }
        }
        self.handles = Some(handles);
        self.patch_history(doc);
    }

    fn set_history(&mut self, _entity_id: &str, values: Vec<f64>) {
        self.history = values;
    }

    fn patch_history(&mut self, doc: &mut Document) {
        let (Some(handles), Some(palette)) = (&self.handles, &self.palette) else {
            return;
        };
        let Some(zone) = handles.spark else {
            return;
        };
        if self.history.is_empty() {
            return;
        }
        let key = history::fingerprint(&self.history);
        if key == self.spark_key {
            return;
        }
        let series: [(&[f64], &str); 1] = [(self.history.as_slice(), palette.hot.as_str())];
        let svg = spark_svg(&series, palette, 320.0);
        doc.replace_children(zone, vec![svg]);
        self.spark_key = key;
    }

    fn tap(&self, target: &str, _hass: Option<&HassState>) -> Option<CardEvent> {
        if let Some(index) = target.strip_prefix("sensor-") {
            let index: usize = index.parse().ok()?;
            let zone = self.handles.as_ref()?.sensors.as_ref()?;
            return zone.entity(index).map(CardEvent::more_info);
        }
        Some(CardEvent::more_info(self.entity()))
    }

    fn card_size(&self) -> u32 {
        if self.config.show_history { 4 } else { 2 }
    }
}
