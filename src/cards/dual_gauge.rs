//! Two concentric LED ring gauges sharing one centre.
//!
//! Gauge 0 is the inner ring, gauge 1 the outer one. Each ring lights
//! `LedAllocation::compute` LEDs in the severity colour of its value, with
//! markers and zone arcs placed by `value_to_angle`.

use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::animation::Transition;
use crate::card::{Card, RenderContext, Scheduling};
use crate::cards::{fixed, show_lifecycle};
use crate::color::{Severity, SeverityScale, default_severity, severity_color};
use crate::config::{self, non_empty};
use crate::dom::{Document, El, NodeId};
use crate::error::ConfigError;
use crate::geometry::{self, LedAllocation, num, polar, value_to_angle};
use crate::hass::{CardEvent, HassState, Reading};
use crate::scheduler::{Snapshot, Update};

const PREFIXES: [&str; 2] = ["inner", "outer"];

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Marker {
    pub value: f64,
    #[serde(default, deserialize_with = "non_empty")]
    pub color: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Zone {
    pub from: f64,
    pub to: f64,
    #[serde(default, deserialize_with = "non_empty")]
    pub color: Option<String>,
    #[serde(default)]
    pub opacity: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GaugeConfig {
    #[serde(deserialize_with = "non_empty")]
    pub entity: Option<String>,
    pub min: f64,
    pub max: f64,
    #[serde(deserialize_with = "non_empty")]
    pub unit: Option<String>,
    pub decimals: usize,
    pub leds_count: usize,
    pub led_size: f64,
    pub hide_inactive_leds: bool,
    pub smooth_transitions: bool,
    /// Milliseconds.
    pub animation_duration: u64,
    pub bidirectional: bool,
    pub severity: Vec<Severity>,
    pub severity_mode: SeverityScale,
    pub center_shadow: bool,
    pub center_shadow_blur: f64,
    pub center_shadow_spread: f64,
    pub outer_shadow: bool,
    pub outer_shadow_blur: f64,
    pub outer_shadow_spread: f64,
    pub enable_shadow: bool,
    pub markers: Vec<Marker>,
    pub markers_radius: Option<f64>,
    pub zones: Vec<Zone>,
}

impl Default for GaugeConfig {
    fn default() -> Self {
        Self {
            entity: None,
            min: 0.0,
            max: 100.0,
            unit: None,
            decimals: 1,
            leds_count: 100,
            led_size: 8.0,
            hide_inactive_leds: false,
            smooth_transitions: true,
            animation_duration: 800,
            bidirectional: false,
            severity: default_severity(),
            severity_mode: SeverityScale::Value,
            center_shadow: false,
            center_shadow_blur: 30.0,
            center_shadow_spread: 15.0,
            outer_shadow: false,
            outer_shadow_blur: 30.0,
            outer_shadow_spread: 15.0,
            enable_shadow: false,
            markers: Vec::new(),
            markers_radius: None,
            zones: Vec::new(),
        }
    }
}

impl GaugeConfig {
    fn color(&self, value: f64) -> &str {
        severity_color(value, self.min, self.max, &self.severity, self.severity_mode)
    }

    fn percent(&self, value: f64) -> f64 {
        geometry::percent(value, self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimaryGauge {
    #[default]
    Inner,
    Outer,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DualGaugeConfig {
    #[serde(deserialize_with = "non_empty")]
    pub name: Option<String>,
    pub gauge_size: f64,
    pub inner_gauge_size: Option<f64>,
    pub inner_gauge_radius: Option<f64>,
    /// Debounce window in milliseconds.
    pub update_interval: u64,
    pub power_save_mode: bool,
    pub debounce_updates: bool,
    pub hide_shadows: bool,
    pub primary_gauge: PrimaryGauge,
    #[serde(deserialize_with = "non_empty")]
    pub card_background: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub custom_gauge_background: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub custom_center_background: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub custom_text_color: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub custom_secondary_text_color: Option<String>,
    pub gauges: Vec<GaugeConfig>,
}

impl Default for DualGaugeConfig {
    fn default() -> Self {
        Self {
            name: None,
            gauge_size: 200.0,
            inner_gauge_size: None,
            inner_gauge_radius: None,
            update_interval: 1000,
            power_save_mode: false,
            debounce_updates: false,
            hide_shadows: false,
            primary_gauge: PrimaryGauge::Inner,
            card_background: None,
            custom_gauge_background: None,
            custom_center_background: None,
            custom_text_color: None,
            custom_secondary_text_color: None,
            gauges: Vec::new(),
        }
    }
}

impl DualGaugeConfig {
    pub fn from_value(raw: &Value) -> Result<Self, ConfigError> {
        let config: Self = config::parse(raw)?;
        if config.gauges.len() != 2 {
            return Err(ConfigError::GaugeCount(config.gauges.len()));
        }
        config::check_positive("gauge_size", config.gauge_size)?;
        for gauge in &config.gauges {
            config::require(&gauge.entity, "entity")?;
            config::check_range("min/max", gauge.min, gauge.max)?;
            if gauge.leds_count == 0 {
                return Err(ConfigError::invalid("leds_count", "at least one LED is needed"));
            }
        }
        Ok(config)
    }

    fn inner_size(&self) -> f64 {
        self.inner_gauge_size.unwrap_or(self.gauge_size * 0.65)
    }

    /// Ring radius of gauge `index`.
    fn radius(&self, index: usize) -> f64 {
        match index {
            0 => self.inner_gauge_radius.unwrap_or(self.inner_size() / 2.0),
            _ => self.gauge_size / 2.0,
        }
    }
}

/// Raw values and their 0-100 positions, inner gauge first.
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeReadings {
    pub values: [f64; 2],
    pub percents: [f64; 2],
}

impl Snapshot for GaugeReadings {
    fn differs_from(&self, previous: &Self) -> bool {
        self.percents
            .iter()
            .zip(&previous.percents)
            .any(|(now, before)| (now - before).abs() >= 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LedState {
    Active,
    Inactive,
    Hidden,
}

impl LedState {
    const CLASSES: [&'static str; 3] = ["active", "inactive", "hidden"];

    fn class(self) -> &'static str {
        match self {
            LedState::Active => "active",
            LedState::Inactive => "inactive",
            LedState::Hidden => "hidden",
        }
    }
}

#[derive(Debug, Clone)]
struct GaugeView {
    prefix: &'static str,
    leds: Vec<NodeId>,
    painted: Vec<LedState>,
    value: Option<NodeId>,
    center_shadow: Option<NodeId>,
    outer_shadow: Option<NodeId>,
    radius: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Motion {
    transition: Option<Transition>,
    shown: Option<f64>,
}

pub struct DualGaugeCard {
    config: DualGaugeConfig,
    container: Option<NodeId>,
    views: Vec<GaugeView>,
    motion: [Motion; 2],
}

/// Writes one gauge at `value`: LED classes that changed, the active colour
/// variable, the value text and the optional shadows.
fn draw(doc: &mut Document, container: NodeId, gauge: &GaugeConfig, view: &mut GaugeView, value: f64) {
    let count = view.leds.len();
    let allocation = LedAllocation::compute(value, gauge.min, gauge.max, count, gauge.bidirectional);
    let color = gauge.color(value);

    doc.set_style(container, &format!("--active-led-color-{}", view.prefix), color);
    if gauge.enable_shadow {
        doc.set_style(container, "box-shadow", format!("0 0 30px 2px {color}"));
    }

    let off = if gauge.hide_inactive_leds {
        LedState::Hidden
    } else {
        LedState::Inactive
    };
    for (index, (&led, painted)) in view.leds.iter().zip(view.painted.iter_mut()).enumerate() {
        let state = if allocation.is_lit(index, count) {
            LedState::Active
        } else {
            off
        };
        if *painted == state {
            continue;
        }
        for class in LedState::CLASSES {
            doc.set_class(led, class, class == state.class());
        }
        *painted = state;
    }

    if let Some(text) = view.value {
        doc.set_text(text, fixed(value, gauge.decimals));
    }
    if let (true, Some(shadow)) = (gauge.center_shadow, view.center_shadow) {
        doc.set_style(
            shadow,
            "box-shadow",
            format!(
                "0 0 {}px {}px {color}",
                num(gauge.center_shadow_blur),
                num(gauge.center_shadow_spread)
            ),
        );
    }
    if let (true, Some(shadow)) = (gauge.outer_shadow, view.outer_shadow) {
        let diameter = format!("{}px", num(view.radius * 2.0));
        doc.set_style(shadow, "width", &diameter);
        doc.set_style(shadow, "height", &diameter);
        doc.set_style(
            shadow,
            "box-shadow",
            format!(
                "0 0 {}px {}px {color}",
                num(gauge.outer_shadow_blur),
                num(gauge.outer_shadow_spread)
            ),
        );
    }
}

fn led_ring(prefix: &str, count: usize, radius: f64, led_size: f64, off: LedState) -> impl Iterator<Item = El> {
    let prefix = prefix.to_string();
    (0..count).map(move |i| {
        let angle = i as f64 / count as f64 * 360.0 - 90.0;
        El::new("div")
            .id(format!("led-{prefix}-{i}"))
            .class("led")
            .class(off.class())
            .attr("data-led", i)
            .style("width", format!("{}px", num(led_size)))
            .style("height", format!("{}px", num(led_size)))
            .style(
                "transform",
                format!("rotate({}deg) translate({}px)", num(angle), num(radius - led_size)),
            )
    })
}

fn markers(gauge: &GaugeConfig, radius: f64) -> Vec<El> {
    let radius = gauge.markers_radius.unwrap_or(radius);
    gauge
        .markers
        .iter()
        .flat_map(|marker| {
            let angle = value_to_angle(marker.value, gauge.min, gauge.max, gauge.bidirectional);
            let color = marker.color.as_deref().unwrap_or("#fff");
            let (x, y) = polar(0.0, 0.0, radius, angle);
            let tick = El::new("div")
                .class("marker")
                .style("background", color)
                .style(
                    "transform",
                    format!(
                        "translate({}px, {}px) translateX(-2px) translateY(-6px) rotate({}deg)",
                        num(x),
                        num(y),
                        num(angle - 90.0)
                    ),
                );
            let label = marker.label.as_deref().map(|label| {
                let (lx, ly) = polar(0.0, 0.0, radius + 10.0, angle);
                El::new("div")
                    .class("marker-label")
                    .style("color", color)
                    .style("left", format!("calc(50% + {}px)", num(lx)))
                    .style("top", format!("calc(50% + {}px)", num(ly)))
                    .text(label)
            });
            label.into_iter().chain(std::iter::once(tick))
        })
        .collect()
}

/// Arc `d` for a zone on a circle of `radius` centred in a `size` box.
pub fn zone_arc(zone: &Zone, gauge: &GaugeConfig, radius: f64, size: f64) -> String {
    let start = value_to_angle(zone.from, gauge.min, gauge.max, gauge.bidirectional);
    let end = value_to_angle(zone.to, gauge.min, gauge.max, gauge.bidirectional);
    let sweep = (end - start).rem_euclid(360.0);
    let center = size / 2.0;
    let (sx, sy) = polar(center, center, radius, start);
    let (ex, ey) = polar(center, center, radius, end);
    format!(
        "M {},{} A {},{} 0 {},1 {},{}",
        num(sx),
        num(sy),
        num(radius),
        num(radius),
        u8::from(sweep > 180.0),
        num(ex),
        num(ey)
    )
}

fn zones(gauge: &GaugeConfig, radius: f64) -> Vec<El> {
    let size = (radius + 10.0) * 2.0;
    gauge
        .zones
        .iter()
        .map(|zone| {
            El::new("svg")
                .class("zone")
                .attr("width", num(size))
                .attr("height", num(size))
                .child(
                    El::new("path")
                        .attr("d", zone_arc(zone, gauge, radius + 5.0, size))
                        .attr("fill", "none")
                        .attr("stroke", zone.color.as_deref().unwrap_or("#fff"))
                        .attr("stroke-width", 4)
                        .attr("opacity", num(zone.opacity.unwrap_or(0.5))),
                )
        })
        .collect()
}

impl DualGaugeCard {
    pub fn config(&self) -> &DualGaugeConfig {
        &self.config
    }

    fn redraw(&mut self, doc: &mut Document, index: usize, value: f64) {
        let (Some(container), Some(view), Some(gauge)) = (
            self.container,
            self.views.get_mut(index),
            self.config.gauges.get(index),
        ) else {
            return;
        };
        draw(doc, container, gauge, view, value);
    }
}

impl Card for DualGaugeCard {
    type Snapshot = GaugeReadings;

    const KIND: &'static str = "neon-dual-gauge-card";

    fn from_config(raw: &Value) -> Result<Self, ConfigError> {
        Ok(Self {
            config: DualGaugeConfig::from_value(raw)?,
            container: None,
            views: Vec::new(),
            motion: [Motion::default(); 2],
        })
    }

    fn stub_config(hass: Option<&HassState>) -> Value {
        let mut sensors = hass.map(|h| h.entities_in("sensor")).unwrap_or_default().into_iter();
        let first = sensors.next().unwrap_or("sensor.cpu_load");
        let second = sensors.next().unwrap_or("sensor.memory_use");
        json!({
            "gauges": [
                { "entity": first, "min": 0, "max": 100 },
                { "entity": second, "min": 0, "max": 100 },
            ]
        })
    }

    fn scheduling(&self) -> Scheduling {
        Scheduling {
            debounce: self
                .config
                .debounce_updates
                .then(|| Duration::from_millis(self.config.update_interval)),
            power_save: self.config.power_save_mode,
            history_refresh: None,
        }
    }

    fn observe(&self, hass: &HassState) -> Option<Update<GaugeReadings>> {
        let mut values = [0.0; 2];
        for (slot, gauge) in values.iter_mut().zip(&self.config.gauges) {
            let entity = gauge.entity.as_deref()?;
            *slot = match hass.get(entity)?.reading() {
                Reading::Number(v) => v,
                Reading::Missing(lifecycle) => return Some(Update::Unavailable(lifecycle)),
                Reading::Text(raw) => {
                    debug!("Unhandled gauge value {:?} for {}", raw, entity);
                    return None;
                }
            };
        }
        let [inner, outer] = [&self.config.gauges[0], &self.config.gauges[1]];
        Some(Update::Value(GaugeReadings {
            values,
            percents: [inner.percent(values[0]), outer.percent(values[1])],
        }))
    }

    fn render(&mut self, _ctx: &RenderContext<'_>, doc: &mut Document) {
        let c = &self.config;
        let text_color = c.custom_text_color.as_deref().unwrap_or("var(--primary-text-color)");
        let secondary_color = c
            .custom_secondary_text_color
            .as_deref()
            .unwrap_or("var(--secondary-text-color)");
        let inner_primary = c.primary_gauge == PrimaryGauge::Inner;

        let value_group = |index: usize, secondary: bool| {
            let prefix = PREFIXES[index];
            let gauge = &c.gauges[index];
            El::new("div")
                .id(format!("group-{prefix}"))
                .class("value-group")
                .class_if(secondary, "secondary")
                .attr("data-entity", gauge.entity.as_deref().unwrap_or_default())
                .child(El::new("div").id(format!("value-{prefix}")).class("value").text("0"))
                .child(
                    El::new("div")
                        .id(format!("unit-{prefix}"))
                        .class("unit")
                        .style("color", secondary_color)
                        .text(gauge.unit.clone().unwrap_or_default()),
                )
        };

        let mut gauge = El::new("div")
            .class("gauge dual-gauge")
            .style(
                "background",
                c.custom_gauge_background.as_deref().unwrap_or(
                    "radial-gradient(circle, rgba(var(--rgb-primary-color, 0, 232, 255), 0.15), rgba(var(--rgb-primary-color, 0, 232, 255), 0.05))",
                ),
            );
        for prefix in PREFIXES {
            gauge = gauge
                .child(El::new("div").id(format!("outer-shadow-{prefix}")).class("outer-shadow"))
                .child(El::new("div").id(format!("center-shadow-{prefix}")).class("center-shadow"));
        }
        for index in [1, 0] {
            let g = &c.gauges[index];
            let off = if g.hide_inactive_leds {
                LedState::Hidden
            } else {
                LedState::Inactive
            };
            gauge = gauge
                .children(led_ring(PREFIXES[index], g.leds_count, c.radius(index), g.led_size, off))
                .children(zones(g, c.radius(index)))
                .children(markers(g, c.radius(index)));
        }
        gauge = gauge.child(
            El::new("div")
                .class("center dual-center")
                .style(
                    "background",
                    c.custom_center_background.as_deref().unwrap_or(
                        "radial-gradient(circle, rgba(var(--rgb-card-background-color, 30, 20, 45), 0.95), rgba(26, 21, 37, 1))",
                    ),
                )
                .style("color", text_color)
                .child(value_group(0, !inner_primary))
                .child(value_group(1, inner_primary)),
        );

        let shadow = if c.hide_shadows { "none" } else { "0 0 15px rgba(0, 0, 0, 0.5)" };
        let tree = El::new("ha-card").child(
            El::new("div")
                .id("gauge-container")
                .class("gauge-card neon-dual-gauge-card")
                .style("--card-background", c.card_background.as_deref().unwrap_or("var(--card-background-color)"))
                .style("--gauge-size", format!("{}px", num(c.gauge_size)))
                .style("--inner-gauge-size", format!("{}px", num(c.inner_size())))
                .style("--center-size", format!("{}px", num(c.inner_size() * 0.6)))
                .style("--card-shadow", shadow)
                .child(gauge)
                .child(
                    El::new("div")
                        .class("title")
                        .style("color", text_color)
                        .text(c.name.clone().unwrap_or_default()),
                ),
        );
        doc.replace_root(tree);

        self.container = doc.find("gauge-container");
        self.views = PREFIXES
            .iter()
            .enumerate()
            .map(|(index, &prefix)| {
                let g = &self.config.gauges[index];
                let leds: Vec<NodeId> = (0..g.leds_count)
                    .filter_map(|i| doc.find(&format!("led-{prefix}-{i}")))
                    .collect();
                let off = if g.hide_inactive_leds {
                    LedState::Hidden
                } else {
                    LedState::Inactive
                };
                GaugeView {
                    prefix,
                    painted: vec![off; leds.len()],
                    leds,
                    value: doc.find(&format!("value-{prefix}")),
                    center_shadow: doc.find(&format!("center-shadow-{prefix}")),
                    outer_shadow: doc.find(&format!("outer-shadow-{prefix}")),
                    radius: self.config.radius(index),
                }
            })
            .collect();
        self.motion = [Motion::default(); 2];
    }

    fn patch(&mut self, doc: &mut Document, update: &Update<GaugeReadings>, now: Instant) {
        let Some(container) = self.container else {
            return;
        };
        let readings = match update {
            Update::Unavailable(lifecycle) => {
                self.cancel_animations();
                for view in &self.views {
                    show_lifecycle(doc, container, view.value, Some(*lifecycle));
                }
                return;
            }
            Update::Value(readings) => readings,
        };
        for view in &self.views {
            show_lifecycle(doc, container, view.value, None);
        }

        for (index, &value) in readings.values.iter().enumerate() {
            let Some(gauge) = self.config.gauges.get(index) else {
                continue;
            };
            let duration = Duration::from_millis(gauge.animation_duration);
            let motion = &mut self.motion[index];
            let animate = gauge.smooth_transitions && motion.shown.is_some_and(|shown| shown != value);
            motion.transition = match (animate, motion.transition, motion.shown) {
                (true, Some(running), _) => Some(running.retarget(value, now, duration)),
                (true, None, Some(shown)) => Some(Transition::new(shown, value, now, duration)),
                _ => None,
            };
            motion.shown = Some(value);
            if motion.transition.is_none() {
                self.redraw(doc, index, value);
            }
        }
    }

    fn animate(&mut self, doc: &mut Document, now: Instant) -> bool {
        let mut running = false;
        for index in 0..self.motion.len() {
            let Some(transition) = self.motion[index].transition else {
                continue;
            };
            self.redraw(doc, index, transition.sample(now));
            if transition.finished(now) {
                self.motion[index].transition = None;
            } else {
                running = true;
            }
        }
        running
    }

    fn cancel_animations(&mut self) {
        for motion in &mut self.motion {
            motion.transition = None;
        }
    }

    fn tap(&self, target: &str, _hass: Option<&HassState>) -> Option<CardEvent> {
        let index = PREFIXES.iter().position(|prefix| target == format!("group-{prefix}"))?;
        self.config.gauges[index].entity.as_deref().map(CardEvent::more_info)
    }

    fn card_size(&self) -> u32 {
        4
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hass::{EntityState, Lifecycle};
    use crate::theme::CssVarCache;
    use test_case::test_case;

    fn raw(inner: Value, outer: Value) -> Value {
        json!({ "name": "Serveur", "gauges": [inner, outer] })
    }

    fn card(raw: Value) -> (DualGaugeCard, Document) {
        let mut card = DualGaugeCard::from_config(&raw).unwrap();
        let mut doc = Document::new();
        let theme = CssVarCache::default();
        card.render(&RenderContext { theme: &theme, hass: None }, &mut doc);
        (card, doc)
    }

    fn readings(card: &DualGaugeCard, inner: f64, outer: f64) -> Update<GaugeReadings> {
        let hass = HassState::new()
            .with("sensor.a", EntityState::new(inner.to_string()))
            .with("sensor.b", EntityState::new(outer.to_string()));
        card.observe(&hass).unwrap()
    }

    fn count(doc: &Document, prefix: &str, class: &str) -> usize {
        doc.find_all_with(doc.root(), "data-led")
            .into_iter()
            .filter(|id| doc.attr(*id, "id").is_some_and(|s| s.starts_with(&format!("led-{prefix}-"))))
            .filter(|id| doc.has_class(*id, class))
            .count()
    }

    #[test_case(json!({}) => ConfigError::GaugeCount(0); "no gauges")]
    #[test_case(json!({ "gauges": [{ "entity": "sensor.a" }] }) => ConfigError::GaugeCount(1); "one gauge")]
    #[test_case(json!({ "gauges": [{ "entity": "sensor.a" }, {}] }) => ConfigError::MissingField("entity"); "missing entity")]
    fn rejects_bad_configs(raw: Value) -> ConfigError {
        DualGaugeConfig::from_value(&raw).unwrap_err()
    }

    #[test]
    fn defaults_fill_every_gauge() {
        let c = DualGaugeConfig::from_value(&raw(json!({ "entity": "sensor.a" }), json!({ "entity": "sensor.b" })))
            .unwrap();
        assert_eq!(c.gauge_size, 200.0);
        assert_eq!(c.update_interval, 1000);
        assert_eq!(c.gauges[1].leds_count, 100);
        assert_eq!(c.gauges[1].decimals, 1);
        assert!(c.gauges[0].smooth_transitions);
        assert_eq!(c.gauges[0].severity_mode, SeverityScale::Value);
        assert_eq!(c.radius(0), 65.0);
        assert_eq!(c.radius(1), 100.0);
    }

    #[test]
    fn leds_light_with_severity_colour() {
        let (mut card, mut doc) = card(raw(
            json!({ "entity": "sensor.a", "leds_count": 10, "smooth_transitions": false }),
            json!({ "entity": "sensor.b", "leds_count": 20, "smooth_transitions": false, "unit": "%" }),
        ));
        let update = readings(&card, 40.0, 90.0);
        card.patch(&mut doc, &update, Instant::now());

        assert_eq!(count(&doc, "inner", "active"), 4);
        assert_eq!(count(&doc, "inner", "inactive"), 6);
        assert_eq!(count(&doc, "outer", "active"), 18);
        let container = doc.find("gauge-container").unwrap();
        assert_eq!(doc.style_of(container, "--active-led-color-inner"), Some("#ff9800"));
        assert_eq!(doc.style_of(container, "--active-led-color-outer"), Some("#f44336"));
        assert_eq!(doc.text_of(doc.find("value-outer").unwrap()), Some("90.0"));
        assert_eq!(doc.text_of(doc.find("unit-outer").unwrap()), Some("%"));
    }

    #[test]
    fn repeated_patch_writes_nothing() {
        let (mut card, mut doc) = card(raw(
            json!({ "entity": "sensor.a", "leds_count": 10, "smooth_transitions": false }),
            json!({ "entity": "sensor.b", "leds_count": 10, "smooth_transitions": false }),
        ));
        let update = readings(&card, 55.0, 12.0);
        card.patch(&mut doc, &update, Instant::now());
        let before = doc.mutations();
        card.patch(&mut doc, &update, Instant::now());
        assert_eq!(doc.mutations(), before);
    }

    #[test]
    fn hidden_inactive_leds() {
        let (mut card, mut doc) = card(raw(
            json!({ "entity": "sensor.a", "leds_count": 10, "hide_inactive_leds": true, "smooth_transitions": false }),
            json!({ "entity": "sensor.b", "leds_count": 10, "smooth_transitions": false }),
        ));
        let update = readings(&card, 30.0, 30.0);
        card.patch(&mut doc, &update, Instant::now());
        assert_eq!(count(&doc, "inner", "hidden"), 7);
        assert_eq!(count(&doc, "inner", "inactive"), 0);
        assert_eq!(count(&doc, "outer", "inactive"), 7);
    }

    #[test]
    fn bidirectional_negative_values_grow_backwards() {
        let (mut card, mut doc) = card(raw(
            json!({ "entity": "sensor.a", "min": -50, "max": 50, "leds_count": 20,
                    "bidirectional": true, "smooth_transitions": false }),
            json!({ "entity": "sensor.b", "leds_count": 10, "smooth_transitions": false }),
        ));
        let update = readings(&card, -25.0, 0.0);
        card.patch(&mut doc, &update, Instant::now());
        assert_eq!(count(&doc, "inner", "active"), 5);
        let first = doc.find("led-inner-0").unwrap();
        let last = doc.find("led-inner-19").unwrap();
        let middle = doc.find("led-inner-10").unwrap();
        assert!(doc.has_class(first, "active"));
        assert!(doc.has_class(last, "active"));
        assert!(!doc.has_class(middle, "active"));
    }

    #[test]
    fn one_point_is_the_smallest_change() {
        let (card, _) = card(raw(
            json!({ "entity": "sensor.a", "max": 200 }),
            json!({ "entity": "sensor.b" }),
        ));
        let Update::Value(base) = readings(&card, 100.0, 50.0) else { unreachable!() };
        let Update::Value(small) = readings(&card, 101.0, 50.5) else { unreachable!() };
        let Update::Value(big) = readings(&card, 102.0, 50.0) else { unreachable!() };
        assert!(!small.differs_from(&base));
        assert!(big.differs_from(&base));
    }

    #[test]
    fn transitions_ease_toward_the_new_value() {
        let (mut card, mut doc) = card(raw(
            json!({ "entity": "sensor.a", "decimals": 0 }),
            json!({ "entity": "sensor.b", "decimals": 0 }),
        ));
        let t0 = Instant::now();
        let first = readings(&card, 40.0, 10.0);
        card.patch(&mut doc, &first, t0);
        assert!(!card.animate(&mut doc, t0));
        assert_eq!(doc.text_of(doc.find("value-inner").unwrap()), Some("40"));

        let second = readings(&card, 80.0, 10.0);
        card.patch(&mut doc, &second, t0);
        assert!(card.animate(&mut doc, t0 + Duration::from_millis(400)));
        assert_eq!(doc.text_of(doc.find("value-inner").unwrap()), Some("60"));
        assert!(!card.animate(&mut doc, t0 + Duration::from_millis(800)));
        assert_eq!(doc.text_of(doc.find("value-inner").unwrap()), Some("80"));
        assert_eq!(doc.text_of(doc.find("value-outer").unwrap()), Some("10"));
    }

    #[test]
    fn unavailable_dims_both_values() {
        let (mut card, mut doc) = card(raw(json!({ "entity": "sensor.a" }), json!({ "entity": "sensor.b" })));
        let hass = HassState::new()
            .with("sensor.a", EntityState::new("12"))
            .with("sensor.b", EntityState::new("unknown"));
        let update = card.observe(&hass).unwrap();
        assert_eq!(update, Update::Unavailable(Lifecycle::Unknown));
        card.patch(&mut doc, &update, Instant::now());
        assert_eq!(doc.text_of(doc.find("value-inner").unwrap()), Some("?"));
        assert_eq!(doc.text_of(doc.find("value-outer").unwrap()), Some("?"));
    }

    #[test]
    fn zone_arcs_take_the_long_way_past_half() {
        let gauge = GaugeConfig::default();
        let zone = |from, to| Zone { from, to, color: None, opacity: None };
        assert_eq!(zone_arc(&zone(0.0, 25.0), &gauge, 50.0, 120.0), "M 60,10 A 50,50 0 0,1 110,60");
        assert!(zone_arc(&zone(0.0, 75.0), &gauge, 50.0, 120.0).contains(" 0 1,1 "));
    }

    #[test]
    fn tapping_a_group_opens_its_entity() {
        let (card, _) = card(raw(json!({ "entity": "sensor.a" }), json!({ "entity": "sensor.b" })));
        assert_eq!(card.tap("group-inner", None), Some(CardEvent::more_info("sensor.a")));
        assert_eq!(card.tap("group-outer", None), Some(CardEvent::more_info("sensor.b")));
        assert_eq!(card.tap("card", None), None);
    }
}
