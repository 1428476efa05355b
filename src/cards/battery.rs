//! EV battery card: fill level, charge state, off-peak pricing, solar
//! surplus and a confirm-guarded charge switch.

use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::animation::Transition;
use crate::card::{Card, RenderContext, Scheduling};
use crate::cards::{fixed, show_lifecycle, uid};
use crate::config::{self, non_empty};
use crate::dom::{Document, El, NodeId};
use crate::error::ConfigError;
use crate::geometry::num;
use crate::hass::{CardEvent, HassState, Reading};
use crate::scheduler::{Snapshot, Update};

const VIEW_W: f64 = 160.0;
const VIEW_H: f64 = 250.0;
const BODY_X: f64 = 18.0;
const BODY_Y: f64 = 40.0;
const BODY_W: f64 = VIEW_W - 30.0;
const BODY_H: f64 = VIEW_H - 58.0;
const INNER_X: f64 = BODY_X + 7.0;
const INNER_Y: f64 = BODY_Y + 7.0;
const INNER_W: f64 = BODY_W - 14.0;
const INNER_H: f64 = BODY_H - 14.0;

/// Fill rect `(y, height)` for a charge level in percent. Never thinner
/// than 2 units so an empty battery still shows a sliver.
pub fn fill_rect(level: f64) -> (f64, f64) {
    let level = level.clamp(0.0, 100.0);
    let height = (level * INNER_H / 100.0).round().max(2.0);
    (INNER_Y + INNER_H - height, height)
}

/// Time to reach `target` percent at `power_w`, as `{h}h{mm}m` or `{m}m`.
pub fn time_left(level: f64, target: f64, capacity_kwh: f64, power_w: f64) -> Option<String> {
    if power_w <= 0.0 {
        return None;
    }
    let hours = ((target - level) * capacity_kwh / 100.0 / (power_w / 1000.0)).max(0.0);
    let total_minutes = (hours * 60.0).round() as u64;
    let (h, m) = (total_minutes / 60, total_minutes % 60);
    Some(if h > 0 { format!("{h}h{m:02}m") } else { format!("{m}m") })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatteryTap {
    #[default]
    MoreInfo,
    None,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatteryConfig {
    #[serde(deserialize_with = "non_empty")]
    pub entity: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub charging_entity: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub power_entity: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub price_entity: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub surplus_entity: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub surplus_min_entity: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub max_target_entity: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub smart_charging_entity: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub solar_charging_entity: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub charge_switch_entity: Option<String>,

    #[serde(deserialize_with = "non_empty")]
    pub name: Option<String>,
    pub kwh_capacity: f64,
    pub show_kwh: bool,
    pub show_ticks: bool,
    pub font_size_percent: f64,
    pub font_size_ticks: f64,
    pub hc_label_on: String,
    pub hc_label_off: String,
    pub hc_state_value: String,
    pub tap_action: BatteryTap,

    #[serde(deserialize_with = "non_empty")]
    pub color_primary: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub color_accent: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub color_percent: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub color_fill_top: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub color_fill_mid: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub color_fill_bottom: Option<String>,

    pub smooth_transitions: bool,
    /// Milliseconds.
    pub animation_duration: u64,
    pub power_save_mode: bool,
    pub debounce_updates: bool,
    /// Milliseconds.
    pub update_interval: u64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            entity: None,
            charging_entity: None,
            power_entity: None,
            price_entity: None,
            surplus_entity: None,
            surplus_min_entity: None,
            max_target_entity: None,
            smart_charging_entity: None,
            solar_charging_entity: None,
            charge_switch_entity: None,
            name: None,
            kwh_capacity: 77.0,
            show_kwh: true,
            show_ticks: true,
            font_size_percent: 38.0,
            font_size_ticks: 11.0,
            hc_label_on: "HEURE CREUSE".to_string(),
            hc_label_off: "HEURE PLEINE".to_string(),
            hc_state_value: "HEURE CREUSE".to_string(),
            tap_action: BatteryTap::MoreInfo,
            color_primary: None,
            color_accent: None,
            color_percent: None,
            color_fill_top: None,
            color_fill_mid: None,
            color_fill_bottom: None,
            smooth_transitions: true,
            animation_duration: 800,
            power_save_mode: false,
            debounce_updates: false,
            update_interval: 500,
        }
    }
}

impl BatteryConfig {
    pub fn from_value(raw: &Value) -> Result<Self, ConfigError> {
        let config: Self = config::parse(raw)?;
        config::require(&config.entity, "entity")?;
        config::check_positive("kwh_capacity", config.kwh_capacity)?;
        config::check_positive("font_size_percent", config.font_size_percent)?;
        config::check_positive("font_size_ticks", config.font_size_ticks)?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeMode {
    Solar,
    AutoOffPeak,
    Manual,
}

impl ChargeMode {
    /// Only meaningful while charging.
    pub fn of(reading: &BatteryReading) -> Option<Self> {
        if !reading.charging {
            return None;
        }
        Some(if reading.solar_on && reading.has_surplus() {
            ChargeMode::Solar
        } else if reading.smart_on && reading.off_peak {
            ChargeMode::AutoOffPeak
        } else {
            ChargeMode::Manual
        })
    }

    pub fn label(self) -> &'static str {
        match self {
            ChargeMode::Solar => "☀ SOLAR",
            ChargeMode::AutoOffPeak => "⚡ AUTO HC",
            ChargeMode::Manual => "🔌 MANUEL",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatteryReading {
    pub level: f64,
    pub charging: bool,
    pub power: f64,
    pub max_target: f64,
    pub surplus: f64,
    pub surplus_min: f64,
    pub off_peak: bool,
    pub smart_on: bool,
    pub solar_on: bool,
    pub switch_on: bool,
}

impl BatteryReading {
    pub fn has_surplus(&self) -> bool {
        self.surplus >= self.surplus_min
    }
}

impl Snapshot for BatteryReading {
    fn differs_from(&self, previous: &Self) -> bool {
        self != previous
    }
}

#[derive(Debug, Clone)]
struct Colors {
    primary: String,
    off_peak: String,
    peak: String,
    dim: String,
}

#[derive(Debug, Clone)]
struct Handles {
    card: NodeId,
    fill: Option<NodeId>,
    shine: Option<NodeId>,
    strip: Option<NodeId>,
    bolt: Option<NodeId>,
    ring: Option<NodeId>,
    percent: Option<NodeId>,
    pill: Option<NodeId>,
    pill_icon: Option<NodeId>,
    pill_label: Option<NodeId>,
    surplus: Option<NodeId>,
    kwh: Option<NodeId>,
    power: Option<NodeId>,
    time: Option<NodeId>,
    mode: Option<NodeId>,
    button: Option<NodeId>,
    button_icon: Option<NodeId>,
    button_label: Option<NodeId>,
}

pub struct BatteryCard {
    config: BatteryConfig,
    colors: Option<Colors>,
    handles: Option<Handles>,
    transition: Option<Transition>,
    shown_level: Option<f64>,
    switch_on: bool,
}

impl BatteryCard {
    pub fn config(&self) -> &BatteryConfig {
        &self.config
    }

    fn entity(&self) -> &str {
        self.config.entity.as_deref().unwrap_or_default()
    }

    fn animation(&self) -> Duration {
        Duration::from_millis(self.config.animation_duration)
    }

    fn percent_text(level: f64) -> String {
        format!("{}%", num(level.round()))
    }

    fn patch_level(&mut self, doc: &mut Document, handles: &Handles, level: f64, now: Instant) {
        let (y, height) = fill_rect(level);
        for rect in [handles.fill, handles.shine, handles.strip].into_iter().flatten() {
            doc.set_attr(rect, "y", num(y));
        }
        for rect in [handles.fill, handles.shine].into_iter().flatten() {
            doc.set_attr(rect, "height", num(height));
        }

        let animate = self.config.smooth_transitions
            && self.shown_level.is_some_and(|shown| shown != level);
        if animate {
            let transition = match (&self.transition, self.shown_level) {
                (Some(running), _) => running.retarget(level, now, self.animation()),
                (None, Some(shown)) => Transition::new(shown, level, now, self.animation()),
                (None, None) => Transition::new(level, level, now, Duration::ZERO),
            };
            self.transition = Some(transition);
        } else {
            self.transition = None;
            if let Some(percent) = handles.percent {
                doc.set_text(percent, Self::percent_text(level));
            }
        }
        self.shown_level = Some(level);
    }
}

fn battery_svg(config: &BatteryConfig, ctx: &RenderContext<'_>, primary: &str) -> El {
    let theme = ctx.theme;
    let accent = config
        .color_accent
        .clone()
        .unwrap_or_else(|| theme.lookup("--state-active-color", "#FF50A0"));
    let fill_top = config
        .color_fill_top
        .clone()
        .unwrap_or_else(|| theme.lookup("--primary-color", "#00E8FF"));
    let fill_mid = config
        .color_fill_mid
        .clone()
        .unwrap_or_else(|| theme.lookup("--state-active-color", "#FF50A0"));
    let fill_bottom = config
        .color_fill_bottom
        .clone()
        .unwrap_or_else(|| theme.lookup("--accent-color", "#E946FF"));
    let percent_color = config.color_percent.as_deref().unwrap_or(primary);

    let id = uid("nb");
    let (fill_y, fill_h) = fill_rect(0.0);
    let mid_x = BODY_X + BODY_W / 2.0;

    let stop = |offset: &str, color: &str, opacity: &str| {
        El::new("stop")
            .attr("offset", offset)
            .attr("stop-color", color)
            .attr("stop-opacity", opacity)
    };

    let ticks = [(0.25, 75), (0.5, 50), (0.75, 25)].into_iter().flat_map(|(at, label)| {
        let y = format!("{:.1}", INNER_Y + INNER_H * at);
        [
            El::new("line")
                .attr("x1", num(INNER_X + 3.0))
                .attr("x2", num(INNER_X + INNER_W - 3.0))
                .attr("y1", &y)
                .attr("y2", &y)
                .attr("stroke", "#070B14")
                .attr("stroke-width", "1.5"),
            El::new("text")
                .attr("x", num(BODY_X + BODY_W + 6.0))
                .attr("y", &y)
                .attr("fill", primary)
                .attr("font-size", num(config.font_size_ticks))
                .attr("opacity", "0.7")
                .text(label.to_string()),
        ]
    });

    let corners = [
        (BODY_X, BODY_Y + 16.0, BODY_X, BODY_Y + 5.0, BODY_X + 14.0),
        (BODY_X + BODY_W, BODY_Y + 16.0, BODY_X + BODY_W, BODY_Y + 5.0, BODY_X + BODY_W - 14.0),
        (BODY_X, BODY_Y + BODY_H - 16.0, BODY_X, BODY_Y + BODY_H - 5.0, BODY_X + 14.0),
        (
            BODY_X + BODY_W,
            BODY_Y + BODY_H - 16.0,
            BODY_X + BODY_W,
            BODY_Y + BODY_H - 5.0,
            BODY_X + BODY_W - 14.0,
        ),
    ]
    .into_iter()
    .map(|(x1, y1, x2, y2, x3)| {
        El::new("polyline")
            .class("corner")
            .attr(
                "points",
                format!("{},{} {},{} {},{}", num(x1), num(y1), num(x2), num(y2), num(x3), num(y2)),
            )
            .attr("fill", "none")
            .attr("stroke", &accent)
            .attr("stroke-width", "2.6")
    });

    let bolt = [
        (8.0, 24.0),
        (-7.0, 48.0),
        (1.0, 48.0),
        (-9.0, 68.0),
        (11.0, 42.0),
        (4.0, 42.0),
        (14.0, 24.0),
    ]
    .iter()
    .map(|(dx, dy)| format!("{},{}", num(mid_x + dx), num(BODY_Y + dy)))
    .collect::<Vec<_>>()
    .join(" ");

    El::new("svg")
        .attr("viewBox", format!("0 0 {} {}", num(VIEW_W), num(VIEW_H)))
        .attr("width", num(VIEW_W))
        .attr("height", num(VIEW_H))
        .child(
            El::new("defs")
                .child(
                    El::new("linearGradient")
                        .id(format!("{id}f"))
                        .attr("x1", 0)
                        .attr("y1", 1)
                        .attr("x2", 0)
                        .attr("y2", 0)
                        .child(stop("0%", &fill_bottom, "0.95"))
                        .child(stop("45%", &fill_mid, "0.9"))
                        .child(stop("100%", &fill_top, "0.88")),
                )
                .child(
                    El::new("linearGradient")
                        .id(format!("{id}sh"))
                        .attr("x1", 0)
                        .attr("y1", 0)
                        .attr("x2", 1)
                        .attr("y2", 0)
                        .child(stop("0%", "white", "0.18"))
                        .child(stop("100%", "white", "0.02")),
                )
                .child(
                    El::new("clipPath").id(format!("{id}c")).child(
                        El::new("rect")
                            .attr("x", num(INNER_X))
                            .attr("y", num(INNER_Y))
                            .attr("width", num(INNER_W))
                            .attr("height", num(INNER_H))
                            .attr("rx", 4),
                    ),
                ),
        )
        .child(
            El::new("rect")
                .id("ring")
                .attr("x", num(BODY_X - 4.0))
                .attr("y", num(BODY_Y - 4.0))
                .attr("width", num(BODY_W + 8.0))
                .attr("height", num(BODY_H + 8.0))
                .attr("rx", 16)
                .attr("fill", "none")
                .attr("stroke", primary)
                .attr("stroke-opacity", "0.08"),
        )
        .child(
            El::new("rect")
                .class("terminal")
                .attr("x", num(mid_x - 19.0))
                .attr("y", num(BODY_Y - 17.0))
                .attr("width", 38)
                .attr("height", 21)
                .attr("rx", 7)
                .attr("fill", "#0D1A28")
                .attr("stroke", primary),
        )
        .child(
            El::new("rect")
                .class("body")
                .attr("x", num(BODY_X))
                .attr("y", num(BODY_Y))
                .attr("width", num(BODY_W))
                .attr("height", num(BODY_H))
                .attr("rx", 11)
                .attr("fill", "#0D1A28")
                .attr("stroke", primary)
                .attr("stroke-width", "2.2"),
        )
        .child(
            El::new("g")
                .attr("clip-path", format!("url(#{id}c)"))
                .child(
                    El::new("rect")
                        .id("fill")
                        .attr("x", num(INNER_X))
                        .attr("y", num(fill_y))
                        .attr("width", num(INNER_W))
                        .attr("height", num(fill_h))
                        .attr("rx", 3)
                        .attr("fill", format!("url(#{id}f)")),
                )
                .child(
                    El::new("rect")
                        .id("fill-shine")
                        .attr("x", num(INNER_X))
                        .attr("y", num(fill_y))
                        .attr("width", num((INNER_W * 0.38).round()))
                        .attr("height", num(fill_h))
                        .attr("rx", 3)
                        .attr("fill", format!("url(#{id}sh)")),
                )
                .child(
                    El::new("rect")
                        .id("charge-strip")
                        .attr("x", num(INNER_X))
                        .attr("y", num(fill_y))
                        .attr("width", num(INNER_W))
                        .attr("height", 3)
                        .attr("fill", "white")
                        .style("display", "none"),
                ),
        )
        .children(config.show_ticks.then(|| ticks.collect::<Vec<_>>()).into_iter().flatten())
        .children(corners)
        .child(
            El::new("text")
                .id("batt-text")
                .attr("x", num(mid_x))
                .attr("y", num(BODY_Y + BODY_H / 2.0 + 6.0))
                .attr("fill", percent_color)
                .attr("font-size", num(config.font_size_percent))
                .attr("font-weight", "700")
                .attr("text-anchor", "middle")
                .text("--"),
        )
        .child(
            El::new("polygon")
                .id("bolt")
                .attr("points", bolt)
                .attr("fill", primary)
                .style("display", "none"),
        )
}

impl Card for BatteryCard {
    type Snapshot = BatteryReading;

    const KIND: &'static str = "neon-battery-card";

    fn from_config(raw: &Value) -> Result<Self, ConfigError> {
        let config = BatteryConfig::from_value(raw)?;
        Ok(Self {
            switch_on: false,
            config,
            colors: None,
            handles: None,
            transition: None,
            shown_level: None,
        })
    }

    fn stub_config(hass: Option<&HassState>) -> Value {
        let entity = hass
            .and_then(|h| h.entities_in("sensor").into_iter().find(|id| id.contains("battery")))
            .unwrap_or("sensor.ev_battery_level");
        json!({
            "entity": entity,
            "charging_entity": "sensor.ev_charging_state",
            "power_entity": "sensor.ev_charging_power",
            "charge_switch_entity": "switch.ev_charging",
            "kwh_capacity": 77,
            "name": "EV",
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

    fn observe(&self, hass: &HassState) -> Option<Update<BatteryReading>> {
        let c = &self.config;
        let level = match hass.get(self.entity())?.reading() {
            Reading::Number(v) => v,
            Reading::Missing(lifecycle) => return Some(Update::Unavailable(lifecycle)),
            Reading::Text(raw) => {
                debug!("Unhandled battery level {:?} for {}", raw, self.entity());
                return None;
            }
        };
        Some(Update::Value(BatteryReading {
            level,
            charging: hass.text(c.charging_entity.as_deref()) == Some("charging"),
            power: hass.number(c.power_entity.as_deref()).unwrap_or(0.0),
            max_target: hass.number(c.max_target_entity.as_deref()).unwrap_or(100.0),
            surplus: hass.number(c.surplus_entity.as_deref()).unwrap_or(0.0),
            surplus_min: hass.number(c.surplus_min_entity.as_deref()).unwrap_or(0.0),
            off_peak: hass.text(c.price_entity.as_deref()) == Some(c.hc_state_value.as_str()),
            smart_on: hass.is_on(c.smart_charging_entity.as_deref()),
            solar_on: hass.is_on(c.solar_charging_entity.as_deref()),
            switch_on: hass.is_on(c.charge_switch_entity.as_deref()),
        }))
    }

    fn render(&mut self, ctx: &RenderContext<'_>, doc: &mut Document) {
        let c = &self.config;
        let colors = Colors {
            primary: c
                .color_primary
                .clone()
                .unwrap_or_else(|| ctx.theme.lookup("--primary-color", "#00E8FF")),
            off_peak: ctx.theme.lookup("--primary-color", "#00E8FF"),
            peak: ctx.theme.lookup("--state-active-color", "#FF0090"),
            dim: ctx.theme.lookup("--secondary-text-color", "#5A6A78"),
        };

        let button = c.charge_switch_entity.is_some().then(|| {
            El::new("div").class("btn-row").child(
                El::new("button")
                    .id("charge-btn")
                    .class("btn")
                    .class("charge-btn")
                    .class("btn-off")
                    .class("charge-off")
                    .attr("data-on", "0")
                    .attr("aria-pressed", "false")
                    .child(El::new("span").id("charge-icon").class("btn-icon").text("▶"))
                    .child(El::new("span").id("charge-label").class("btn-label").text("START CHARGE")),
            )
        });

        let tree = El::new("ha-card")
            .id("card")
            .class("neon-battery")
            .attr("role", "meter")
            .attr("aria-valuemin", 0)
            .attr("aria-valuemax", 100)
            .attr_if(c.tap_action == BatteryTap::MoreInfo, "tabindex", 0)
            .child(El::new("div").class("car-name").text(c.name.clone().unwrap_or_default()))
            .child(
                El::new("div")
                    .class("top-row")
                    .child(
                        El::new("div")
                            .id("hc-pill")
                            .class("pill")
                            .style("color", &colors.peak)
                            .child(El::new("span").id("hc-icon").text("☀️"))
                            .child(El::new("span").id("hc-label").class("pill-label").text(c.hc_label_off.clone())),
                    )
                    .child(
                        El::new("div")
                            .class("surplus")
                            .child(El::new("span").text("☀️"))
                            .child(El::new("span").id("surplus-val").class("surplus-val").text("--")),
                    ),
            )
            .child(
                El::new("div")
                    .class("battery-wrap")
                    .child(battery_svg(c, ctx, &colors.primary)),
            )
            .child(
                El::new("div")
                    .class("info-bar")
                    .child_if(c.show_kwh, || El::new("span").id("kwh-val").text("--"))
                    .child(El::new("span").id("power-badge").class("power-badge").text("⚡ --"))
                    .child(El::new("span").id("time-val").class("time-val")),
            )
            .child(
                El::new("div")
                    .class("mode-wrap")
                    .child(El::new("span").id("mode-val").class("mode-inner")),
            )
            .children(button);

        let card = doc.replace_root(tree);
        self.handles = Some(Handles {
            card,
            fill: doc.find("fill"),
            shine: doc.find("fill-shine"),
            strip: doc.find("charge-strip"),
            bolt: doc.find("bolt"),
            ring: doc.find("ring"),
            percent: doc.find("batt-text"),
            pill: doc.find("hc-pill"),
            pill_icon: doc.find("hc-icon"),
            pill_label: doc.find("hc-label"),
            surplus: doc.find("surplus-val"),
            kwh: doc.find("kwh-val"),
            power: doc.find("power-badge"),
            time: doc.find("time-val"),
            mode: doc.find("mode-val"),
            button: doc.find("charge-btn"),
            button_icon: doc.find("charge-icon"),
            button_label: doc.find("charge-label"),
        });
        self.colors = Some(colors);
        self.transition = None;
        self.shown_level = None;
    }

    fn patch(&mut self, doc: &mut Document, update: &Update<BatteryReading>, now: Instant) {
        let (Some(handles), Some(colors)) = (self.handles.clone(), self.colors.clone()) else {
            return;
        };
        let reading = match update {
            Update::Unavailable(lifecycle) => {
                self.transition = None;
                show_lifecycle(doc, handles.card, handles.percent, Some(*lifecycle));
                return;
            }
            Update::Value(reading) => reading,
        };
        let c = &self.config;
        show_lifecycle(doc, handles.card, handles.percent, None);

        let kwh = reading.level * c.kwh_capacity / 100.0;
        doc.set_attr(handles.card, "aria-valuenow", num(reading.level));
        doc.set_attr(
            handles.card,
            "aria-valuetext",
            format!("{}% - {} kWh", num(reading.level), fixed(kwh, 1)),
        );
        doc.set_class(handles.card, "charging", reading.charging);

        let charging_display = if reading.charging { "" } else { "none" };
        for id in [handles.bolt, handles.strip].into_iter().flatten() {
            doc.set_style(id, "display", charging_display);
        }
        if let Some(ring) = handles.ring {
            doc.set_attr(ring, "stroke-opacity", if reading.charging { "0.3" } else { "0.08" });
        }

        if let Some(pill) = handles.pill {
            doc.set_style(pill, "color", if reading.off_peak { &colors.off_peak } else { &colors.peak });
        }
        if let Some(icon) = handles.pill_icon {
            doc.set_text(icon, if reading.off_peak { "🌙" } else { "☀️" });
        }
        if let Some(label) = handles.pill_label {
            let text = if reading.off_peak { &c.hc_label_on } else { &c.hc_label_off };
            doc.set_text(label, text.clone());
        }
        if let Some(surplus) = handles.surplus {
            doc.set_text(surplus, format!("{}W", num(reading.surplus)));
            doc.set_style(surplus, "color", if reading.has_surplus() { &colors.primary } else { &colors.dim });
        }

        if let Some(kwh_val) = handles.kwh {
            doc.set_text(kwh_val, format!("{} kWh / {} kWh", fixed(kwh, 1), num(c.kwh_capacity)));
        }
        if let Some(power) = handles.power {
            doc.set_text(power, format!("⚡ {}W", num(reading.power)));
        }
        if let Some(time) = handles.time {
            let left = reading
                .charging
                .then(|| time_left(reading.level, reading.max_target, c.kwh_capacity, reading.power))
                .flatten();
            doc.set_text(time, left.map(|t| format!("⏱ {t}")).unwrap_or_default());
        }
        if let Some(mode) = handles.mode {
            doc.set_text(mode, ChargeMode::of(reading).map(ChargeMode::label).unwrap_or_default());
        }

        if let Some(button) = handles.button {
            let on = reading.switch_on;
            doc.set_attr(button, "data-on", if on { "1" } else { "0" });
            doc.set_attr(button, "aria-pressed", on);
            doc.set_class(button, "btn-on", on);
            doc.set_class(button, "charge-on", on);
            doc.set_class(button, "btn-off", !on);
            doc.set_class(button, "charge-off", !on);
            if let Some(icon) = handles.button_icon {
                doc.set_text(icon, if on { "⏹" } else { "▶" });
            }
            if let Some(label) = handles.button_label {
                doc.set_text(label, if on { "STOP CHARGE" } else { "START CHARGE" });
            }
        }
        self.switch_on = reading.switch_on;

        self.patch_level(doc, &handles, reading.level, now);
    }

    fn animate(&mut self, doc: &mut Document, now: Instant) -> bool {
        let Some(transition) = self.transition else {
            return false;
        };
        if let Some(percent) = self.handles.as_ref().and_then(|h| h.percent) {
            doc.set_text(percent, Self::percent_text(transition.sample(now)));
        }
        if transition.finished(now) {
            self.transition = None;
            return false;
        }
        true
    }

    fn cancel_animations(&mut self) {
        self.transition = None;
    }

    fn tap(&self, target: &str, hass: Option<&HassState>) -> Option<CardEvent> {
        if target == "charge-btn" {
            let switch = self.config.charge_switch_entity.as_deref()?;
            let on = hass.map_or(self.switch_on, |h| h.is_on(Some(switch)));
            let text = if on {
                "⚠️ Arrêter la charge manuellement ?"
            } else {
                "⚡ Démarrer la charge manuellement ?"
            };
            return Some(CardEvent::Confirm {
                text: text.to_string(),
                then: Box::new(CardEvent::toggle(switch)),
            });
        }
        match self.config.tap_action {
            BatteryTap::MoreInfo => Some(CardEvent::more_info(self.entity())),
            BatteryTap::None => None,
        }
    }

    fn card_size(&self) -> u32 {
        6
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hass::{EntityState, Lifecycle};
    use crate::theme::CssVarCache;
    use test_case::test_case;

    fn card(raw: Value) -> (BatteryCard, Document) {
        let mut card = BatteryCard::from_config(&raw).unwrap();
        let mut doc = Document::new();
        let theme = CssVarCache::default();
        card.render(&RenderContext { theme: &theme, hass: None }, &mut doc);
        (card, doc)
    }

    fn hass(level: &str) -> HassState {
        HassState::new()
            .with("sensor.batt", EntityState::new(level))
            .with("sensor.charging", EntityState::new("charging"))
            .with("sensor.power", EntityState::new("11000"))
            .with("sensor.price", EntityState::new("HEURE CREUSE"))
            .with("input_boolean.smart", EntityState::new("on"))
            .with("switch.charge", EntityState::new("off"))
    }

    fn full_config() -> Value {
        json!({
            "entity": "sensor.batt",
            "charging_entity": "sensor.charging",
            "power_entity": "sensor.power",
            "price_entity": "sensor.price",
            "smart_charging_entity": "input_boolean.smart",
            "charge_switch_entity": "switch.charge",
            "smooth_transitions": false,
        })
    }

    #[test]
    fn config_defaults_and_validation() {
        assert_eq!(
            BatteryConfig::from_value(&json!({ "kwh_capacity": 50 })).err(),
            Some(ConfigError::MissingField("entity"))
        );
        let c = BatteryConfig::from_value(&json!({ "entity": "sensor.batt" })).unwrap();
        assert_eq!(c.kwh_capacity, 77.0);
        assert_eq!(c.animation_duration, 800);
        assert_eq!(c.tap_action, BatteryTap::MoreInfo);
        assert_eq!(c.hc_label_off, "HEURE PLEINE");
        assert!(BatteryConfig::from_value(&json!({ "entity": "sensor.batt", "kwh_capacity": 0 })).is_err());
        let c = BatteryConfig::from_value(&json!({ "entity": "sensor.batt", "tap_action": "none" })).unwrap();
        assert_eq!(c.tap_action, BatteryTap::None);
    }

    #[test_case(0.0 => (223.0, 2.0); "empty keeps a sliver")]
    #[test_case(50.0 => (136.0, 89.0); "half")]
    #[test_case(100.0 => (47.0, 178.0); "full")]
    #[test_case(140.0 => (47.0, 178.0); "clamped")]
    fn fill_geometry(level: f64) -> (f64, f64) {
        fill_rect(level)
    }

    #[test_case(50.0, 80.0, 77.0, 11000.0 => Some("2h06m".to_string()); "hours and minutes")]
    #[test_case(78.0, 80.0, 77.0, 11000.0 => Some("8m".to_string()); "minutes only")]
    #[test_case(50.0, 80.0, 77.0, 0.0 => None; "no power")]
    #[test_case(90.0, 80.0, 77.0, 7000.0 => Some("0m".to_string()); "past the target")]
    fn charge_time(level: f64, target: f64, kwh: f64, power: f64) -> Option<String> {
        time_left(level, target, kwh, power)
    }

    #[test]
    fn patch_fills_and_reports_mode() {
        let (mut card, mut doc) = card(full_config());
        let update = card.observe(&hass("50")).unwrap();
        card.patch(&mut doc, &update, Instant::now());

        let fill = doc.find("fill").unwrap();
        assert_eq!(doc.attr(fill, "height"), Some("89"));
        assert_eq!(doc.text_of(doc.find("batt-text").unwrap()), Some("50%"));
        assert_eq!(doc.text_of(doc.find("mode-val").unwrap()), Some("⚡ AUTO HC"));
        assert_eq!(doc.text_of(doc.find("hc-label").unwrap()), Some("HEURE CREUSE"));
        assert_eq!(doc.text_of(doc.find("kwh-val").unwrap()), Some("38.5 kWh / 77 kWh"));
        assert_eq!(doc.text_of(doc.find("time-val").unwrap()), Some("⏱ 3h30m"));
        assert_eq!(doc.style_of(doc.find("bolt").unwrap(), "display"), None);
    }

    #[test]
    fn percent_eases_toward_the_new_level() {
        let mut raw = full_config();
        raw["smooth_transitions"] = json!(true);
        let (mut card, mut doc) = card(raw);
        let start = Instant::now();
        card.patch(&mut doc, &card.observe(&hass("20")).unwrap(), start);
        let text = doc.find("batt-text").unwrap();
        assert_eq!(doc.text_of(text), Some("20%"));

        card.patch(&mut doc, &card.observe(&hass("80")).unwrap(), start);
        assert!(card.animate(&mut doc, start + Duration::from_millis(400)));
        assert_eq!(doc.text_of(text), Some("50%"));
        assert!(!card.animate(&mut doc, start + Duration::from_millis(800)));
        assert_eq!(doc.text_of(text), Some("80%"));
        assert!(!card.animate(&mut doc, start + Duration::from_secs(2)));
    }

    #[test]
    fn unavailable_level_dims_the_card() {
        let (mut card, mut doc) = card(full_config());
        card.patch(&mut doc, &Update::Unavailable(Lifecycle::Unknown), Instant::now());
        assert_eq!(doc.text_of(doc.find("batt-text").unwrap()), Some("?"));
        assert!(doc.has_class(doc.find("card").unwrap(), "unavailable"));
    }

    #[test]
    fn charge_button_asks_before_toggling() {
        let (card, _) = card(full_config());
        let event = card.tap("charge-btn", Some(&hass("50"))).unwrap();
        match event {
            CardEvent::Confirm { text, then } => {
                assert!(text.contains("Démarrer"));
                assert_eq!(*then, CardEvent::toggle("switch.charge"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(card.tap("card", None), Some(CardEvent::more_info("sensor.batt")));
    }

    #[test]
    fn button_reflects_switch_state() {
        let (mut card, mut doc) = card(full_config());
        let mut state = hass("50");
        state.set("switch.charge", "on");
        card.patch(&mut doc, &card.observe(&state).unwrap(), Instant::now());
        let button = doc.find("charge-btn").unwrap();
        assert!(doc.has_class(button, "btn-on"));
        assert!(!doc.has_class(button, "btn-off"));
        assert_eq!(doc.text_of(doc.find("charge-label").unwrap()), Some("STOP CHARGE"));
    }

    #[test]
    fn text_levels_are_skipped() {
        let (card, _) = card(full_config());
        assert!(card.observe(&hass("charging")).is_none());
        assert!(card.observe(&HassState::new()).is_none());
    }
}
