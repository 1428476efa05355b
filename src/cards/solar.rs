//! Solar production card: a 48-cell panel lit in proportion to output,
//! header minis, an efficiency badge and bar, night detection and a 24 h
//! production curve.

use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::card::{Card, RenderContext, Scheduling};
use crate::cards::{fixed, show_lifecycle, uid};
use crate::color::lerp_color;
use crate::config::{self, non_empty};
use crate::dom::{Document, El, NodeId};
use crate::error::ConfigError;
use crate::geometry::{self, num};
use crate::hass::{ActionConfig, CardEvent, HassState, Reading};
use crate::history::HistoryStats;
use crate::scheduler::{Snapshot, Update};

const HISTORY_REFRESH: Duration = Duration::from_secs(5 * 60);
const HISTORY_POINTS: usize = 48;
const SUN_ENTITY: &str = "sun.sun";

const MDI_SUN: &str = "M12,7A5,5 0 0,1 17,12A5,5 0 0,1 12,17A5,5 0 0,1 7,12A5,5 0 0,1 12,7M12,9A3,3 0 0,0 9,12A3,3 0 0,0 12,15A3,3 0 0,0 15,12A3,3 0 0,0 12,9M12,2L14.39,5.42C13.65,5.15 12.84,5 12,5C11.16,5 10.35,5.15 9.61,5.42L12,2M3.34,7L7.5,6.65C6.9,7.16 6.36,7.78 5.94,8.5C5.5,9.24 5.25,10 5.11,10.79L3.34,7M3.36,17L5.12,13.23C5.26,14 5.53,14.78 5.950,15.5C6.37,16.24 6.91,16.86 7.5,17.37L3.36,17M20.65,7L18.88,10.79C18.74,10 18.47,9.23 18.05,8.5C17.63,7.78 17.1,7.15 16.5,6.64L20.65,7M20.64,17L16.5,17.36C17.09,16.85 17.62,16.22 18.04,15.5C18.46,14.77 18.73,14 18.87,13.21L20.64,17M12,22L9.59,18.56C10.33,18.83 11.14,19 12,19C12.82,19 13.63,18.83 14.37,18.56L12,22Z";
const MDI_MOON: &str = "M17.75,4.09L15.22,6.03L16.13,9.09L13.5,7.28L10.87,9.09L11.78,6.03L9.25,4.09L12.44,3.93L13.5,1L14.56,3.93L17.75,4.09M21.25,11L19.61,12.25L20.2,14.23L18.5,13.06L16.8,14.23L17.39,12.25L15.75,11L17.81,10.9L18.5,9L19.19,10.9L21.25,11M18.97,15.95C19.8,15.87 20.69,17.05 20.16,17.8C19.84,18.25 19.5,18.67 19.08,19.07C15.17,23 8.84,23 4.94,19.07C1.03,15.17 1.03,8.83 4.94,4.93C5.34,4.53 5.76,4.17 6.21,3.850C6.96,3.32 8.14,4.21 8.060,5.04C7.79,7.9 8.75,10.87 10.95,13.06C13.14,15.26 16.1,16.22 18.97,15.95Z";
const MDI_PARTLY_CLOUDY: &str = "M12.74,5.47C15.1,6.5 16.35,9.03 15.92,11.46C17.19,12.56 18,14.19 18,16V16.17C18.31,16.06 18.65,16 19,16A3,3 0 0,1 22,19A3,3 0 0,1 19,22H6A4,4 0 0,1 2,18A4,4 0 0,1 6,14H6.27C5,12.45 4.6,10.24 5.5,8.26C6.72,5.5 9.970,4.24 12.74,5.47Z";
const MDI_CLOUDY: &str = "M6,19A5,5 0 0,1 1,14A5,5 0 0,1 6,9C7,6.65 9.3,5 12,5C15.43,5 18.24,7.66 18.5,11.03L19,11A4,4 0 0,1 23,15A4,4 0 0,1 19,19H6Z";
const MDI_RAINY: &str = "M6,14.03A1,1 0 0,1 7,15.03C7,15.58 6.55,16.03 6,16.03C3.24,16.03 1,13.79 1,11.03C1,8.27 3.24,6.03 6,6.03C7,3.68 9.3,2.03 12,2.03C15.43,2.03 18.24,4.69 18.5,8.06L19,8.03A4,4 0 0,1 23,12.03C23,14.23 21.21,16.03 19,16.03H18C17.45,16.03 17,15.58 17,15.03C17,14.47 17.45,14.03 18,14.03H19A2,2 0 0,0 21,12.03A2,2 0 0,0 19,10.03H17V9.03C17,6.27 14.76,4.03 12,4.03C9.5,4.03 7.45,5.84 7.06,8.21C6.73,8.09 6.37,8.03 6,8.03A3,3 0 0,0 3,11.03A3,3 0 0,0 6,14.03Z";
const MDI_SNOWY: &str = "M6,14A1,1 0 0,1 7,15A1,1 0 0,1 6,16A5,5 0 0,1 1,11A5,5 0 0,1 6,6C7,3.65 9.3,2 12,2C15.43,2 18.24,4.66 18.5,8.03L19,8A4,4 0 0,1 23,12A4,4 0 0,1 19,16H18A1,1 0 0,1 17,15A1,1 0 0,1 18,14H19A2,2 0 0,0 21,12A2,2 0 0,0 19,10H17V9A5,5 0 0,0 12,4C9.5,4 7.45,5.82 7.06,8.19C6.73,8.07 6.37,8 6,8A3,3 0 0,0 3,11A3,3 0 0,0 6,14Z";
const MDI_WINDY: &str = "M4,10A1,1 0 0,1 3,9A1,1 0 0,1 4,8H12A2,2 0 0,0 14,6A2,2 0 0,0 12,4C11.45,4 10.95,4.22 10.59,4.59C10.2,5 9.56,5 9.17,4.59C8.78,4.2 8.78,3.56 9.17,3.17C9.9,2.45 10.9,2 12,2A4,4 0 0,1 16,6A4,4 0 0,1 12,10H4M5,12H19A3,3 0 0,1 22,15A3,3 0 0,1 19,18C18.17,18 17.42,17.66 16.88,17.12C16.5,16.73 16.5,16.1 16.88,15.71C17.27,15.32 17.9,15.32 18.29,15.71C18.47,15.89 18.72,16 19,16A1,1 0 0,0 20,15A1,1 0 0,0 19,14H4A1,1 0 0,1 3,13A1,1 0 0,1 4,12H5Z";
const MDI_FOG: &str = "M3,15H13A1,1 0 0,1 14,16A1,1 0 0,1 13,17H3A1,1 0 0,1 2,16A1,1 0 0,1 3,15M16,15H21A1,1 0 0,1 22,16A1,1 0 0,1 21,17H16A1,1 0 0,1 15,16A1,1 0 0,1 16,15M1,12A5,5 0 0,1 6,7C7,4.65 9.3,3 12,3C15.43,3 18.24,5.66 18.5,9.03L19,9A4,4 0 0,1 23,13A4,4 0 0,1 19,17V15A2,2 0 0,0 21,13A2,2 0 0,0 19,11H17V10A5,5 0 0,0 12,5C9.5,5 7.45,6.82 7.06,9.19C6.73,9.07 6.37,9 6,9A3,3 0 0,0 3,12H1Z";
const MDI_LIGHTNING: &str = "M7,2V13H10V22L17,10H13L17,2H7Z";
const MDI_EXCEPTIONAL: &str = "M13,14H11V10H13M13,18H11V16H13M1,21H23L12,2L1,21Z";

/// Icon path for a weather entity state, accepting the aliases different
/// integrations report.
pub fn weather_icon(condition: &str) -> Option<&'static str> {
    let path = match condition {
        "sunny" | "clear" => MDI_SUN,
        "clear-night" | "clear_night" => MDI_MOON,
        "partlycloudy" | "partly-cloudy" | "partly_cloudy" => MDI_PARTLY_CLOUDY,
        "cloudy" => MDI_CLOUDY,
        "rainy" | "rain" | "pouring" => MDI_RAINY,
        "snowy" | "snow" | "hail" | "snowy-rainy" => MDI_SNOWY,
        "windy" | "wind" | "windy-variant" => MDI_WINDY,
        "fog" | "mist" => MDI_FOG,
        "lightning" | "lightning-rainy" | "thunderstorm" => MDI_LIGHTNING,
        "exceptional" | "tornado" | "hurricane" => MDI_EXCEPTIONAL,
        _ => return None,
    };
    Some(path)
}

/// `(x, y, w, h)` of the 24 panel modules, four rows widening toward the
/// bottom. Each module holds two cells.
const MODULES: [(f64, f64, f64, f64); 24] = [
    (36.0, 28.0, 54.0, 24.0),
    (92.0, 28.0, 54.0, 24.0),
    (148.0, 28.0, 54.0, 24.0),
    (204.0, 28.0, 54.0, 24.0),
    (260.0, 28.0, 54.0, 24.0),
    (316.0, 28.0, 54.0, 24.0),
    (32.0, 52.0, 56.0, 32.0),
    (90.0, 52.0, 56.0, 32.0),
    (148.0, 52.0, 56.0, 32.0),
    (206.0, 52.0, 56.0, 32.0),
    (264.0, 52.0, 56.0, 32.0),
    (322.0, 52.0, 56.0, 32.0),
    (26.0, 84.0, 58.0, 32.0),
    (86.0, 84.0, 58.0, 32.0),
    (146.0, 84.0, 58.0, 32.0),
    (206.0, 84.0, 58.0, 32.0),
    (266.0, 84.0, 58.0, 32.0),
    (326.0, 84.0, 58.0, 32.0),
    (20.0, 116.0, 60.0, 36.0),
    (82.0, 116.0, 60.0, 36.0),
    (144.0, 116.0, 60.0, 36.0),
    (206.0, 116.0, 60.0, 36.0),
    (268.0, 116.0, 60.0, 36.0),
    (330.0, 116.0, 60.0, 36.0),
];

const CELL_ON: &str = "0.82";
const CELL_OFF: &str = "0.07";

/// Power in watts as `1.2 kW` from 1000 W upward, `{dec}` decimals below.
pub fn format_power(watts: f64, decimals: usize) -> String {
    if watts >= 1000.0 {
        format!("{} kW", fixed(watts / 1000.0, 1))
    } else {
        format!("{} W", fixed(watts, decimals))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum InputUnit {
    #[default]
    W,
    #[serde(rename = "kW")]
    KW,
}

impl InputUnit {
    fn to_watts(self, value: f64) -> f64 {
        match self {
            InputUnit::W => value,
            InputUnit::KW => value * 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl FontSize {
    fn value_px(self) -> u32 {
        match self {
            FontSize::Small => 24,
            FontSize::Medium => 32,
            FontSize::Large => 40,
        }
    }

    fn header_px(self) -> u32 {
        match self {
            FontSize::Small => 12,
            FontSize::Medium => 15,
            FontSize::Large => 18,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SolarConfig {
    #[serde(deserialize_with = "non_empty")]
    pub entity: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub daily_entity: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub secondary_entity: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub secondary_label: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub secondary_unit: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub forecast_entity: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub luminosity_entity: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub weather_entity: Option<String>,

    pub tap_action: ActionConfig,
    pub hold_action: ActionConfig,
    pub double_tap_action: ActionConfig,

    #[serde(deserialize_with = "non_empty")]
    pub name: Option<String>,
    /// Watts at full panel.
    pub max_power: f64,
    pub input_unit: InputUnit,
    pub decimal_places: usize,
    pub animation_speed: f64,
    /// Lux below which it counts as night.
    pub night_threshold: f64,

    pub show_history: bool,
    pub show_efficiency: bool,
    pub glow_effect: bool,
    pub cyberpunk_mode: bool,
    pub neon_glow: bool,
    pub font_size: FontSize,
    pub header_font_size: FontSize,

    #[serde(deserialize_with = "non_empty")]
    pub color_primary: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub color_hot: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub color_mid: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub color_cold: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub color_text: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub color_icon: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub color_badge: Option<String>,
}

impl Default for SolarConfig {
    fn default() -> Self {
        Self {
            entity: None,
            daily_entity: None,
            secondary_entity: None,
            secondary_label: None,
            secondary_unit: None,
            forecast_entity: None,
            luminosity_entity: None,
            weather_entity: None,
            tap_action: ActionConfig::more_info(),
            hold_action: ActionConfig::more_info(),
            double_tap_action: ActionConfig::None,
            name: None,
            max_power: 5000.0,
            input_unit: InputUnit::W,
            decimal_places: 0,
            animation_speed: 1.0,
            night_threshold: 10.0,
            show_history: true,
            show_efficiency: true,
            glow_effect: true,
            cyberpunk_mode: false,
            neon_glow: false,
            font_size: FontSize::Medium,
            header_font_size: FontSize::Medium,
            color_primary: None,
            color_hot: None,
            color_mid: None,
            color_cold: None,
            color_text: None,
            color_icon: None,
            color_badge: None,
        }
    }
}

impl SolarConfig {
    pub fn from_value(raw: &Value) -> Result<Self, ConfigError> {
        let config: Self = config::parse(raw)?;
        config::require(&config.entity, "entity")?;
        config::check_positive("max_power", config.max_power)?;
        config::check_positive("animation_speed", config.animation_speed)?;
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolarReading {
    /// Always watts.
    pub power: f64,
    pub daily: Option<f64>,
    pub secondary: Option<String>,
    pub forecast: Option<f64>,
    pub lux: Option<f64>,
    pub weather: Option<String>,
    pub night: bool,
}

impl Snapshot for SolarReading {
    fn differs_from(&self, previous: &Self) -> bool {
        (self.power - previous.power).abs() >= 1.0
            || self.daily != previous.daily
            || self.secondary != previous.secondary
            || self.forecast != previous.forecast
            || self.lux != previous.lux
            || self.weather != previous.weather
            || self.night != previous.night
    }
}

/// Reductions over the 24 h production history.
#[derive(Debug, Clone, Default)]
pub struct ProductionSummary {
    pub stats: HistoryStats,
    pub peak_index: usize,
    /// Average output as a share of `max_power`, in whole percent.
    pub avg_efficiency: i64,
}

impl ProductionSummary {
    pub fn from_history(values: &[f64], max_power: f64) -> Option<Self> {
        let stats = HistoryStats::from_values(values.iter().copied())?;
        let peak_index = values
            .iter()
            .enumerate()
            .fold(0, |best, (i, v)| if *v > values[best] { i } else { best });
        Some(Self {
            stats,
            peak_index,
            avg_efficiency: (stats.avg / max_power.max(1.0) * 100.0).round() as i64,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EfficiencyBand {
    Cold,
    Mid,
    Hot,
}

impl EfficiencyBand {
    fn of(percent: f64) -> Self {
        if percent > 60.0 {
            EfficiencyBand::Hot
        } else if percent > 25.0 {
            EfficiencyBand::Mid
        } else {
            EfficiencyBand::Cold
        }
    }
}

#[derive(Debug, Clone)]
struct Colors {
    primary: String,
    hot: String,
    mid: String,
    cold: String,
    text: String,
    icon: String,
    badge: String,
    night: String,
}

impl Colors {
    fn resolve(config: &SolarConfig, ctx: &RenderContext<'_>) -> Self {
        let c = config;
        let pick = |value: &Option<String>, fallback: String| value.clone().unwrap_or(fallback);
        let (primary, hot, mid, cold, text, night) = if c.cyberpunk_mode {
            (
                pick(&c.color_primary, "#ff10f0".into()),
                pick(&c.color_hot, "#ff10f0".into()),
                pick(&c.color_mid, "#00fff9".into()),
                pick(&c.color_cold, "#7209b7".into()),
                pick(&c.color_text, "#ffffff".into()),
                "#00fff9".to_string(),
            )
        } else {
            (
                pick(&c.color_primary, ctx.theme.lookup("--primary-color", "#FFD23F")),
                pick(&c.color_hot, "#FF6B35".into()),
                pick(&c.color_mid, "#FFD23F".into()),
                pick(&c.color_cold, "#00E8FF".into()),
                pick(&c.color_text, ctx.theme.lookup("--primary-text-color", "#ffffff")),
                "#9db4ff".to_string(),
            )
        };
        Self {
            icon: pick(&c.color_icon, primary.clone()),
            badge: pick(&c.color_badge, primary.clone()),
            primary,
            hot,
            mid,
            cold,
            text,
            night,
        }
    }

    fn band(&self, band: EfficiencyBand) -> &str {
        match band {
            EfficiencyBand::Hot => &self.hot,
            EfficiencyBand::Mid => &self.mid,
            EfficiencyBand::Cold => &self.cold,
        }
    }
}

#[derive(Debug, Clone)]
struct Handles {
    card: NodeId,
    panel: Option<NodeId>,
    icon: Option<NodeId>,
    icon_path: Option<NodeId>,
    value: Option<NodeId>,
    unit: Option<NodeId>,
    daily: Option<NodeId>,
    secondary: Option<NodeId>,
    forecast: Option<NodeId>,
    forecast_unit: Option<NodeId>,
    badge: Option<NodeId>,
    bar: Option<NodeId>,
    badges: Option<NodeId>,
    night: Option<NodeId>,
    cells: Vec<NodeId>,
    spark: Option<NodeId>,
    spark_min: Option<NodeId>,
    spark_avg: Option<NodeId>,
    spark_max: Option<NodeId>,
    spark_eff: Option<NodeId>,
}

/// Last values written, so repeated patches only touch what moved.
#[derive(Debug, Clone, Default)]
struct Painted {
    ratio: Option<f64>,
    active: usize,
    glow: String,
    band: Option<EfficiencyBand>,
    badges: String,
    night: Option<bool>,
    spark: String,
}

pub struct SolarCard {
    config: SolarConfig,
    colors: Option<Colors>,
    handles: Option<Handles>,
    painted: Painted,
    history: Vec<f64>,
}

impl SolarCard {
    pub fn config(&self) -> &SolarConfig {
        &self.config
    }

    fn entity(&self) -> &str {
        self.config.entity.as_deref().unwrap_or_default()
    }

    fn is_night(&self, hass: &HassState, lux: Option<f64>) -> bool {
        match lux {
            Some(lux) => lux < self.config.night_threshold,
            None => hass.text(Some(SUN_ENTITY)) == Some("below_horizon"),
        }
    }

    /// Lights the first `round(ratio * cells)` cells. Only cells that flip
    /// state get their opacity and class touched.
    fn patch_cells(&mut self, doc: &mut Document, cells: &[NodeId], ratio: f64, colors: &Colors) {
        let active = (ratio * cells.len() as f64).round() as usize;
        let previous = self.painted.active;
        let color = if ratio > 0.005 {
            lerp_color(ratio, &colors.cold, &colors.mid, &colors.hot)
        } else {
            colors.cold.clone()
        };

        for &cell in cells.iter().take(previous.max(active)).skip(previous.min(active)) {
            let on = active > previous;
            doc.set_attr(cell, "opacity", if on { CELL_ON } else { CELL_OFF });
            doc.set_style(cell, "--co", if on { "0.7" } else { CELL_OFF });
            doc.set_class(cell, "cell-on", on);
            if !on {
                doc.set_attr(cell, "fill", &colors.cold);
            }
        }
        for &cell in cells.iter().take(active) {
            doc.set_attr(cell, "fill", &color);
        }
        self.painted.active = active;
    }

    fn patch_glow(&mut self, doc: &mut Document, handles: &Handles, ratio: f64, colors: &Colors) {
        if !self.config.glow_effect {
            return;
        }
        let (glow, amount) = if ratio > 0.02 {
            (
                lerp_color(ratio, &colors.cold, &colors.mid, &colors.hot),
                (6.0 + ratio * 18.0).round(),
            )
        } else {
            (colors.primary.clone(), 6.0)
        };
        let key = format!("{}:{}", num(amount), glow);
        if key == self.painted.glow {
            return;
        }
        let neon = self.config.neon_glow;
        if let Some(panel) = handles.panel {
            let filter = if neon {
                format!(
                    "drop-shadow(0 0 4px {glow}) drop-shadow(0 8px {}px {glow}80)",
                    num((amount * 1.6).round())
                )
            } else {
                format!("drop-shadow(0 8px {}px {glow}50)", num(amount))
            };
            doc.set_style(panel, "filter", filter);
        }
        let shadow = if ratio > 0.03 {
            let spread = (ratio * if neon { 40.0 } else { 24.0 }).round();
            format!("0 0 {}px {glow}{}", num(spread), if neon { "50" } else { "28" })
        } else {
            String::new()
        };
        doc.set_style(handles.card, "box-shadow", shadow);
        self.painted.glow = key;
    }

    fn patch_night(&mut self, doc: &mut Document, handles: &Handles, night: bool, colors: &Colors) {
        if let Some(overlay) = handles.night {
            doc.set_attr(overlay, "opacity", if night { "0.6" } else { "0" });
        }
        if self.painted.night == Some(night) {
            return;
        }
        if let Some(path) = handles.icon_path {
            doc.set_attr(path, "d", if night { MDI_MOON } else { MDI_SUN });
        }
        if let Some(icon) = handles.icon {
            doc.set_style(icon, "color", if night { &colors.night } else { &colors.icon });
        }
        self.painted.night = Some(night);
    }

    fn patch_badges(&mut self, doc: &mut Document, handles: &Handles, reading: &SolarReading, colors: &Colors) {
        let Some(zone) = handles.badges else {
            return;
        };
        let weather = reading.weather.as_deref().and_then(|condition| {
            let icon = weather_icon(condition);
            if icon.is_none() {
                warn!("Unknown weather condition {:?}, no badge shown", condition);
            }
            icon
        });
        let key = format!("{}|{}", reading.weather.as_deref().unwrap_or_default(), reading.night);
        if key == self.painted.badges {
            return;
        }
        let badge = |fill: &str, d: &str| {
            El::new("svg")
                .class("badge")
                .attr("viewBox", "0 0 24 24")
                .child(El::new("path").attr("fill", fill).attr("d", d))
        };
        let badges: Vec<El> = weather
            .map(|d| badge(&colors.badge, d))
            .into_iter()
            .chain(reading.night.then(|| badge(&colors.night, MDI_MOON)))
            .collect();
        doc.replace_children(zone, badges);
        self.painted.badges = key;
    }
}

/// Smooth cubic path through `points`, control points at 38 % of the
/// horizontal gap.
fn smooth_path(points: &[(f64, f64)]) -> String {
    let Some(&(x0, y0)) = points.first() else {
        return String::new();
    };
    let mut path = format!("M {} {}", num(x0), num(y0));
    for pair in points.windows(2) {
        let [(px, py), (x, y)] = [pair[0], pair[1]];
        let cp = (x - px) * 0.38;
        path.push_str(&format!(
            " C {:.1} {}, {:.1} {}, {} {}",
            px + cp,
            num(py),
            x - cp,
            num(y),
            num(x),
            num(y)
        ));
    }
    path
}

fn production_svg(values: &[f64], summary: &ProductionSummary, colors: &Colors, decimals: usize) -> El {
    const WIDTH: f64 = 360.0;
    const HEIGHT: f64 = 36.0;
    const PAD_Y: f64 = 10.0;
    let HistoryStats { min, max, .. } = summary.stats;
    let range = (max - min).max(0.1);
    let n = values.len().saturating_sub(1).max(1) as f64;
    let points: Vec<(f64, f64)> = values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            (
                (i as f64 / n * WIDTH).round(),
                PAD_Y + (HEIGHT * (1.0 - (v - min) / range)).round(),
            )
        })
        .collect();
    let line = smooth_path(&points);
    let area = format!("{line} L {} {} L 0 {} Z", num(WIDTH), num(PAD_Y + HEIGHT), num(PAD_Y + HEIGHT));
    let (peak_x, peak_y) = points.get(summary.peak_index).copied().unwrap_or_default();
    let gradient = uid("nsc");

    let axis = [("T-24", 0.0), ("T-18", 0.25), ("T-12", 0.5), ("T-6", 0.75), ("NOW", 1.0)]
        .into_iter()
        .map(|(label, at)| {
            El::new("text")
                .attr("x", num(WIDTH * at))
                .attr("y", num(PAD_Y + HEIGHT + 15.0))
                .attr_if(label == "NOW", "font-weight", "700")
                .text(label)
        });

    El::new("svg")
        .attr("viewBox", format!("0 0 {} {}", num(WIDTH), num(PAD_Y + HEIGHT + 22.0)))
        .attr("width", "100%")
        .child(
            El::new("defs").child(
                El::new("linearGradient")
                    .id(&gradient)
                    .attr("x1", 0)
                    .attr("y1", 0)
                    .attr("x2", 0)
                    .attr("y2", 1)
                    .child(El::new("stop").attr("offset", "0%").attr("stop-color", &colors.hot).attr("stop-opacity", "0.38"))
                    .child(El::new("stop").attr("offset", "100%").attr("stop-color", &colors.hot).attr("stop-opacity", "0.02")),
            ),
        )
        .child(El::new("path").attr("d", area).attr("fill", format!("url(#{gradient})")))
        .child(
            El::new("path")
                .class("spark-line")
                .attr("d", line)
                .attr("fill", "none")
                .attr("stroke", &colors.hot)
                .attr("stroke-width", 2),
        )
        .child(
            El::new("circle")
                .class("peak")
                .attr("cx", num(peak_x))
                .attr("cy", num(peak_y))
                .attr("r", "3.5")
                .attr("fill", &colors.hot),
        )
        .child(
            El::new("text")
                .class("peak-label")
                .attr("x", num(peak_x.clamp(24.0, WIDTH - 38.0)))
                .attr("y", num((peak_y - 8.0).max(PAD_Y + 8.0)))
                .attr("fill", &colors.hot)
                .attr("text-anchor", "middle")
                .text(format!("▲ {}", format_power(max, decimals))),
        )
        .child(
            El::new("g")
                .class("axis")
                .attr("fill", &colors.primary)
                .attr("opacity", "0.4")
                .children(axis),
        )
}

fn panel_svg(id: &str, cold: &str) -> El {
    let outline = "M18 152 L382 152 L364 28 L36 28 Z";
    let cells = MODULES.iter().enumerate().flat_map(|(i, &(x, y, w, h))| {
        let half = h * 0.47;
        let cell = |index: usize, cy: f64, delay: f64| {
            El::new("rect")
                .attr("data-ci", index)
                .attr("x", num(x))
                .attr("y", format!("{cy:.1}"))
                .attr("width", num(w))
                .attr("height", format!("{half:.1}"))
                .attr("rx", 1)
                .attr("fill", cold)
                .attr("opacity", CELL_OFF)
                .style("animation-delay", format!("{delay:.2}s"))
        };
        [
            cell(i * 2, y, i as f64 * 0.07),
            cell(i * 2 + 1, y + h * 0.53, i as f64 * 0.07 + 0.035),
        ]
    });

    El::new("svg")
        .id(format!("{id}-svg"))
        .attr("viewBox", "0 0 400 180")
        .attr("width", "100%")
        .child(
            El::new("defs")
                .child(
                    El::new("linearGradient")
                        .id(format!("{id}-bg"))
                        .attr("x1", "0%")
                        .attr("y1", "0%")
                        .attr("x2", "0%")
                        .attr("y2", "100%")
                        .child(El::new("stop").attr("offset", "0%").attr("stop-color", "#1e1e1e"))
                        .child(El::new("stop").attr("offset", "100%").attr("stop-color", "#060606")),
                )
                .child(
                    El::new("linearGradient")
                        .id(format!("{id}-glare"))
                        .attr("x1", "0%")
                        .attr("y1", "0%")
                        .attr("x2", "90%")
                        .attr("y2", "100%")
                        .child(El::new("stop").attr("offset", "0%").attr("stop-color", "#ffffff").attr("stop-opacity", "0.13"))
                        .child(El::new("stop").attr("offset", "55%").attr("stop-color", "#ffffff").attr("stop-opacity", "0")),
                ),
        )
        .child(El::new("path").attr("d", "M10 160 L390 160 L370 20 L30 20 Z").attr("fill", "#000"))
        .child(El::new("path").attr("d", outline).attr("fill", format!("url(#{id}-bg)")))
        .child(El::new("g").id(format!("{id}-cells")).children(cells))
        .child(El::new("path").attr("d", outline).attr("fill", format!("url(#{id}-glare)")))
        .child(
            El::new("path")
                .id("night-overlay")
                .attr("d", outline)
                .attr("fill", "#000820")
                .attr("opacity", "0"),
        )
}

impl Card for SolarCard {
    type Snapshot = SolarReading;

    const KIND: &'static str = "neon-solar-card";

    fn from_config(raw: &Value) -> Result<Self, ConfigError> {
        Ok(Self {
            config: SolarConfig::from_value(raw)?,
            colors: None,
            handles: None,
            painted: Painted::default(),
            history: Vec::new(),
        })
    }

    fn stub_config(hass: Option<&HassState>) -> Value {
        let entity = hass
            .and_then(|h| h.entities_in("sensor").into_iter().find(|id| id.contains("solar")))
            .unwrap_or("sensor.solar_power");
        json!({
            "entity": entity,
            "daily_entity": "sensor.solar_energy_today",
            "name": "Production Solaire",
            "max_power": 5000,
            "show_history": true,
            "show_efficiency": true,
        })
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

    fn history_capacity(&self) -> usize {
        HISTORY_POINTS
    }

    fn observe(&self, hass: &HassState) -> Option<Update<SolarReading>> {
        let c = &self.config;
        let power = match hass.get(self.entity())?.reading() {
            Reading::Number(v) => c.input_unit.to_watts(v),
            Reading::Missing(lifecycle) => return Some(Update::Unavailable(lifecycle)),
            Reading::Text(raw) => {
                debug!("Unhandled solar power {:?} for {}", raw, self.entity());
                return None;
            }
        };
        let lux = hass.number(c.luminosity_entity.as_deref());
        Some(Update::Value(SolarReading {
            power,
            daily: hass.number(c.daily_entity.as_deref()),
            secondary: hass.text(c.secondary_entity.as_deref()).map(str::to_string),
            forecast: hass.number(c.forecast_entity.as_deref()),
            weather: hass.text(c.weather_entity.as_deref()).map(str::to_string),
            night: self.is_night(hass, lux),
            lux,
        }))
    }

    fn render(&mut self, ctx: &RenderContext<'_>, doc: &mut Document) {
        let c = &self.config;
        let colors = Colors::resolve(c, ctx);
        let svg_id = uid("nsc");
        let value_px = c.font_size.value_px();

        let mini = |id: &str, entity: &str, label: String, value: El| {
            El::new("div")
                .id(id)
                .class("hdr-mini")
                .attr("data-entity", entity)
                .child(El::new("div").class("hdr-mini-label").text(label))
                .child(value)
        };
        let daily = c.daily_entity.as_deref().map(|entity| {
            mini(
                "hdr-daily",
                entity,
                "TODAY".to_string(),
                El::new("div").id("daily-val").class("hdr-mini-value").text("-- kWh"),
            )
        });
        let secondary = c.secondary_entity.as_deref().map(|entity| {
            mini(
                "hdr-secondary",
                entity,
                c.secondary_label.as_deref().unwrap_or("SENSOR").to_uppercase(),
                El::new("div")
                    .class("hdr-mini-value")
                    .child(El::new("span").id("sec-val").text("--"))
                    .child(El::new("span").text(c.secondary_unit.clone().unwrap_or_default())),
            )
        });
        let forecast = c.forecast_entity.as_deref().map(|entity| {
            mini(
                "hdr-forecast",
                entity,
                "FORECAST".to_string(),
                El::new("div")
                    .class("hdr-mini-value")
                    .child(El::new("span").id("forecast-val").text("--"))
                    .child(El::new("span").id("forecast-unit").text("W")),
            )
        });

        let spark_stat = |id: &str, label: &str, class: Option<&str>| {
            let value = El::new("span").id(id).class("ss-val").text("--");
            El::new("div")
                .class("spark-stat")
                .child(El::new("span").class("ss-label").text(label))
                .child(match class {
                    Some(class) => value.class(class),
                    None => value,
                })
        };

        let tree = El::new("ha-card")
            .id("card")
            .class("neon-solar")
            .class_if(c.cyberpunk_mode, "cyberpunk")
            .attr("role", "button")
            .attr("tabindex", 0)
            .attr("aria-label", format!("{} card", c.name.as_deref().unwrap_or("Solar Production")))
            .style("--nsc-pulse", format!("{:.1}s", 2.0 / c.animation_speed))
            .child(
                El::new("div")
                    .class("hdr")
                    .child(
                        El::new("svg")
                            .id("hdr-icon")
                            .class("hdr-icon")
                            .attr("viewBox", "0 0 24 24")
                            .style("color", &colors.icon)
                            .child(El::new("path").id("hdr-icon-path").attr("fill", "currentColor").attr("d", MDI_SUN)),
                    )
                    .child(
                        El::new("div")
                            .class("hdr-title")
                            .style("font-size", format!("{}px", c.header_font_size.header_px()))
                            .style("color", &colors.text)
                            .text(c.name.clone().unwrap_or_else(|| "Production Solaire".to_string())),
                    )
                    .child(El::new("div").id("badges").class("badges"))
                    .child(
                        El::new("div")
                            .class("hdr-right")
                            .children(daily)
                            .children(secondary)
                            .children(forecast)
                            .child_if(c.show_efficiency, || El::new("div").id("eff-badge").class("eff-badge").text("-- %")),
                    ),
            )
            .child(
                El::new("div")
                    .id("panel-wrap")
                    .class("panel-wrap")
                    .child(panel_svg(&svg_id, &colors.cold))
                    .child(
                        El::new("div")
                            .class("val-overlay")
                            .child(
                                El::new("div")
                                    .id("val-main")
                                    .class("val-main")
                                    .style("font-size", format!("{value_px}px"))
                                    .text("--"),
                            )
                            .child(
                                El::new("div")
                                    .id("val-unit")
                                    .class("val-unit")
                                    .style("font-size", format!("{}px", (value_px as f64 * 0.375).round().max(10.0)))
                                    .text("W"),
                            ),
                    ),
            )
            .child_if(c.show_efficiency, || {
                El::new("div")
                    .class("eff-bar-wrap")
                    .child(El::new("div").id("eff-bar").class("eff-bar").style("width", "0%"))
            })
            .child_if(c.show_history, || {
                El::new("div")
                    .class("spark-section")
                    .child(
                        El::new("div")
                            .class("spark-header")
                            .child(El::new("span").class("spark-hdr-label").text("ANALYSE 24H"))
                            .child(El::new("span").id("spark-eff").class("spark-hdr-right").text("EFF. -- %")),
                    )
                    .child(
                        El::new("div")
                            .class("spark-stats")
                            .child(spark_stat("sp-min", "MIN", Some("cold")))
                            .child(spark_stat("sp-avg", "AVG", None))
                            .child(spark_stat("sp-max", "MAX", Some("hot"))),
                    )
                    .child(El::new("div").id("zone-spark"))
            });

        let card = doc.replace_root(tree);
        let cells = doc
            .find(&format!("{svg_id}-cells"))
            .map(|scope| doc.find_all_with(scope, "data-ci"))
            .unwrap_or_default();
        self.handles = Some(Handles {
            card,
            panel: doc.find("panel-wrap"),
            icon: doc.find("hdr-icon"),
            icon_path: doc.find("hdr-icon-path"),
            value: doc.find("val-main"),
            unit: doc.find("val-unit"),
            daily: doc.find("daily-val"),
            secondary: doc.find("sec-val"),
            forecast: doc.find("forecast-val"),
            forecast_unit: doc.find("forecast-unit"),
            badge: doc.find("eff-badge"),
            bar: doc.find("eff-bar"),
            badges: doc.find("badges"),
            night: doc.find("night-overlay"),
            cells,
            spark: doc.find("zone-spark"),
            spark_min: doc.find("sp-min"),
            spark_avg: doc.find("sp-avg"),
            spark_max: doc.find("sp-max"),
            spark_eff: doc.find("spark-eff"),
        });
        self.colors = Some(colors);
        self.painted = Painted::default();
    }

    fn patch(&mut self, doc: &mut Document, update: &Update<SolarReading>, _now: Instant) {
        let (Some(handles), Some(colors)) = (self.handles.clone(), self.colors.clone()) else {
            return;
        };
        let reading = match update {
            Update::Unavailable(lifecycle) => {
                show_lifecycle(doc, handles.card, handles.value, Some(*lifecycle));
                if let Some(unit) = handles.unit {
                    doc.set_text(unit, lifecycle.as_str());
                }
                return;
            }
            Update::Value(reading) => reading,
        };
        show_lifecycle(doc, handles.card, handles.value, None);
        let c = &self.config;
        let ratio = geometry::ratio(reading.power, 0.0, c.max_power.max(1.0));

        let (shown, unit) = if reading.power >= 1000.0 {
            (fixed(reading.power / 1000.0, c.decimal_places.max(1)), "kW")
        } else {
            (fixed(reading.power, c.decimal_places), "W")
        };
        if let Some(value) = handles.value {
            doc.set_text(value, shown);
        }
        if let Some(unit_el) = handles.unit {
            doc.set_text(unit_el, unit);
        }

        if let (Some(daily_el), Some(daily)) = (handles.daily, reading.daily) {
            doc.set_text(daily_el, format!("{} kWh", fixed(daily, 1)));
        }
        if let (Some(sec_el), Some(sec)) = (handles.secondary, &reading.secondary) {
            doc.set_text(sec_el, sec.clone());
        }
        if let (Some(forecast_el), Some(forecast)) = (handles.forecast, reading.forecast) {
            let kw = forecast >= 1000.0;
            doc.set_text(
                forecast_el,
                if kw { fixed(forecast / 1000.0, 1) } else { fixed(forecast, 0) },
            );
            if let Some(unit_el) = handles.forecast_unit {
                doc.set_text(unit_el, if kw { "kW" } else { "W" });
            }
        }

        let efficiency = (ratio * 100.0).round();
        if let Some(badge) = handles.badge {
            doc.set_text(badge, format!("{}%", num(efficiency)));
            let band = EfficiencyBand::of(efficiency);
            if self.painted.band != Some(band) {
                let color = colors.band(band);
                doc.set_style(badge, "color", color);
                doc.set_style(badge, "background", format!("{color}1a"));
                doc.set_style(badge, "border", format!("1px solid {color}50"));
                self.painted.band = Some(band);
            }
        }
        if let Some(bar) = handles.bar {
            doc.set_style(bar, "width", format!("{}%", num(efficiency)));
        }

        if self.painted.ratio.is_none_or(|last| (ratio - last).abs() >= 0.01) {
            self.patch_cells(doc, &handles.cells, ratio, &colors);
            self.painted.ratio = Some(ratio);
        }
        self.patch_glow(doc, &handles, ratio, &colors);
        self.patch_night(doc, &handles, reading.night, &colors);
        self.patch_badges(doc, &handles, reading, &colors);
        self.patch_history(doc);
    }

    fn set_history(&mut self, _entity_id: &str, values: Vec<f64>) {
        let unit = self.config.input_unit;
        self.history = values.into_iter().map(|v| unit.to_watts(v)).collect();
    }

    fn patch_history(&mut self, doc: &mut Document) {
        let (Some(handles), Some(colors)) = (&self.handles, &self.colors) else {
            return;
        };
        let Some(zone) = handles.spark else {
            return;
        };
        let key = crate::history::fingerprint(&self.history);
        if key.is_empty() || key == self.painted.spark {
            return;
        }
        let Some(summary) = ProductionSummary::from_history(&self.history, self.config.max_power) else {
            return;
        };
        let decimals = self.config.decimal_places;
        let stats = summary.stats;
        for (id, value) in [
            (handles.spark_min, stats.min),
            (handles.spark_avg, stats.avg),
            (handles.spark_max, stats.max),
        ] {
            if let Some(id) = id {
                doc.set_text(id, format_power(value, decimals));
            }
        }
        if let Some(eff) = handles.spark_eff {
            doc.set_text(eff, format!("AVG EFF. {}%", summary.avg_efficiency));
        }
        let svg = production_svg(&self.history, &summary, colors, decimals);
        doc.replace_children(zone, vec![svg]);
        self.painted.spark = key;
    }

    /// `target` is an element id; `hold` and `double-tap` stand for those
    /// gestures on the card body.
    fn tap(&self, target: &str, _hass: Option<&HassState>) -> Option<CardEvent> {
        let c = &self.config;
        let card_entity = Some(self.entity());
        match target {
            "hdr-daily" => c.daily_entity.as_deref().map(CardEvent::more_info),
            "hdr-secondary" => c.secondary_entity.as_deref().map(CardEvent::more_info),
            "hdr-forecast" => c.forecast_entity.as_deref().map(CardEvent::more_info),
            "hold" => c.hold_action.resolve(card_entity),
            "double-tap" => c.double_tap_action.resolve(card_entity),
            _ => c.tap_action.resolve(card_entity),
        }
    }

    fn card_size(&self) -> u32 {
        if self.config.show_history { 5 } else { 3 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hass::{EntityState, Lifecycle};
    use crate::theme::CssVarCache;
    use test_case::test_case;

    fn card(raw: Value) -> (SolarCard, Document) {
        let mut card = SolarCard::from_config(&raw).unwrap();
        let mut doc = Document::new();
        let theme = CssVarCache::default();
        card.render(&RenderContext { theme: &theme, hass: None }, &mut doc);
        (card, doc)
    }

    fn reading(power: f64) -> Update<SolarReading> {
        Update::Value(SolarReading {
            power,
            daily: None,
            secondary: None,
            forecast: None,
            lux: None,
            weather: None,
            night: false,
        })
    }

    fn lit(doc: &Document) -> usize {
        doc.find_all_with(doc.root(), "data-ci")
            .into_iter()
            .filter(|id| doc.has_class(*id, "cell-on"))
            .count()
    }

    #[test]
    fn config_defaults() {
        let c = SolarConfig::from_value(&json!({ "entity": "sensor.pv" })).unwrap();
        assert_eq!(c.max_power, 5000.0);
        assert_eq!(c.input_unit, InputUnit::W);
        assert_eq!(c.tap_action, ActionConfig::more_info());
        assert_eq!(c.double_tap_action, ActionConfig::None);
        let c = SolarConfig::from_value(&json!({ "entity": "sensor.pv", "input_unit": "kW" })).unwrap();
        assert_eq!(c.input_unit, InputUnit::KW);
        assert_eq!(
            SolarConfig::from_value(&json!({})).err(),
            Some(ConfigError::MissingField("entity"))
        );
    }

    #[test_case(950.0, 0 => "950 W"; "watts")]
    #[test_case(2345.0, 0 => "2.3 kW"; "kilowatts")]
    #[test_case(12.34, 1 => "12.3 W"; "decimals")]
    fn power_formatting(watts: f64, decimals: usize) -> String {
        format_power(watts, decimals)
    }

    #[test]
    fn cells_light_in_proportion_and_patch_by_delta() {
        let (mut card, mut doc) = card(json!({ "entity": "sensor.pv", "show_history": false }));
        card.patch(&mut doc, &reading(2500.0), Instant::now());
        assert_eq!(lit(&doc), 24);
        assert_eq!(doc.text_of(doc.find("val-main").unwrap()), Some("2.5"));
        assert_eq!(doc.text_of(doc.find("val-unit").unwrap()), Some("kW"));
        assert_eq!(doc.text_of(doc.find("eff-badge").unwrap()), Some("50%"));

        card.patch(&mut doc, &reading(1300.0), Instant::now());
        assert_eq!(lit(&doc), 12);
        assert_eq!(doc.text_of(doc.find("val-main").unwrap()), Some("1.3"));

        card.patch(&mut doc, &reading(300.0), Instant::now());
        assert_eq!(doc.text_of(doc.find("val-unit").unwrap()), Some("W"));
        assert_eq!(doc.text_of(doc.find("val-main").unwrap()), Some("300"));
    }

    #[test]
    fn kilowatt_sensors_are_normalized() {
        let (card, _) = card(json!({ "entity": "sensor.pv", "input_unit": "kW" }));
        let hass = HassState::new().with("sensor.pv", EntityState::new("1.5"));
        match card.observe(&hass) {
            Some(Update::Value(reading)) => assert_eq!(reading.power, 1500.0),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn one_watt_is_the_smallest_change() {
        let Update::Value(a) = reading(1000.0) else { unreachable!() };
        let b = SolarReading { power: 1000.6, ..a.clone() };
        let c = SolarReading { power: 1001.0, ..a.clone() };
        assert!(!b.differs_from(&a));
        assert!(c.differs_from(&a));
    }

    #[test]
    fn night_follows_lux_then_sun() {
        let (card, _) = card(json!({ "entity": "sensor.pv", "luminosity_entity": "sensor.lux" }));
        let dark = HassState::new()
            .with("sensor.pv", EntityState::new("0"))
            .with("sensor.lux", EntityState::new("4"));
        assert!(card.is_night(&dark, Some(4.0)));
        assert!(!card.is_night(&dark, Some(40.0)));

        let sun_down = HassState::new().with(SUN_ENTITY, EntityState::new("below_horizon"));
        assert!(card.is_night(&sun_down, None));
        assert!(!card.is_night(&HassState::new(), None));
    }

    #[test]
    fn night_swaps_icon_and_adds_badge() {
        let (mut card, mut doc) = card(json!({ "entity": "sensor.pv" }));
        let update = Update::Value(SolarReading {
            power: 0.0,
            daily: Some(12.34),
            secondary: None,
            forecast: None,
            lux: Some(1.0),
            weather: Some("cloudy".to_string()),
            night: true,
        });
        card.patch(&mut doc, &update, Instant::now());
        let path = doc.find("hdr-icon-path").unwrap();
        assert_eq!(doc.attr(path, "d"), Some(MDI_MOON));
        let badges = doc.find("badges").unwrap();
        assert_eq!(doc.children_of(badges).len(), 2);
        assert_eq!(doc.attr(doc.find("night-overlay").unwrap(), "opacity"), Some("0.6"));
    }

    #[test]
    fn unavailable_shows_lifecycle_in_unit() {
        let (mut card, mut doc) = card(json!({ "entity": "sensor.pv" }));
        card.patch(&mut doc, &Update::Unavailable(Lifecycle::Unavailable), Instant::now());
        assert_eq!(doc.text_of(doc.find("val-main").unwrap()), Some("—"));
        assert_eq!(doc.text_of(doc.find("val-unit").unwrap()), Some("unavailable"));
    }

    #[test]
    fn history_summary_and_average_efficiency() {
        let (mut card, mut doc) = card(json!({ "entity": "sensor.pv", "max_power": 4000 }));
        card.set_history("sensor.pv", vec![0.0, 1000.0, 3000.0, 2000.0]);
        card.patch_history(&mut doc);
        assert_eq!(doc.text_of(doc.find("sp-max").unwrap()), Some("3.0 kW"));
        assert_eq!(doc.text_of(doc.find("sp-min").unwrap()), Some("0 W"));
        assert_eq!(doc.text_of(doc.find("spark-eff").unwrap()), Some("AVG EFF. 38%"));
        let summary = ProductionSummary::from_history(&card.history, 4000.0).unwrap();
        assert_eq!(summary.peak_index, 2);
    }

    #[test]
    fn taps_route_by_gesture() {
        let (card, _) = card(json!({
            "entity": "sensor.pv",
            "daily_entity": "sensor.today",
            "double_tap_action": { "action": "navigate", "navigation_path": "/energy" },
        }));
        assert_eq!(card.tap("card", None), Some(CardEvent::more_info("sensor.pv")));
        assert_eq!(card.tap("hdr-daily", None), Some(CardEvent::more_info("sensor.today")));
        assert_eq!(
            card.tap("double-tap", None),
            Some(CardEvent::Navigate { path: "/energy".into() })
        );
    }
}
