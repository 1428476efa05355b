//! Static section header. Renders once from its configuration; entity state
//! never reaches it.

use std::time::Instant;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::card::{Card, RenderContext};
use crate::color::Rgb;
use crate::config::{self, non_empty};
use crate::dom::{Document, El};
use crate::error::ConfigError;
use crate::hass::{CardEvent, HassState};
use crate::scheduler::{Snapshot, Update};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconPosition {
    #[default]
    Left,
    Right,
    Top,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignH {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignV {
    Top,
    #[default]
    Center,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeaderTap {
    #[default]
    None,
    Navigate,
    MoreInfo,
}

/// `bg_blur` accepts a flag or a length.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Blur {
    Flag(bool),
    Px(f64),
    Length(String),
}

impl Default for Blur {
    fn default() -> Self {
        Blur::Flag(false)
    }
}

impl Blur {
    fn css(&self) -> Option<String> {
        match self {
            Blur::Flag(true) => Some("8px".to_string()),
            Blur::Flag(false) => None,
            Blur::Px(px) if *px > 0.0 => Some(format!("{px}px")),
            Blur::Px(_) => None,
            Blur::Length(s) if s.is_empty() || s == "0" => None,
            Blur::Length(s) if s.contains("px") => Some(s.clone()),
            Blur::Length(s) => Some(format!("{s}px")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeaderConfig {
    pub title: String,
    #[serde(deserialize_with = "non_empty")]
    pub subtitle: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub icon: Option<String>,
    pub icon_position: IconPosition,

    #[serde(deserialize_with = "non_empty")]
    pub font_family: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub font_size: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub font_size_sub: Option<String>,
    pub font_weight: Option<Value>,
    pub italic: bool,
    pub uppercase: bool,
    #[serde(deserialize_with = "non_empty")]
    pub letter_spacing: Option<String>,
    pub align_h: AlignH,
    pub align_v: AlignV,
    #[serde(deserialize_with = "non_empty")]
    pub color: Option<String>,

    #[serde(deserialize_with = "non_empty")]
    pub icon_size: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub icon_color: Option<String>,

    #[serde(deserialize_with = "non_empty")]
    pub bg_color: Option<String>,
    pub bg_opacity: Option<f64>,
    pub bg_blur: Blur,

    #[serde(deserialize_with = "non_empty")]
    pub border_color: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub border_width: Option<String>,
    pub border_style: String,
    #[serde(deserialize_with = "non_empty")]
    pub border_radius: Option<String>,

    pub effect_glow: bool,
    #[serde(deserialize_with = "non_empty")]
    pub effect_glow_color: Option<String>,
    pub effect_glow_size: f64,
    pub effect_scanline: bool,
    pub effect_gradient: bool,
    #[serde(deserialize_with = "non_empty")]
    pub effect_gradient_from: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub effect_gradient_to: Option<String>,
    pub effect_typing: bool,
    pub effect_flicker: bool,

    #[serde(deserialize_with = "non_empty")]
    pub padding: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub min_height: Option<String>,
    pub tap_action: HeaderTap,
    #[serde(deserialize_with = "non_empty")]
    pub navigation_path: Option<String>,
    #[serde(deserialize_with = "non_empty")]
    pub entity: Option<String>,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            subtitle: None,
            icon: None,
            icon_position: IconPosition::Left,
            font_family: None,
            font_size: None,
            font_size_sub: None,
            font_weight: None,
            italic: false,
            uppercase: false,
            letter_spacing: None,
            align_h: AlignH::Left,
            align_v: AlignV::Center,
            color: None,
            icon_size: None,
            icon_color: None,
            bg_color: None,
            bg_opacity: None,
            bg_blur: Blur::default(),
            border_color: None,
            border_width: None,
            border_style: "solid".to_string(),
            border_radius: None,
            effect_glow: false,
            effect_glow_color: None,
            effect_glow_size: 12.0,
            effect_scanline: false,
            effect_gradient: false,
            effect_gradient_from: None,
            effect_gradient_to: None,
            effect_typing: false,
            effect_flicker: false,
            padding: None,
            min_height: None,
            tap_action: HeaderTap::None,
            navigation_path: None,
            entity: None,
        }
    }
}

impl HeaderConfig {
    pub fn from_value(raw: &Value) -> Result<Self, ConfigError> {
        let config: Self = config::parse(raw)?;
        match config.bg_opacity {
            Some(opacity) if !(0.0..=1.0).contains(&opacity) => {
                Err(ConfigError::invalid("bg_opacity", format!("{opacity} is outside 0-1")))
            }
            _ => Ok(config),
        }
    }

    fn font_weight(&self) -> String {
        match &self.font_weight {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => "var(--ha-card-header-font-weight, 500)".to_string(),
        }
    }

    /// Background declaration, present only when a colour or opacity is set.
    fn background(&self) -> Option<String> {
        match (&self.bg_color, self.bg_opacity) {
            (Some(color), opacity) => match Rgb::parse(color) {
                Some(Rgb(r, g, b)) if color.len() == 7 => {
                    Some(format!("rgba({r},{g},{b},{})", opacity.unwrap_or(1.0)))
                }
                _ => Some(color.clone()),
            },
            (None, Some(opacity)) => Some(format!(
                "rgba(var(--rgb-card-background-color, 255,255,255), {opacity})"
            )),
            (None, None) => None,
        }
    }

    fn border(&self) -> Option<String> {
        let custom = self.border_color.is_some() || self.border_width.is_some() || self.border_style != "solid";
        custom.then(|| {
            format!(
                "{} {} {}",
                self.border_width.as_deref().unwrap_or("1px"),
                self.border_style,
                self.border_color.as_deref().unwrap_or("var(--divider-color)")
            )
        })
    }
}

/// The header has nothing to observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Static;

impl Snapshot for Static {
    fn differs_from(&self, _previous: &Self) -> bool {
        false
    }
}

pub struct HeaderCard {
    config: HeaderConfig,
}

impl HeaderCard {
    pub fn config(&self) -> &HeaderConfig {
        &self.config
    }
}

impl Card for HeaderCard {
    type Snapshot = Static;

    const KIND: &'static str = "neon-header-card";

    fn from_config(raw: &Value) -> Result<Self, ConfigError> {
        Ok(Self {
            config: HeaderConfig::from_value(raw)?,
        })
    }

    fn stub_config(_hass: Option<&HassState>) -> Value {
        json!({ "title": "Mon Dashboard", "icon": "mdi:home", "align_h": "left" })
    }

    fn observe(&self, _hass: &HassState) -> Option<Update<Static>> {
        None
    }

    fn render(&mut self, _ctx: &RenderContext<'_>, doc: &mut Document) {
        let c = &self.config;
        let text_color = c
            .color
            .clone()
            .unwrap_or_else(|| "var(--ha-card-header-color, var(--primary-text-color))".to_string());
        let glow_color = c.effect_glow_color.clone().unwrap_or_else(|| text_color.clone());
        let glow = c.effect_glow_size;
        let font_family = match &c.font_family {
            Some(family) => format!("'{family}', var(--primary-font-family, sans-serif)"),
            None => "var(--primary-font-family, var(--ha-card-header-font-family, sans-serif))".to_string(),
        };
        let font_size = c.font_size.as_deref().unwrap_or("var(--ha-card-header-font-size, 24px)");
        let letter_spacing = c.letter_spacing.as_deref().unwrap_or("normal");

        let (direction, gap) = match c.icon_position {
            IconPosition::Left => ("row", "10px"),
            IconPosition::Right => ("row-reverse", "10px"),
            IconPosition::Top => ("column", "6px"),
        };
        let justify = match c.align_h {
            AlignH::Left => "flex-start",
            AlignH::Center => "center",
            AlignH::Right => "flex-end",
        };
        let align_items = match c.align_v {
            AlignV::Top => "flex-start",
            AlignV::Center => "center",
            AlignV::Bottom => "flex-end",
        };
        let text_align = match (c.icon_position, c.align_h) {
            (IconPosition::Top, _) | (_, AlignH::Center) => "center",
            (_, AlignH::Left) => "left",
            (_, AlignH::Right) => "right",
        };

        let mut card = El::new("ha-card")
            .id("card")
            .class("neon-header")
            .class_if(c.effect_flicker, "flicker")
            .class_if(c.effect_typing, "typing");
        if let Some(background) = c.background() {
            card = card.style("background", background);
        }
        if let Some(border) = c.border() {
            card = card.style("border", border);
        }
        if let Some(radius) = &c.border_radius {
            card = card.style("border-radius", radius);
        }
        if let Some(blur) = c.bg_blur.css() {
            card = card.style("backdrop-filter", format!("blur({blur})"));
        }
        if c.effect_glow {
            card = card.style(
                "box-shadow",
                format!("var(--ha-card-box-shadow, none), 0 0 {}px {glow_color}44", glow * 2.0),
            );
        }
        if c.tap_action != HeaderTap::None {
            card = card.style("cursor", "pointer").attr("role", "button");
        }

        let mut title = El::new("div")
            .id("title")
            .class("title")
            .style("font-family", &font_family)
            .style("font-size", font_size)
            .style("font-weight", c.font_weight())
            .style("letter-spacing", letter_spacing)
            .text(c.title.clone());
        if c.italic {
            title = title.style("font-style", "italic");
        }
        if c.uppercase {
            title = title.style("text-transform", "uppercase");
        }
        title = if c.effect_gradient {
            let from = c.effect_gradient_from.as_deref().unwrap_or("var(--primary-color, #00E8FF)");
            let to = c.effect_gradient_to.as_deref().unwrap_or("var(--accent-color, #FF50A0)");
            title
                .style("background", format!("linear-gradient(90deg, {from}, {to})"))
                .style("background-clip", "text")
                .style("-webkit-text-fill-color", "transparent")
        } else {
            title.style("color", &text_color)
        };
        if c.effect_glow {
            title = title.style(
                "text-shadow",
                format!("0 0 {glow}px {glow_color}, 0 0 {}px {glow_color}55", glow * 2.0),
            );
        }

        let icon = c.icon.as_deref().map(|icon| {
            let size = c
                .icon_size
                .clone()
                .unwrap_or_else(|| format!("calc({} * 1.2)", c.font_size.as_deref().unwrap_or("24px")));
            let mut el = El::new("ha-icon")
                .id("icon")
                .attr("icon", icon)
                .style("--mdc-icon-size", size)
                .style("color", c.icon_color.as_deref().unwrap_or(&text_color));
            if c.effect_glow {
                el = el.style("filter", format!("drop-shadow(0 0 {}px {glow_color})", (glow * 0.7).round()));
            }
            El::new("div").class("icon-wrap").child(el)
        });

        let subtitle = c.subtitle.as_deref().map(|sub| {
            let el = El::new("div")
                .id("subtitle")
                .class("subtitle")
                .style("font-family", &font_family)
                .style("font-size", c.font_size_sub.as_deref().unwrap_or("13px"))
                .style("color", "var(--secondary-text-color, #888)")
                .text(sub);
            if c.uppercase { el.style("text-transform", "uppercase") } else { el }
        });

        let tree = card
            .child_if(c.effect_scanline, || El::new("div").class("scanlines"))
            .child(
                El::new("div")
                    .class("header")
                    .style("flex-direction", direction)
                    .style("justify-content", justify)
                    .style("align-items", align_items)
                    .style("gap", gap)
                    .style("padding", c.padding.as_deref().unwrap_or("var(--ha-card-header-padding, 12px 16px)"))
                    .style("min-height", c.min_height.as_deref().unwrap_or("auto"))
                    .children(icon)
                    .child(
                        El::new("div")
                            .class("text-wrap")
                            .style("text-align", text_align)
                            .child(title)
                            .children(subtitle),
                    ),
            );
        doc.replace_root(tree);
    }

    fn patch(&mut self, _doc: &mut Document, _update: &Update<Static>, _now: Instant) {}

    fn tap(&self, _target: &str, _hass: Option<&HassState>) -> Option<CardEvent> {
        let c = &self.config;
        match c.tap_action {
            HeaderTap::None => None,
            HeaderTap::Navigate => c
                .navigation_path
                .as_ref()
                .map(|path| CardEvent::Navigate { path: path.clone() }),
            HeaderTap::MoreInfo => c.entity.as_deref().map(CardEvent::more_info),
        }
    }

    fn card_size(&self) -> u32 {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::CardInstance;
    use crate::hass::EntityState;
    use crate::theme::CssVarCache;
    use std::sync::Arc;

    fn mounted(raw: Value) -> CardInstance<HeaderCard> {
        CardInstance::from_config(&raw, Arc::new(CssVarCache::default())).unwrap()
    }

    #[test]
    fn renders_once_and_ignores_state() {
        let mut card = mounted(json!({ "title": "Énergie", "subtitle": "Maison" }));
        let before = card.document().mutations();
        let hass = HassState::new().with("sensor.x", EntityState::new("1"));
        card.set_hass(&hass, Instant::now());
        assert_eq!(card.run_due_frames(Instant::now()), 0);
        assert_eq!(card.document().mutations(), before);
        assert_eq!(card.patches(), 0);
        let doc = card.document();
        assert_eq!(doc.text_of(doc.find("title").unwrap()), Some("Énergie"));
        assert!(doc.find("subtitle").is_some());
        assert!(doc.find("icon").is_none());
    }

    #[test]
    fn background_keeps_opacity_for_hex_colours() {
        let c = HeaderConfig::from_value(&json!({ "bg_color": "#102030", "bg_opacity": 0.5 })).unwrap();
        assert_eq!(c.background().as_deref(), Some("rgba(16,32,48,0.5)"));
        let c = HeaderConfig::from_value(&json!({ "bg_color": "navy" })).unwrap();
        assert_eq!(c.background().as_deref(), Some("navy"));
        assert_eq!(HeaderConfig::default().background(), None);
        assert!(HeaderConfig::from_value(&json!({ "bg_opacity": 2 })).is_err());
        let c = HeaderConfig::from_value(&json!({ "bg_color": "#éa" })).unwrap();
        assert_eq!(c.background().as_deref(), Some("#éa"));
        assert!(crate::cards::build_card(
            &json!({ "type": "custom:neon-header-card", "bg_color": "#aééa" }),
            std::sync::Arc::new(crate::theme::CssVarCache::default()),
        )
        .is_ok());
    }

    #[test]
    fn border_only_when_customised() {
        assert_eq!(HeaderConfig::default().border(), None);
        let c = HeaderConfig::from_value(&json!({ "border_style": "dashed" })).unwrap();
        assert_eq!(c.border().as_deref(), Some("1px dashed var(--divider-color)"));
    }

    #[test]
    fn blur_accepts_flags_and_lengths() {
        assert_eq!(Blur::Flag(true).css().as_deref(), Some("8px"));
        assert_eq!(Blur::Length("12".into()).css().as_deref(), Some("12px"));
        assert_eq!(Blur::Px(0.0).css(), None);
    }

    #[test]
    fn taps_follow_the_configured_action() {
        let c = |raw| HeaderCard::from_config(&raw).unwrap();
        assert_eq!(c(json!({ "title": "x" })).tap("card", None), None);
        assert_eq!(
            c(json!({ "tap_action": "navigate", "navigation_path": "/lovelace/1" })).tap("card", None),
            Some(CardEvent::Navigate { path: "/lovelace/1".into() })
        );
        assert_eq!(
            c(json!({ "tap_action": "more-info", "entity": "sun.sun" })).tap("card", None),
            Some(CardEvent::more_info("sun.sun"))
        );
        assert_eq!(c(json!({ "tap_action": "more-info" })).tap("card", None), None);
    }
}
