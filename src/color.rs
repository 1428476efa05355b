//! Severity thresholds and color interpolation.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry;

pub const FALLBACK_COLOR: &str = "#555";

/// One `{threshold, color}` pair of a severity list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Severity {
    pub value: f64,
    pub color: String,
}

impl Severity {
    pub fn new(value: f64, color: &str) -> Self {
        Self {
            value,
            color: color.to_string(),
        }
    }
}

/// Green / orange / red at a third and two thirds of the range.
pub fn default_severity() -> Vec<Severity> {
    vec![
        Severity::new(33.0, "#4caf50"),
        Severity::new(66.0, "#ff9800"),
        Severity::new(100.0, "#f44336"),
    ]
}

/// Scale the thresholds of a severity list are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityScale {
    /// Raw sensor units.
    #[default]
    Value,
    /// Percentage of the configured `[min, max]` range.
    Percent,
}

/// First entry whose threshold is at or above `value`, else the last entry.
///
/// Returns `None` only for an empty list.
pub fn pick(value: f64, thresholds: &[Severity]) -> Option<&str> {
    thresholds
        .iter()
        .find(|s| value <= s.value)
        .or_else(|| thresholds.last())
        .map(|s| s.color.as_str())
}

/// Color for `value` in `[min, max]`, comparing on the list's scale.
pub fn severity_color<'a>(
    value: f64,
    min: f64,
    max: f64,
    thresholds: &'a [Severity],
    scale: SeverityScale,
) -> &'a str {
    let scaled = match scale {
        SeverityScale::Value => value,
        SeverityScale::Percent => geometry::percent(value, min, max),
    };
    pick(scaled, thresholds).unwrap_or(FALLBACK_COLOR)
}

/// Band lookup with exclusive upper bounds: `value < bound` selects the band.
pub fn band_color<'a>(value: f64, bands: &[(f64, &'a str)], above: &'a str) -> &'a str {
    bands
        .iter()
        .find(|(bound, _)| value < *bound)
        .map(|(_, color)| *color)
        .unwrap_or(above)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parses `#rrggbb` or `#rgb`.
    pub fn parse(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if !digits.is_ascii() {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match digits.len() {
            6 => Some(Rgb(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            )),
            3 => {
                let expand = |i: usize| channel(&digits[i..i + 1]).map(|v| v * 17);
                Some(Rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            _ => None,
        }
    }

    fn mix(self, other: Rgb, t: f64) -> Rgb {
        let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb(lerp(self.0, other.0), lerp(self.1, other.1), lerp(self.2, other.2))
    }

    pub fn css(self) -> String {
        format!("rgb({},{},{})", self.0, self.1, self.2)
    }
}

/// Interpolates cold (0) -> mid (0.5) -> hot (1).
///
/// Non-hex colors (CSS variables) cannot be mixed; the nearest stop wins.
pub fn lerp_color(t: f64, cold: &str, mid: &str, hot: &str) -> String {
    let t = t.clamp(0.0, 1.0);
    let (from, to, s) = if t < 0.5 {
        (cold, mid, t * 2.0)
    } else {
        (mid, hot, (t - 0.5) * 2.0)
    };
    match (Rgb::parse(from), Rgb::parse(to)) {
        (Some(a), Some(b)) => a.mix(b, s).css(),
        _ => {
            debug!("Cannot interpolate {:?} -> {:?}, using nearest stop", from, to);
            if s < 0.5 { from } else { to }.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn abc() -> Vec<Severity> {
        vec![
            Severity::new(33.0, "A"),
            Severity::new(66.0, "B"),
            Severity::new(100.0, "C"),
        ]
    }

    #[test_case(0.0 => "A")]
    #[test_case(33.0 => "A")]
    #[test_case(50.0 => "B")]
    #[test_case(66.0 => "B")]
    #[test_case(99.9 => "C")]
    #[test_case(150.0 => "C"; "above every threshold falls through to the last")]
    fn picks_first_threshold_at_or_above(value: f64) -> &'static str {
        let list = abc();
        let color = severity_color(value, 0.0, 100.0, &list, SeverityScale::Value);
        match color {
            "A" => "A",
            "B" => "B",
            "C" => "C",
            _ => "?",
        }
    }

    #[test]
    fn percent_scale_normalizes_first() {
        let list = abc();
        // 15 on [10, 20] is 50 %.
        assert_eq!(severity_color(15.0, 10.0, 20.0, &list, SeverityScale::Percent), "B");
        assert_eq!(severity_color(15.0, 10.0, 20.0, &list, SeverityScale::Value), "A");
    }

    #[test]
    fn selection_is_idempotent() {
        let list = abc();
        for v in [-5.0, 12.5, 66.0, 1e6] {
            assert_eq!(pick(v, &list), pick(v, &list));
        }
        assert_eq!(pick(1.0, &[]), None);
        assert_eq!(severity_color(1.0, 0.0, 1.0, &[], SeverityScale::Value), FALLBACK_COLOR);
    }

    #[test]
    fn bands_use_exclusive_bounds() {
        let bands = [(5.0, "ice"), (15.0, "cold")];
        assert_eq!(band_color(4.9, &bands, "warm"), "ice");
        assert_eq!(band_color(5.0, &bands, "warm"), "cold");
        assert_eq!(band_color(30.0, &bands, "warm"), "warm");
    }

    #[test_case("#éa"; "short form with a multibyte char")]
    #[test_case("#aééa"; "long form with multibyte chars")]
    #[test_case("#12345g"; "non hex digit")]
    fn malformed_hex_is_rejected(raw: &str) {
        assert_eq!(Rgb::parse(raw), None);
    }

    #[test]
    fn hex_forms_parse() {
        assert_eq!(Rgb::parse("#0f8"), Some(Rgb(0, 255, 136)));
        assert_eq!(Rgb::parse("#FF2D78"), Some(Rgb(255, 45, 120)));
    }

    #[test]
    fn lerp_hits_the_stops() {
        assert_eq!(lerp_color(0.0, "#000000", "#808080", "#ffffff"), "rgb(0,0,0)");
        assert_eq!(lerp_color(0.5, "#000000", "#808080", "#ffffff"), "rgb(128,128,128)");
        assert_eq!(lerp_color(1.0, "#000000", "#808080", "#fff"), "rgb(255,255,255)");
        assert_eq!(lerp_color(0.1, "var(--a)", "#808080", "#fff"), "var(--a)");
        assert_eq!(lerp_color(0.9, "#000", "#éa", "#fff"), "#fff");
    }
}
