//! Value to geometry mappings shared by the cards.

/// Fraction of `[min, max]` covered by `value`, clamped to `[0, 1]`.
pub fn ratio(value: f64, min: f64, max: f64) -> f64 {
    let span = max - min;
    if span <= 0.0 || !value.is_finite() {
        return 0.0;
    }
    ((value - min) / span).clamp(0.0, 1.0)
}

/// Unclamped position of `value` in `[min, max]` on a 0-100 scale.
pub fn percent(value: f64, min: f64, max: f64) -> f64 {
    let span = max - min;
    if span == 0.0 {
        return 0.0;
    }
    (value - min) / span * 100.0
}

/// Point the bidirectional mode grows away from.
///
/// Zero when the range straddles it, otherwise the midpoint.
pub fn reference_point(min: f64, max: f64) -> f64 {
    if min <= 0.0 && max >= 0.0 {
        0.0
    } else {
        (min + max) / 2.0
    }
}

/// Split of `total` between the lower and upper side of the reference point,
/// proportional to each side's share of the range. The two always sum to
/// `total`.
pub fn side_budgets(min: f64, max: f64, total: f64) -> (f64, f64) {
    let span = max - min;
    if span <= 0.0 {
        return (0.0, total);
    }
    let lower = (reference_point(min, max) - min) / span * total;
    (lower, total - lower)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Positive,
    Negative,
}

/// How many LEDs of a ring are lit for a value, and from which side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedAllocation {
    pub active: usize,
    pub direction: Direction,
    /// Full-range position on a 0-100 scale, used for severity colors.
    pub percent: f64,
}

impl LedAllocation {
    /// Values outside `[min, max]` are clamped first.
    pub fn compute(value: f64, min: f64, max: f64, count: usize, bidirectional: bool) -> Self {
        let value = if min < max { value.clamp(min, max) } else { min };
        let percent = percent(value, min, max);

        if !bidirectional {
            return Self {
                active: round_leds(ratio(value, min, max) * count as f64, count),
                direction: Direction::Forward,
                percent,
            };
        }

        let reference = reference_point(min, max);
        let (lower_budget, upper_budget) = side_budgets(min, max, count as f64);
        if value >= reference {
            let upper_span = max - reference;
            let share = if upper_span > 0.0 {
                (value - reference) / upper_span
            } else {
                0.0
            };
            Self {
                active: round_leds(share * upper_budget, count),
                direction: Direction::Positive,
                percent,
            }
        } else {
            let lower_span = reference - min;
            let share = if lower_span > 0.0 {
                (reference - value) / lower_span
            } else {
                0.0
            };
            Self {
                active: round_leds(share * lower_budget, count),
                direction: Direction::Negative,
                percent,
            }
        }
    }

    /// Whether LED `index` (0 at twelve o'clock, clockwise) is lit.
    ///
    /// Negative values grow counter-clockwise and always keep LED 0 lit.
    pub fn is_lit(&self, index: usize, count: usize) -> bool {
        match self.direction {
            Direction::Forward | Direction::Positive => index < self.active,
            Direction::Negative => index == 0 || index > count.saturating_sub(self.active),
        }
    }
}

fn round_leds(leds: f64, count: usize) -> usize {
    (leds.round().max(0.0) as usize).min(count)
}

/// Angle in degrees, clockwise from twelve o'clock.
///
/// Bidirectional values below the reference point map to the
/// `[360 - lower_budget, 360]` arc.
pub fn value_to_angle(value: f64, min: f64, max: f64, bidirectional: bool) -> f64 {
    if !bidirectional {
        return ratio(value, min, max) * 360.0;
    }
    let value = if min < max { value.clamp(min, max) } else { min };
    let reference = reference_point(min, max);
    let (lower_budget, upper_budget) = side_budgets(min, max, 360.0);
    if value >= reference {
        let span = max - reference;
        if span > 0.0 {
            (value - reference) / span * upper_budget
        } else {
            0.0
        }
    } else {
        let span = reference - min;
        let share = if span > 0.0 { (reference - value) / span } else { 0.0 };
        360.0 - share * lower_budget
    }
}

/// Point on a circle of `radius` around `(cx, cy)` at `angle` degrees
/// clockwise from twelve o'clock.
pub fn polar(cx: f64, cy: f64, radius: f64, angle: f64) -> (f64, f64) {
    let rad = (angle - 90.0).to_radians();
    (cx + radius * rad.cos(), cy + radius * rad.sin())
}

/// Compact coordinate formatting: at most two decimals, no trailing zeros.
pub fn num(v: f64) -> String {
    let rounded = (v * 100.0).round() / 100.0;
    if rounded == rounded.trunc() {
        format!("{}", rounded as i64)
    } else {
        let s = format!("{rounded:.2}");
        s.trim_end_matches('0').to_string()
    }
}

/// Widest thermometer scale; ticks beyond it are not drawn.
pub const MAX_TEMP_SPAN: f64 = 400.0;

/// Tube and bulb layout of the neon thermometer, computed once per config.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermoGeometry {
    pub cx: f64,
    pub view_width: f64,
    pub view_height: f64,
    pub tube_top: f64,
    pub bulb_cy: f64,
    pub tube_half_outer: f64,
    pub bulb_r_outer: f64,
    pub tube_half_inner: f64,
    pub bulb_r_inner: f64,
    pub tangent_outer: f64,
    pub tangent_inner: f64,
    pub grad_bottom: f64,
    pub grad_height: f64,
    pub min: f64,
    pub max: f64,
    pub ticks: Vec<Tick>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub value: f64,
    pub y: f64,
    pub long: bool,
}

impl ThermoGeometry {
    const PAD: f64 = 8.0;
    const TUBE_HEIGHT: f64 = 90.0;
    const BULB_SPACE: f64 = 28.0;
    const TICK_STEP: f64 = 2.0;

    pub fn new(min: f64, max: f64) -> Self {
        let (tube_half_outer, bulb_r_outer) = (16.0, 26.0);
        let (tube_half_inner, bulb_r_inner) = (10.0_f64, 16.0_f64);
        let tube_top = Self::PAD;
        let bulb_cy = tube_top + Self::TUBE_HEIGHT + Self::BULB_SPACE;
        let tangent = |r: f64, w: f64| (bulb_cy - (r * r - w * w).sqrt()).round();
        let grad_bottom = bulb_cy + bulb_r_inner - 2.0;
        let grad_height = grad_bottom - tube_top;
        let px_per_unit = grad_height / (max - min);

        let steps = ((max - min) / Self::TICK_STEP + f64::EPSILON)
            .floor()
            .clamp(0.0, MAX_TEMP_SPAN / Self::TICK_STEP) as usize;
        let ticks = (0..=steps)
            .map(|i| {
                let t = min + i as f64 * Self::TICK_STEP;
                Tick {
                    value: t,
                    y: grad_bottom - (t - min) * px_per_unit,
                    long: t % 10.0 == 0.0,
                }
            })
            .collect();

        Self {
            cx: 55.0,
            view_width: 155.0,
            view_height: bulb_cy + bulb_r_outer + Self::PAD,
            tube_top,
            bulb_cy,
            tube_half_outer,
            bulb_r_outer,
            tube_half_inner,
            bulb_r_inner,
            tangent_outer: tangent(bulb_r_outer, tube_half_outer),
            tangent_inner: tangent(bulb_r_inner, tube_half_inner),
            grad_bottom,
            grad_height,
            min,
            max,
            ticks,
        }
    }

    /// Top edge and height of the mercury column for `value`.
    pub fn mercury(&self, value: f64) -> (f64, f64) {
        let top = self.grad_bottom - ratio(value, self.min, self.max) * self.grad_height;
        (top, self.bulb_cy + self.bulb_r_inner - top)
    }

    /// Closed outline of tube and bulb with the given half-width and radius.
    pub fn outline_path(&self, half: f64, radius: f64, tangent: f64) -> String {
        let (cx, top) = (self.cx, self.tube_top);
        format!(
            "M{},{} A{},{} 0 0,1 {},{} L{},{} A{},{} 0 1,1 {},{} Z",
            num(cx - half),
            num(top),
            num(half),
            num(half),
            num(cx + half),
            num(top),
            num(cx + half),
            num(tangent),
            num(radius),
            num(radius),
            num(cx - half),
            num(tangent),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_is_clamped_and_monotone() {
        assert_eq!(ratio(-5.0, 0.0, 10.0), 0.0);
        assert_eq!(ratio(0.0, 0.0, 10.0), 0.0);
        assert_eq!(ratio(10.0, 0.0, 10.0), 1.0);
        assert_eq!(ratio(50.0, 0.0, 10.0), 1.0);
        let mut last = 0.0;
        for i in 0..=100 {
            let r = ratio(i as f64 / 10.0, 0.0, 10.0);
            assert!(r >= last);
            last = r;
        }
        assert_eq!(ratio(3.0, 5.0, 5.0), 0.0);
    }

    #[test]
    fn reference_point_prefers_zero() {
        assert_eq!(reference_point(-10.0, 30.0), 0.0);
        assert_eq!(reference_point(0.0, 100.0), 0.0);
        assert_eq!(reference_point(20.0, 40.0), 30.0);
        assert_eq!(reference_point(-40.0, -20.0), -30.0);
    }

    #[test]
    fn budgets_sum_to_total() {
        for (min, max) in [(-10.0, 30.0), (-1.0, 1000.0), (-3.3, 0.7), (10.0, 20.0)] {
            let (lower, upper) = side_budgets(min, max, 360.0);
            assert!((lower + upper - 360.0).abs() < 1e-9);
            let (lower, upper) = side_budgets(min, max, 100.0);
            assert!((lower + upper - 100.0).abs() < 1e-9);
        }
        assert_eq!(side_budgets(-10.0, 30.0, 360.0), (90.0, 270.0));
    }

    #[test]
    fn bidirectional_minimum_fills_negative_side() {
        assert_eq!(value_to_angle(-10.0, -10.0, 30.0, true), 270.0);
        assert_eq!(value_to_angle(0.0, -10.0, 30.0, true), 0.0);
        assert_eq!(value_to_angle(30.0, -10.0, 30.0, true), 270.0);
        assert_eq!(value_to_angle(-5.0, -10.0, 30.0, true), 315.0);
    }

    #[test]
    fn unidirectional_angle_spans_full_turn() {
        assert_eq!(value_to_angle(0.0, 0.0, 100.0, false), 0.0);
        assert_eq!(value_to_angle(100.0, 0.0, 100.0, false), 360.0);
        assert_eq!(value_to_angle(25.0, 0.0, 100.0, false), 90.0);
    }

    #[test]
    fn leds_hit_zero_and_full_count() {
        let low = LedAllocation::compute(0.0, 0.0, 100.0, 100, false);
        let high = LedAllocation::compute(100.0, 0.0, 100.0, 100, false);
        let over = LedAllocation::compute(180.0, 0.0, 100.0, 100, false);
        assert_eq!(low.active, 0);
        assert_eq!(high.active, 100);
        assert_eq!(over.active, 100);
    }

    #[test]
    fn negative_leds_grow_backwards_from_zero() {
        let alloc = LedAllocation::compute(-10.0, -10.0, 30.0, 100, true);
        assert_eq!(alloc.direction, Direction::Negative);
        assert_eq!(alloc.active, 25);
        assert!(alloc.is_lit(0, 100));
        assert!(alloc.is_lit(99, 100));
        assert!(alloc.is_lit(76, 100));
        assert!(!alloc.is_lit(75, 100));
        assert!(!alloc.is_lit(1, 100));
        assert_eq!(alloc.percent, 0.0);

        let max = LedAllocation::compute(30.0, -10.0, 30.0, 100, true);
        assert_eq!(max.direction, Direction::Positive);
        assert_eq!(max.active, 75);
    }

    #[test]
    fn thermo_ticks_cover_the_range() {
        let geo = ThermoGeometry::new(-10.0, 40.0);
        assert_eq!(geo.ticks.len(), 26);
        assert!(geo.ticks[0].long);
        assert_eq!(geo.ticks[0].y, geo.grad_bottom);
        let (top, height) = geo.mercury(40.0);
        assert_eq!(top, geo.tube_top);
        assert_eq!(height, geo.bulb_cy + geo.bulb_r_inner - geo.tube_top);
    }

    #[test]
    fn huge_ranges_cap_the_tick_count() {
        let geo = ThermoGeometry::new(-1e7, 1e7);
        assert_eq!(geo.ticks.len(), (MAX_TEMP_SPAN / 2.0) as usize + 1);
        let far = ThermoGeometry::new(1e17, 2e17);
        assert_eq!(far.ticks.len(), (MAX_TEMP_SPAN / 2.0) as usize + 1);
        assert_eq!(far.ticks[0].value, 1e17);
    }

    #[test]
    fn numbers_are_compact() {
        assert_eq!(num(3.0), "3");
        assert_eq!(num(3.14159), "3.14");
        assert_eq!(num(2.5), "2.5");
        assert_eq!(num(-0.004), "0");
    }
}
