//! Recorder history: the query the cards issue, the samples that come back
//! and the reductions used to draw trend sparklines.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::geometry::num;
use crate::hass::parse_number;

pub const HISTORY_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// One row of a minimal-response history period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySample {
    #[serde(default)]
    pub last_changed: Option<String>,
    pub state: String,
}

impl HistorySample {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            last_changed: None,
            state: state.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub entity_id: String,
    pub window: Duration,
}

impl HistoryQuery {
    pub fn last_day(entity_id: &str) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            window: HISTORY_WINDOW,
        }
    }

    /// REST path relative to the API root, `start` being an ISO timestamp.
    pub fn api_path(&self, start: &str) -> String {
        format!(
            "history/period/{}?filter_entity_id={}&minimal_response=true&no_attributes=true",
            start, self.entity_id
        )
    }
}

/// Identifies the card configuration a fetch was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryTicket {
    pub generation: u64,
    pub entity_id: String,
}

/// A fetch the host should run and hand back with its ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub ticket: HistoryTicket,
    pub query: HistoryQuery,
}

#[async_trait]
pub trait HistorySource: Send + Sync {
    async fn fetch(&self, query: &HistoryQuery) -> anyhow::Result<Vec<HistorySample>>;
}

/// Numeric samples reduced by stride sampling to at most `capacity` points,
/// keeping the most recent ones.
pub fn downsample(samples: &[HistorySample], capacity: usize) -> Vec<f64> {
    let values: Vec<f64> = samples
        .iter()
        .filter_map(|s| parse_number(&s.state))
        .collect();
    if capacity == 0 {
        return Vec::new();
    }
    let step = (values.len() / capacity).max(1);
    let strided: Vec<f64> = values.into_iter().step_by(step).collect();
    let skip = strided.len().saturating_sub(capacity);
    strided.into_iter().skip(skip).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HistoryStats {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
}

impl HistoryStats {
    pub fn from_values<I>(values: I) -> Option<Self>
    where
        I: Iterator<Item = f64> + Clone,
    {
        let count = values.clone().count();
        if count == 0 {
            return None;
        }
        Some(Self {
            min: values.clone().fold(f64::INFINITY, f64::min),
            max: values.clone().fold(f64::NEG_INFINITY, f64::max),
            avg: values.sum::<f64>() / count as f64,
        })
    }
}

/// Cheap change key over length, first, middle and last values.
pub fn fingerprint(values: &[f64]) -> String {
    match values {
        [] => String::new(),
        [.., last] => format!(
            "{}:{}:{}:{}",
            values.len(),
            values[0],
            values[values.len() / 2],
            last
        ),
    }
}

/// Polyline `points` for `values` in a `width` x `height` box whose top is
/// at `top`. A flat series is drawn on the bottom edge.
pub fn sparkline_points(values: &[f64], width: f64, height: f64, top: f64) -> String {
    match HistoryStats::from_values(values.iter().copied()) {
        Some(stats) => sparkline_points_in(values, stats.min, stats.max, width, height, top),
        None => String::new(),
    }
}

/// Same as [`sparkline_points`] against a shared `[min, max]`, so several
/// series can be drawn on one scale.
pub fn sparkline_points_in(
    values: &[f64],
    min: f64,
    max: f64,
    width: f64,
    height: f64,
    top: f64,
) -> String {
    let range = (max - min).max(0.1);
    let n = values.len().saturating_sub(1).max(1) as f64;
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let x = (i as f64 / n * width).round();
            let y = top + (height - (v - min) / range * (height - 8.0) - 4.0).round();
            format!("{},{}", num(x), num(y))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(values: &[&str]) -> Vec<HistorySample> {
        values.iter().map(|v| HistorySample::new(*v)).collect()
    }

    #[test]
    fn downsample_strides_and_keeps_the_tail() {
        let raw: Vec<String> = (0..100).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = raw.iter().map(String::as_str).collect();
        let values = downsample(&samples(&refs), 25);
        assert_eq!(values.len(), 25);
        assert_eq!(values[0], 0.0);
        assert_eq!(values[1], 4.0);
        assert_eq!(values[24], 96.0);
    }

    #[test]
    fn downsample_skips_non_numeric_states() {
        let values = downsample(&samples(&["1", "unavailable", "2", "", "3.5"]), 48);
        assert_eq!(values, vec![1.0, 2.0, 3.5]);
    }

    #[test]
    fn short_series_keep_the_latest_points() {
        // 30 values at capacity 25: stride 1, the first 5 drop off.
        let raw: Vec<String> = (0..30).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = raw.iter().map(String::as_str).collect();
        let values = downsample(&samples(&refs), 25);
        assert_eq!(values.first(), Some(&5.0));
        assert_eq!(values.last(), Some(&29.0));
    }

    #[test]
    fn stats_cover_min_avg_max() {
        let stats = HistoryStats::from_values([2.0, 4.0, 9.0].into_iter()).unwrap();
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.avg, 5.0);
        assert_eq!(stats.max, 9.0);
        assert_eq!(HistoryStats::from_values(std::iter::empty()), None);
    }

    #[test]
    fn sparkline_spans_the_box() {
        let points = sparkline_points(&[0.0, 10.0], 320.0, 55.0, 14.0);
        assert_eq!(points, "0,65 320,18");
        let shared = sparkline_points_in(&[5.0], 0.0, 10.0, 320.0, 55.0, 14.0);
        assert_eq!(shared, "0,42");
    }

    #[test]
    fn query_path_targets_the_entity() {
        let q = HistoryQuery::last_day("sensor.temp");
        assert_eq!(q.window, Duration::from_secs(86_400));
        assert!(q.api_path("2026-01-01T00:00:00Z").contains("filter_entity_id=sensor.temp"));
    }
}
