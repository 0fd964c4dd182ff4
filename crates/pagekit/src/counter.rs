//! Bounded counter series with speed and ETA derivation.
//!
//! Pages sample server-reported counters (done jobs, queue depth, memory) on
//! every poll and derive a rate of change from the retained window. The ETA
//! only applies to shrinking series: a queue drains toward zero, so a
//! negative speed yields an estimate and anything else renders as `N/A`.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::Duration;

use chrono::Utc;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Sample {
    at_ms: i64,
    value: f64,
}

/// Named series of timestamped samples with FIFO eviction.
#[derive(Debug, Default)]
pub struct CounterTracker {
    series: HashMap<String, VecDeque<Sample>>,
}

impl CounterTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sample stamped with the current wall clock and returns the
    /// retained values, oldest first.
    pub fn add(&mut self, name: &str, value: f64, max_samples: usize) -> Vec<f64> {
        self.add_at(name, value, max_samples, Utc::now().timestamp_millis())
    }

    /// Appends a sample with an explicit millisecond timestamp.
    ///
    /// Oldest samples are evicted while the series exceeds `max_samples`.
    pub fn add_at(&mut self, name: &str, value: f64, max_samples: usize, at_ms: i64) -> Vec<f64> {
        let series = self.series.entry(name.to_owned()).or_default();
        series.push_back(Sample { at_ms, value });
        while series.len() > max_samples.max(1) {
            series.pop_front();
        }
        series.iter().map(|s| s.value).collect()
    }

    /// Rate of change in units per second between the oldest and the newest
    /// retained sample.
    ///
    /// Zero when the series has fewer than two samples, when the value did
    /// not change, or when no time elapsed between the endpoints.
    #[must_use]
    pub fn speed(&self, name: &str) -> f64 {
        let Some(series) = self.series.get(name) else {
            return 0.0;
        };
        if series.len() < 2 {
            return 0.0;
        }
        let (Some(first), Some(last)) = (series.front(), series.back()) else {
            return 0.0;
        };
        let diff = last.value - first.value;
        if diff == 0.0 {
            return 0.0;
        }
        let elapsed_s = (last.at_ms - first.at_ms) as f64 / 1000.0;
        if elapsed_s <= 0.0 {
            return 0.0;
        }
        diff / elapsed_s
    }

    /// Estimated time until a shrinking series reaches zero.
    #[must_use]
    pub fn eta(&self, name: &str, total: f64) -> Eta {
        let speed = self.speed(name);
        if speed < 0.0 {
            let secs = (total / speed).abs();
            if secs.is_finite() {
                return Eta::In(Duration::from_secs_f64(secs));
            }
        }
        Eta::NotApplicable
    }

    /// Retained values for a series, oldest first.
    #[must_use]
    pub fn values(&self, name: &str) -> Vec<f64> {
        self.series
            .get(name)
            .map(|s| s.iter().map(|x| x.value).collect())
            .unwrap_or_default()
    }

    /// Number of retained samples for a series.
    #[must_use]
    pub fn len(&self, name: &str) -> usize {
        self.series.get(name).map_or(0, VecDeque::len)
    }

    #[must_use]
    pub fn is_empty(&self, name: &str) -> bool {
        self.len(name) == 0
    }

    /// Drops one series.
    pub fn clear(&mut self, name: &str) {
        self.series.remove(name);
    }

    /// Drops every series.
    pub fn clear_all(&mut self) {
        self.series.clear();
    }
}

/// Estimated completion derived from a counter series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eta {
    /// The series is not shrinking; no estimate applies.
    NotApplicable,
    /// Estimated time remaining.
    In(Duration),
}

impl fmt::Display for Eta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotApplicable => f.write_str("N/A"),
            Self::In(d) => f.write_str(&humanize(*d)),
        }
    }
}

/// Renders a duration in the coarse `1h2m` / `2m5s` / `45s` / `800ms` style,
/// trimming zero parts.
#[must_use]
pub fn humanize(d: Duration) -> String {
    let total_ms = d.as_millis();
    if total_ms < 1000 {
        return format!("{total_ms}ms");
    }
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    if hours > 0 {
        if mins == 0 {
            format!("{hours}h")
        } else {
            format!("{hours}h{mins}m")
        }
    } else if mins > 0 {
        if secs == 0 {
            format!("{mins}m")
        } else {
            format!("{mins}m{secs}s")
        }
    } else {
        format!("{secs}s")
    }
}

const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Renders the most recent `width` values as a block-character strip scaled
/// to the window's min and max. A flat window renders as the lowest bar.
#[must_use]
pub fn sparkline(values: &[f64], width: usize) -> String {
    if width == 0 || values.is_empty() {
        return String::new();
    }
    let tail = &values[values.len().saturating_sub(width)..];
    let (min, max) = tail
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    let span = max - min;
    tail.iter()
        .map(|v| {
            if span <= 0.0 {
                BARS[0]
            } else {
                let idx = (((v - min) / span) * 7.0).round() as usize;
                BARS[idx.min(7)]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // =========================================================================
    // Retention
    // =========================================================================

    #[test]
    fn series_is_capped_fifo() {
        let mut tracker = CounterTracker::new();
        for i in 0..75 {
            tracker.add_at("done", f64::from(i), 50, i64::from(i) * 1000);
        }
        assert_eq!(tracker.len("done"), 50);
        let values = tracker.values("done");
        assert_eq!(values.first().copied(), Some(25.0));
        assert_eq!(values.last().copied(), Some(74.0));
    }

    #[test]
    fn add_returns_the_retained_sequence() {
        let mut tracker = CounterTracker::new();
        tracker.add_at("n", 1.0, 3, 0);
        tracker.add_at("n", 2.0, 3, 1000);
        let values = tracker.add_at("n", 3.0, 3, 2000);
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
        let values = tracker.add_at("n", 4.0, 3, 3000);
        assert_eq!(values, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn clear_drops_only_the_named_series() {
        let mut tracker = CounterTracker::new();
        tracker.add_at("a", 1.0, 10, 0);
        tracker.add_at("b", 1.0, 10, 0);
        tracker.clear("a");
        assert!(tracker.is_empty("a"));
        assert_eq!(tracker.len("b"), 1);
    }

    // =========================================================================
    // Speed
    // =========================================================================

    #[test]
    fn speed_spans_oldest_to_newest() {
        let mut tracker = CounterTracker::new();
        tracker.add_at("jobs", 10.0, 50, 0);
        tracker.add_at("jobs", 110.0, 50, 10_000);
        assert_eq!(tracker.speed("jobs"), 10.0);
    }

    #[test]
    fn speed_needs_two_samples() {
        let mut tracker = CounterTracker::new();
        assert_eq!(tracker.speed("jobs"), 0.0);
        tracker.add_at("jobs", 10.0, 50, 0);
        assert_eq!(tracker.speed("jobs"), 0.0);
    }

    #[test]
    fn unchanged_values_have_zero_speed() {
        let mut tracker = CounterTracker::new();
        tracker.add_at("jobs", 42.0, 50, 0);
        tracker.add_at("jobs", 42.0, 50, 10_000);
        assert_eq!(tracker.speed("jobs"), 0.0);
    }

    #[test]
    fn zero_elapsed_time_has_zero_speed() {
        let mut tracker = CounterTracker::new();
        tracker.add_at("jobs", 1.0, 50, 5000);
        tracker.add_at("jobs", 9.0, 50, 5000);
        assert_eq!(tracker.speed("jobs"), 0.0);
    }

    #[test]
    fn shrinking_series_has_negative_speed() {
        let mut tracker = CounterTracker::new();
        tracker.add_at("queued", 100.0, 50, 0);
        tracker.add_at("queued", 50.0, 50, 10_000);
        assert_eq!(tracker.speed("queued"), -5.0);
    }

    // =========================================================================
    // ETA
    // =========================================================================

    #[test]
    fn eta_applies_only_to_negative_speed() {
        let mut tracker = CounterTracker::new();
        tracker.add_at("queued", 100.0, 50, 0);
        tracker.add_at("queued", 50.0, 50, 10_000);
        assert_eq!(tracker.eta("queued", 100.0), Eta::In(Duration::from_secs(20)));
        assert_eq!(tracker.eta("queued", 100.0).to_string(), "20s");
    }

    #[test]
    fn growing_or_flat_series_has_no_eta() {
        let mut tracker = CounterTracker::new();
        tracker.add_at("queued", 10.0, 50, 0);
        tracker.add_at("queued", 60.0, 50, 10_000);
        assert_eq!(tracker.eta("queued", 100.0), Eta::NotApplicable);
        assert_eq!(tracker.eta("queued", 100.0).to_string(), "N/A");

        let mut flat = CounterTracker::new();
        flat.add_at("queued", 10.0, 50, 0);
        flat.add_at("queued", 10.0, 50, 10_000);
        assert_eq!(flat.eta("queued", 100.0), Eta::NotApplicable);
    }

    // =========================================================================
    // Humanized durations
    // =========================================================================

    #[test]
    fn humanize_picks_coarse_units() {
        assert_eq!(humanize(Duration::from_millis(800)), "800ms");
        assert_eq!(humanize(Duration::from_secs(45)), "45s");
        assert_eq!(humanize(Duration::from_secs(125)), "2m5s");
        assert_eq!(humanize(Duration::from_secs(120)), "2m");
        assert_eq!(humanize(Duration::from_secs(3720)), "1h2m");
        assert_eq!(humanize(Duration::from_secs(3600)), "1h");
    }

    // =========================================================================
    // Sparklines
    // =========================================================================

    #[test]
    fn sparkline_scales_to_the_window() {
        let line = sparkline(&[0.0, 3.0, 7.0], 8);
        assert_eq!(line, "▁▄█");
    }

    #[test]
    fn sparkline_takes_the_most_recent_window() {
        let values: Vec<f64> = (0..10).map(f64::from).collect();
        let line = sparkline(&values, 3);
        assert_eq!(line.chars().count(), 3);
        assert_eq!(line.chars().last(), Some('█'));
    }

    #[test]
    fn flat_sparkline_uses_the_lowest_bar() {
        assert_eq!(sparkline(&[5.0, 5.0, 5.0], 8), "▁▁▁");
        assert_eq!(sparkline(&[], 8), "");
        assert_eq!(sparkline(&[1.0], 0), "");
    }

    // =========================================================================
    // Properties
    // =========================================================================

    proptest! {
        #[test]
        fn retention_never_exceeds_the_cap(values in proptest::collection::vec(-1e6f64..1e6, 0..200), cap in 1usize..64) {
            let mut tracker = CounterTracker::new();
            for (i, v) in values.iter().enumerate() {
                let retained = tracker.add_at("p", *v, cap, i as i64 * 100);
                prop_assert!(retained.len() <= cap);
            }
            prop_assert!(tracker.len("p") <= cap);
        }

        #[test]
        fn speed_sign_follows_the_endpoint_trend(first in -1e6f64..1e6, last in -1e6f64..1e6) {
            let mut tracker = CounterTracker::new();
            tracker.add_at("p", first, 50, 0);
            tracker.add_at("p", last, 50, 60_000);
            let speed = tracker.speed("p");
            if last > first {
                prop_assert!(speed > 0.0);
            } else if last < first {
                prop_assert!(speed < 0.0);
            } else {
                prop_assert_eq!(speed, 0.0);
            }
        }
    }
}
