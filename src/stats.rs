use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

use crate::catalog::TrafficSignal;
use crate::correlate::SignalVolumeIndex;
use crate::parser::VolumePrediction;

/// How well one prediction response covered the catalog.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct CoverageStats {
    pub timestamp: DateTime<Utc>,
    pub window_start: Option<NaiveDateTime>,

    pub catalog_signals: usize,
    pub predictions: usize,
    pub matched_signals: usize,
    pub signals_without_data: usize,
    pub unmatched_predictions: usize,
    pub duplicate_predictions: usize,

    // volume distribution over matched signals
    pub min_volume: Option<f64>,
    pub max_volume: Option<f64>,
    pub mean_volume: f64,
    pub stddev_volume: f64,
}

impl CoverageStats {
    pub fn from_correlation(
        signals: &[TrafficSignal],
        predictions: &[VolumePrediction],
        index: &SignalVolumeIndex,
    ) -> Self {
        let known: HashSet<i64> = signals.iter().map(|s| s.id).collect();

        let mut seen = HashSet::new();
        let mut unmatched = 0;
        let mut duplicates = 0;
        for p in predictions {
            if !known.contains(&p.signal_id) {
                unmatched += 1;
            } else if !seen.insert(p.signal_id) {
                duplicates += 1;
            }
        }

        let volumes: Vec<f64> = index.iter().map(|(_, v)| v).collect();
        let avg = mean(&volumes);

        CoverageStats {
            timestamp: Utc::now(),
            window_start: None,
            catalog_signals: known.len(),
            predictions: predictions.len(),
            matched_signals: index.len(),
            signals_without_data: known.iter().filter(|id| !index.contains(**id)).count(),
            unmatched_predictions: unmatched,
            duplicate_predictions: duplicates,
            min_volume: volumes.iter().copied().reduce(f64::min),
            max_volume: volumes.iter().copied().reduce(f64::max),
            mean_volume: avg,
            stddev_volume: stddev(&volumes, avg),
        }
    }

    /// Set the start of the window these predictions are for
    pub fn with_window_start(mut self, start: NaiveDateTime) -> Self {
        self.window_start = Some(start);
        self
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    pub fn coverage_pct(&self) -> f64 {
        Self::pct(self.matched_signals, self.catalog_signals)
    }
}

/// Arithmetic mean; 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation given a pre-computed mean; 0.0 for empty input.
pub fn stddev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;

    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Coordinate;
    use crate::correlate::correlate;

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(CoverageStats::pct(10, 0), 0.0);
    }

    #[test]
    fn test_pct_normal_values() {
        assert_eq!(CoverageStats::pct(50, 100), 50.0);
        assert_eq!(CoverageStats::pct(1, 4), 25.0);
    }

    #[test]
    fn test_from_correlation_counts() {
        let signals: Vec<TrafficSignal> = [1, 2, 3, 4]
            .into_iter()
            .map(|id| TrafficSignal {
                id,
                coordinate: Coordinate::new(33.7, -84.4),
            })
            .collect();
        let predictions: Vec<VolumePrediction> = [(1, 10.0), (2, 30.0), (1, 20.0), (9, 5.0)]
            .into_iter()
            .map(|(signal_id, predicted_total_volume)| VolumePrediction {
                signal_id,
                predicted_total_volume,
            })
            .collect();

        let index = correlate(&signals, &predictions);
        let stats = CoverageStats::from_correlation(&signals, &predictions, &index);

        assert_eq!(stats.catalog_signals, 4);
        assert_eq!(stats.predictions, 4);
        assert_eq!(stats.matched_signals, 2);
        assert_eq!(stats.signals_without_data, 2);
        assert_eq!(stats.unmatched_predictions, 1);
        assert_eq!(stats.duplicate_predictions, 1);
        assert_eq!(stats.min_volume, Some(20.0));
        assert_eq!(stats.max_volume, Some(30.0));
        assert_eq!(stats.mean_volume, 25.0);
        assert_eq!(stats.stddev_volume, 5.0);
        assert_eq!(stats.coverage_pct(), 50.0);
    }

    #[test]
    fn test_from_correlation_empty() {
        let stats = CoverageStats::from_correlation(&[], &[], &SignalVolumeIndex::default());

        assert_eq!(stats.matched_signals, 0);
        assert_eq!(stats.min_volume, None);
        assert_eq!(stats.mean_volume, 0.0);
        assert_eq!(stats.coverage_pct(), 0.0);
    }

    #[test]
    fn test_mean_and_stddev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let m = mean(&values);
        assert_eq!(m, 5.0);
        assert_eq!(stddev(&values, m), 2.0);
    }
}
