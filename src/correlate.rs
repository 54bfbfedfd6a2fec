//! Joins volume predictions back onto the signal catalog.

use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::catalog::TrafficSignal;
use crate::parser::VolumePrediction;

/// Predicted volume per signal id for the latest successful fetch.
///
/// A signal missing from the index has no data, which is not the same as a
/// predicted volume of zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalVolumeIndex {
    volumes: HashMap<i64, f64>,
}

impl SignalVolumeIndex {
    pub fn get(&self, signal_id: i64) -> Option<f64> {
        self.volumes.get(&signal_id).copied()
    }

    pub fn contains(&self, signal_id: i64) -> bool {
        self.volumes.contains_key(&signal_id)
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, f64)> + '_ {
        self.volumes.iter().map(|(id, v)| (*id, *v))
    }
}

impl FromIterator<(i64, f64)> for SignalVolumeIndex {
    fn from_iter<I: IntoIterator<Item = (i64, f64)>>(iter: I) -> Self {
        Self {
            volumes: iter.into_iter().collect(),
        }
    }
}

/// Builds a fresh index from `predictions`, keeping only ids present in
/// `signals`. When an id repeats, the last prediction wins.
pub fn correlate(signals: &[TrafficSignal], predictions: &[VolumePrediction]) -> SignalVolumeIndex {
    let known: HashSet<i64> = signals.iter().map(|s| s.id).collect();

    let mut volumes = HashMap::with_capacity(predictions.len().min(known.len()));
    let mut unmatched = 0usize;

    for p in predictions {
        if known.contains(&p.signal_id) {
            volumes.insert(p.signal_id, p.predicted_total_volume);
        } else {
            unmatched += 1;
        }
    }

    debug!(
        matched = volumes.len(),
        unmatched,
        catalog = known.len(),
        "Predictions correlated"
    );

    SignalVolumeIndex { volumes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Coordinate;

    fn signals(ids: &[i64]) -> Vec<TrafficSignal> {
        ids.iter()
            .map(|&id| TrafficSignal {
                id,
                coordinate: Coordinate::new(33.75, -84.39),
            })
            .collect()
    }

    fn prediction(signal_id: i64, volume: f64) -> VolumePrediction {
        VolumePrediction {
            signal_id,
            predicted_total_volume: volume,
        }
    }

    #[test]
    fn test_last_duplicate_wins_and_missing_stays_absent() {
        let catalog = signals(&[1, 2, 3]);
        let predictions = vec![prediction(1, 10.0), prediction(2, 20.0), prediction(1, 99.0)];

        let index = correlate(&catalog, &predictions);

        assert_eq!(index.len(), 2);
        assert_eq!(index.get(1), Some(99.0));
        assert_eq!(index.get(2), Some(20.0));
        assert_eq!(index.get(3), None);
        assert!(!index.contains(3));
    }

    #[test]
    fn test_unknown_signal_ids_are_dropped() {
        let catalog = signals(&[1]);
        let index = correlate(&catalog, &[prediction(1, 5.0), prediction(404, 7.0)]);

        assert_eq!(index.len(), 1);
        assert_eq!(index.get(404), None);
    }

    #[test]
    fn test_zero_volume_is_distinct_from_no_data() {
        let catalog = signals(&[1, 2]);
        let index = correlate(&catalog, &[prediction(1, 0.0)]);

        assert_eq!(index.get(1), Some(0.0));
        assert_eq!(index.get(2), None);
    }

    #[test]
    fn test_correlate_is_idempotent() {
        let catalog = signals(&[1, 2, 3]);
        let predictions = vec![prediction(3, 1.25), prediction(2, 2.5)];

        let first = correlate(&catalog, &predictions);
        let second = correlate(&catalog, &predictions);

        assert_eq!(first, second);
        for (id, volume) in first.iter() {
            assert_eq!(second.get(id).map(f64::to_bits), Some(volume.to_bits()));
        }
    }

    #[test]
    fn test_new_index_replaces_rather_than_merges() {
        let catalog = signals(&[1, 2]);
        let _old = correlate(&catalog, &[prediction(1, 1.0), prediction(2, 2.0)]);
        let new = correlate(&catalog, &[prediction(2, 3.0)]);

        assert_eq!(new.get(1), None);
        assert_eq!(new.get(2), Some(3.0));
    }

    #[test]
    fn test_empty_inputs() {
        assert!(correlate(&[], &[prediction(1, 1.0)]).is_empty());
        assert!(correlate(&signals(&[1]), &[]).is_empty());
    }
}
