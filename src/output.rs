//! Where correlated predictions go once a refresh has been applied: the log,
//! a per-signal CSV export, and a running CSV history of coverage.

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::TrafficSignal;
use crate::correlate::SignalVolumeIndex;
use crate::stats::CoverageStats;
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::Path;

/// One catalog signal with its predicted volume, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalVolumeRow {
    pub signal_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    /// Empty when the service returned nothing for this signal.
    pub predicted_total_volume: Option<f64>,
}

/// Pairs every catalog signal with its entry in `index`, in catalog order.
pub fn rows(signals: &[TrafficSignal], index: &SignalVolumeIndex) -> Vec<SignalVolumeRow> {
    signals
        .iter()
        .map(|s| SignalVolumeRow {
            signal_id: s.id,
            latitude: s.coordinate.latitude,
            longitude: s.coordinate.longitude,
            predicted_total_volume: index.get(s.id),
        })
        .collect()
}

/// Logs how much of the catalog a refresh covered.
///
/// The one-line summary goes to `info`; the full record as JSON goes to `debug`.
pub fn log_coverage(stats: &CoverageStats) -> Result<()> {
    info!(
        coverage_pct = stats.coverage_pct(),
        matched = stats.matched_signals,
        without_data = stats.signals_without_data,
        unmatched_predictions = stats.unmatched_predictions,
        duplicates = stats.duplicate_predictions,
        "Prediction coverage"
    );
    debug!(stats = %serde_json::to_string(stats)?, "Coverage record");
    Ok(())
}

/// Writes the correlated view to a CSV file, replacing any previous export.
pub fn write_index(path: &str, signals: &[TrafficSignal], index: &SignalVolumeIndex) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(true).from_path(path)?;

    for row in rows(signals, index) {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!(path, signals = signals.len(), with_data = index.len(), "Prediction export written");
    Ok(())
}

/// Adds one row per refresh to a coverage history file.
///
/// A new file starts with a header row; an existing one only gets the data row.
pub fn append_coverage(path: &str, stats: &CoverageStats) -> Result<()> {
    let new_file = !Path::new(path).exists();
    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new().has_headers(new_file).from_writer(file);
    writer.serialize(stats)?;
    writer.flush()?;

    debug!(path, new_file, matched = stats.matched_signals, "Coverage history updated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Coordinate;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn catalog() -> Vec<TrafficSignal> {
        vec![
            TrafficSignal {
                id: 1,
                coordinate: Coordinate::new(33.5, -84.25),
            },
            TrafficSignal {
                id: 2,
                coordinate: Coordinate::new(33.75, -84.5),
            },
        ]
    }

    #[test]
    fn test_log_coverage_handles_empty_stats() {
        log_coverage(&CoverageStats::default()).unwrap();
    }

    #[test]
    fn test_rows_mark_missing_volume_as_none() {
        let index: SignalVolumeIndex = [(2, 40.0)].into_iter().collect();
        let rows = rows(&catalog(), &index);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].predicted_total_volume, None);
        assert_eq!(rows[1].predicted_total_volume, Some(40.0));
    }

    #[test]
    fn test_write_index_leaves_unknown_cells_empty() {
        let path = temp_path("signal_volume_test_export.csv");
        let _ = fs::remove_file(&path);

        let index: SignalVolumeIndex = [(1, 12.5)].into_iter().collect();
        write_index(&path, &catalog(), &index).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "signal_id,latitude,longitude,predicted_total_volume",
                "1,33.5,-84.25,12.5",
                "2,33.75,-84.5,",
            ]
        );

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_append_coverage_writes_header_once() {
        let path = temp_path("signal_volume_test_coverage_history.csv");
        let _ = fs::remove_file(&path);

        let stats = CoverageStats::default();
        append_coverage(&path, &stats).unwrap();
        append_coverage(&path, &stats).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header_count = content.lines().filter(|l| l.contains("timestamp")).count();
        assert_eq!(header_count, 1);

        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);

        fs::remove_file(&path).unwrap();
    }
}
