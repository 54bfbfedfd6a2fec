//! Static catalog of traffic-signal locations.
//!
//! The catalog is a CSV table with the header `id,latitude,longitude` and one
//! row per signal. Rows that do not parse are skipped; only a missing
//! resource, or a table where no row parses at all, is an error.

use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::CatalogOptions;
use crate::error::CatalogError;

/// Mean Earth radius used for great-circle distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Dataset compiled into the binary.
const BUNDLED_SIGNALS: &str = include_str!("../data/signals.csv");

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// Great-circle distance to `other` in kilometres.
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        haversine_km(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrafficSignal {
    pub id: i64,
    pub coordinate: Coordinate,
}

/// Loads the catalog from a CSV file on disk.
///
/// # Errors
///
/// [`CatalogError::Unavailable`] if the file cannot be read,
/// [`CatalogError::Malformed`] if it has data rows but none of them parse.
#[tracing::instrument(skip(path, options), fields(path = %path.as_ref().display()))]
pub fn load(
    path: impl AsRef<Path>,
    options: &CatalogOptions,
) -> Result<Vec<TrafficSignal>, CatalogError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| CatalogError::Unavailable(format!("{}: {}", path.display(), e)))?;
    parse(&text, options)
}

/// Loads the dataset shipped inside the binary.
pub fn bundled(options: &CatalogOptions) -> Result<Vec<TrafficSignal>, CatalogError> {
    parse(BUNDLED_SIGNALS, options)
}

/// Parses catalog text. The first line is always treated as the header.
pub fn parse(text: &str, options: &CatalogOptions) -> Result<Vec<TrafficSignal>, CatalogError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = 0usize;
    let mut signals = Vec::new();

    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                rows += 1;
                warn!(line = e.position().map(|p| p.line()), error = %e, "Skipping unreadable catalog row");
                continue;
            }
        };

        // whitespace-only line
        if record.len() == 1 && record[0].is_empty() {
            continue;
        }

        rows += 1;
        match parse_row(&record) {
            Some(signal) => signals.push(signal),
            None => {
                debug!(
                    line = record.position().map(|p| p.line()),
                    ?record,
                    "Skipping malformed catalog row"
                );
            }
        }
    }

    if rows > 0 && signals.is_empty() {
        return Err(CatalogError::Malformed { rows });
    }

    let skipped = rows - signals.len();
    if skipped > 0 {
        warn!(skipped, "Catalog rows skipped");
    }

    if let Some(origin) = options.sort_from {
        signals = sort_by_distance(signals, &origin);
    }

    info!(signals = signals.len(), "Signal catalog loaded");
    Ok(signals)
}

fn parse_row(record: &csv::StringRecord) -> Option<TrafficSignal> {
    if record.len() != 3 {
        return None;
    }

    let id = record[0].parse::<i64>().ok()?;
    let coordinate = Coordinate::new(
        record[1].parse::<f64>().ok()?,
        record[2].parse::<f64>().ok()?,
    );

    // values are kept as written; only NaN and infinities are refused
    coordinate
        .is_finite()
        .then_some(TrafficSignal { id, coordinate })
}

/// Stable-sorts signals by great-circle distance from `origin`, nearest first.
pub fn sort_by_distance(signals: Vec<TrafficSignal>, origin: &Coordinate) -> Vec<TrafficSignal> {
    let mut keyed: Vec<(f64, TrafficSignal)> = signals
        .into_iter()
        .map(|s| (s.coordinate.distance_km(origin), s))
        .collect();

    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    keyed.into_iter().map(|(_, s)| s).collect()
}

/// Haversine distance between two latitude/longitude pairs, in kilometres.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_KM * c
}
