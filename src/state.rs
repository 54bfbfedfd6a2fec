//! Application state owned by the presentation layer.
//!
//! Holds the read-only catalog and the current [`SignalVolumeIndex`]. The
//! index is only ever swapped as a whole, so readers see either the previous
//! index or the new one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::catalog::TrafficSignal;
use crate::config::ClientConfig;
use crate::correlate::{SignalVolumeIndex, correlate};
use crate::error::PredictionError;
use crate::fetch::{HttpClient, fetch_predictions};
use crate::stats::CoverageStats;
use crate::window::PredictionRequestWindow;

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// The new index was published.
    Applied(CoverageStats),
    /// A newer refresh started while this one was in flight; its result was dropped.
    Superseded,
}

pub struct AppState {
    signals: Arc<[TrafficSignal]>,
    index: watch::Sender<Arc<SignalVolumeIndex>>,
    generation: AtomicU64,
}

impl AppState {
    pub fn new(signals: Vec<TrafficSignal>) -> Self {
        let (index, _) = watch::channel(Arc::new(SignalVolumeIndex::default()));
        Self {
            signals: signals.into(),
            index,
            generation: AtomicU64::new(0),
        }
    }

    pub fn signals(&self) -> Arc<[TrafficSignal]> {
        Arc::clone(&self.signals)
    }

    /// Snapshot of the current index.
    pub fn index(&self) -> Arc<SignalVolumeIndex> {
        Arc::clone(&self.index.borrow())
    }

    /// Receiver notified whenever a new index is published.
    pub fn subscribe(&self) -> watch::Receiver<Arc<SignalVolumeIndex>> {
        self.index.subscribe()
    }

    /// Fetches predictions for `window` and publishes the correlated index.
    ///
    /// On error the current index is left as it was.
    pub async fn refresh<C: HttpClient>(
        &self,
        client: &C,
        config: &ClientConfig,
        window: &PredictionRequestWindow,
    ) -> Result<RefreshOutcome, PredictionError> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let predictions = fetch_predictions(client, config, window).await?;
        let index = correlate(&self.signals, &predictions);
        let stats = CoverageStats::from_correlation(&self.signals, &predictions, &index)
            .with_window_start(window.start_time());

        let published = self.index.send_if_modified(|current| {
            if self.generation.load(Ordering::SeqCst) != ticket {
                return false;
            }
            *current = Arc::new(index);
            true
        });

        if published {
            info!(
                matched = stats.matched_signals,
                catalog = stats.catalog_signals,
                "Signal volume index replaced"
            );
            Ok(RefreshOutcome::Applied(stats))
        } else {
            debug!(ticket, "Discarding superseded prediction result");
            Ok(RefreshOutcome::Superseded)
        }
    }
}
