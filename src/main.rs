//! CLI entry point for the signal volume predictor.
//!
//! Lists the bundled signal catalog, builds prediction windows from user
//! input, and runs the full fetch-and-correlate pipeline against the
//! prediction service.

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use signal_volume::{
    catalog::{self, Coordinate, TrafficSignal},
    config::{CatalogOptions, ClientConfig, Endpoint},
    fetch::BasicClient,
    output::{append_coverage, log_coverage, write_index},
    state::{AppState, RefreshOutcome},
    window::{DEFAULT_INTERVAL_MINUTES, PredictionRequestWindow, build_window},
};
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "signal_volume")]
#[command(about = "Predicted traffic volume for signalized intersections", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the traffic signals in the catalog
    Signals {
        #[command(flatten)]
        catalog: CatalogArgs,

        /// Only show the first N signals
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Build and print a prediction window without calling the service
    Window {
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Fetch predictions for a window and join them onto the catalog
    Predict {
        #[command(flatten)]
        window: WindowArgs,

        #[command(flatten)]
        catalog: CatalogArgs,

        /// Prediction service base URL (overrides PREDICTION_BASE_URL)
        #[arg(long)]
        base_url: Option<String>,

        /// Which service contract to call
        #[arg(long, value_enum, default_value_t = Mode::FetchVolume)]
        mode: Mode,

        /// CSV file to write the per-signal predictions to
        #[arg(short, long)]
        output: Option<String>,

        /// CSV file to append coverage statistics to
        #[arg(long)]
        stats_log: Option<String>,
    },
}

#[derive(Args)]
struct WindowArgs {
    /// Date as MM/DD
    #[arg(short, long)]
    date: String,

    /// Time as H:MM or HH:MM (12-hour clock)
    #[arg(short, long)]
    time: String,

    /// AM or PM
    #[arg(short, long)]
    ampm: String,

    /// Year (defaults to the current year)
    #[arg(short, long)]
    year: Option<i32>,

    /// Interval length in minutes
    #[arg(short, long, default_value_t = DEFAULT_INTERVAL_MINUTES)]
    interval: u32,
}

impl WindowArgs {
    fn build(&self) -> Result<PredictionRequestWindow> {
        Ok(build_window(
            &self.date,
            &self.time,
            &self.ampm,
            self.year,
            self.interval,
        )?)
    }
}

#[derive(Args)]
struct CatalogArgs {
    /// Path to a signal catalog CSV (defaults to the bundled dataset)
    #[arg(long)]
    catalog: Option<String>,

    /// Sort signals by distance from LAT,LON
    #[arg(long, value_parser = parse_coordinate)]
    near: Option<Coordinate>,
}

impl CatalogArgs {
    fn load(&self) -> Result<Vec<TrafficSignal>> {
        let options = match self.near {
            Some(origin) => CatalogOptions::sort_from(origin),
            None => CatalogOptions::default(),
        };
        let signals = match &self.catalog {
            Some(path) => catalog::load(path, &options)?,
            None => catalog::bundled(&options)?,
        };
        Ok(signals)
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// POST /fetch-volume
    FetchVolume,
    /// GET /predictions?timestamp=
    TimestampQuery,
}

impl From<Mode> for Endpoint {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::FetchVolume => Endpoint::FetchVolume,
            Mode::TimestampQuery => Endpoint::TimestampQuery,
        }
    }
}

fn parse_coordinate(s: &str) -> Result<Coordinate, String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got '{s}'"))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("latitude: {e}"))?;
    let lon: f64 = lon.trim().parse().map_err(|e| format!("longitude: {e}"))?;
    Ok(Coordinate::new(lat, lon))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/signal_volume.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("signal_volume.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Signals { catalog, limit } => {
            let signals = catalog.load()?;
            let shown = limit.unwrap_or(signals.len());

            for signal in signals.iter().take(shown) {
                info!(
                    signal_id = signal.id,
                    latitude = signal.coordinate.latitude,
                    longitude = signal.coordinate.longitude,
                    distance_km = catalog
                        .near
                        .map(|origin| signal.coordinate.distance_km(&origin)),
                    "Signal"
                );
            }

            info!(total = signals.len(), shown = shown.min(signals.len()), "Signal list summary");
        }
        Commands::Window { window } => {
            let window = window.build()?;
            info!(
                start_time = %window.start_time(),
                end_time = %window.end_time(),
                interval_minutes = window.interval_minutes(),
                "Prediction window"
            );
        }
        Commands::Predict {
            window,
            catalog,
            base_url,
            mode,
            output,
            stats_log,
        } => {
            let window = window.build()?;
            let signals = catalog.load()?;
            let config = client_config(base_url)?.with_endpoint(mode.into());

            predict(signals, &config, &window, output, stats_log).await?;
        }
    }

    Ok(())
}

/// Resolves client settings from the environment, letting the CLI override the URL.
fn client_config(base_url: Option<String>) -> Result<ClientConfig> {
    let mut config = ClientConfig::default();

    if let Some(url) = base_url.or_else(|| std::env::var("PREDICTION_BASE_URL").ok()) {
        config.base_url = url;
    }
    if let Ok(secs) = std::env::var("PREDICTION_CONNECT_TIMEOUT_SECS") {
        config.connect_timeout = Duration::from_secs(secs.parse()?);
    }
    if let Ok(secs) = std::env::var("PREDICTION_RESPONSE_TIMEOUT_SECS") {
        config.response_timeout = Duration::from_secs(secs.parse()?);
    }

    Ok(config)
}

/// Runs one fetch, correlates the result and writes the requested outputs.
#[tracing::instrument(skip(signals, config, window, output, stats_log), fields(window = %window))]
async fn predict(
    signals: Vec<TrafficSignal>,
    config: &ClientConfig,
    window: &PredictionRequestWindow,
    output: Option<String>,
    stats_log: Option<String>,
) -> Result<()> {
    let client = BasicClient::new(config)?;
    let state = AppState::new(signals);

    info!(base_url = %config.base_url, endpoint = ?config.endpoint, "Requesting predictions");

    let stats = match state.refresh(&client, config, window).await? {
        RefreshOutcome::Applied(stats) => stats,
        RefreshOutcome::Superseded => {
            warn!("Prediction result superseded, nothing to write");
            return Ok(());
        }
    };

    log_coverage(&stats)?;

    if let Some(path) = output {
        write_index(&path, &state.signals(), &state.index())?;
    }
    if let Some(path) = stats_log {
        append_coverage(&path, &stats)?;
    }

    Ok(())
}
