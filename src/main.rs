//! fingerloc CLI entry point.
//!
//! Drives the calibration and localization flows from the command line: the
//! floor-plan surface of the full application is replaced here by explicit
//! coordinates passed as arguments.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wifi_fingerloc::{
    FingerprintRecord, FingerprintStore, IwScanSampler, LiveScan, LocalizationEngine,
    LocalizationSink, PointKey, PositionEstimate, ScanSampler, ScanScheduler, SchedulerConfig,
};

#[derive(Parser)]
#[command(name = "fingerloc", about = "Wi-Fi fingerprint indoor localization", version)]
struct Cli {
    /// Fingerprint data file for the current floor-plan session.
    #[arg(long, global = true, default_value = "wardriving_data.csv")]
    data_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan once and record the visible access points at a calibration point.
    Calibrate {
        /// Normalized x coordinate of the point.
        #[arg(long)]
        x: f32,
        /// Normalized y coordinate of the point.
        #[arg(long)]
        y: f32,
        /// Wireless interface to scan on.
        #[arg(long, default_value = "wlan0")]
        iface: String,
    },
    /// List calibration points with their record counts.
    Points,
    /// Dump the records stored at a calibration point.
    Show {
        #[arg(long)]
        x: f32,
        #[arg(long)]
        y: f32,
    },
    /// Delete every record at a calibration point.
    Delete {
        #[arg(long)]
        x: f32,
        #[arg(long)]
        y: f32,
    },
    /// Discard all persisted fingerprint data (floor-plan reset).
    Clear,
    /// Estimate the current position once from a single fresh scan.
    Locate {
        #[arg(long, default_value = "wlan0")]
        iface: String,
    },
    /// Run the periodic localization loop until Ctrl-C.
    Track {
        #[arg(long, default_value = "wlan0")]
        iface: String,
        /// Seconds between attempts while scans are being accepted.
        #[arg(long, default_value_t = 15)]
        normal_secs: u64,
        /// Seconds to wait after a refused scan request.
        #[arg(long, default_value_t = 30)]
        backoff_secs: u64,
    },
}

/// Sink that prints each estimate the way the floor-plan label would show it.
struct PrintSink;

#[async_trait]
impl LocalizationSink for PrintSink {
    async fn on_localization_result(&self, result: Option<PositionEstimate>) {
        match result {
            Some(est) => println!(
                "estimated position: ({:.2}, {:.2})  score={} overlap={}",
                est.x(),
                est.y(),
                est.score,
                est.overlap
            ),
            None => println!("no matching access points found"),
        }
    }
}

async fn scan_once(iface: &str) -> anyhow::Result<Vec<wifi_fingerloc::ScanObservation>> {
    let sampler = IwScanSampler::with_interface(iface);
    let ticket = sampler.request_scan()?;
    Ok(ticket.recv().await?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let store = Arc::new(FingerprintStore::open(&cli.data_file)?);

    match cli.command {
        Commands::Calibrate { x, y, iface } => {
            let observations = scan_once(&iface).await?;
            if observations.is_empty() {
                println!("scan returned no access points; nothing recorded");
                return Ok(());
            }
            let timestamp_ms = chrono::Utc::now().timestamp_millis();
            let records: Vec<FingerprintRecord> = observations
                .into_iter()
                .map(|obs| FingerprintRecord {
                    x,
                    y,
                    timestamp_ms,
                    ssid: obs.ssid,
                    bssid: obs.bssid,
                    level_dbm: obs.level_dbm,
                })
                .collect();
            store.append(&records)?;
            println!(
                "recorded {} access points at {}",
                records.len(),
                PointKey::from_coords(x, y)
            );
        }
        Commands::Points => {
            let points = store.points();
            if points.is_empty() {
                println!("no calibration points recorded");
            }
            for (key, count) in points {
                println!("{key}  {count} records");
            }
        }
        Commands::Show { x, y } => {
            let records = store.query_by_point(PointKey::from_coords(x, y));
            if records.is_empty() {
                println!("no data at this location");
            }
            for rec in records {
                println!(
                    "{}  {}  {} dBm  ssid={}",
                    rec.timestamp_ms, rec.bssid, rec.level_dbm, rec.ssid
                );
            }
        }
        Commands::Delete { x, y } => {
            let removed = store.delete_by_point(PointKey::from_coords(x, y))?;
            println!("removed {removed} records");
        }
        Commands::Clear => {
            store.clear()?;
            println!("all fingerprint data cleared");
        }
        Commands::Locate { iface } => {
            let observations = scan_once(&iface).await?;
            let live = LiveScan::from_observations(&observations);
            let engine = LocalizationEngine::new();
            PrintSink
                .on_localization_result(engine.localize(&live, &store.load_all()))
                .await;
        }
        Commands::Track {
            iface,
            normal_secs,
            backoff_secs,
        } => {
            let config = SchedulerConfig {
                normal_interval: Duration::from_secs(normal_secs),
                backoff_interval: Duration::from_secs(backoff_secs),
            };
            let sampler: Arc<dyn ScanSampler> = Arc::new(IwScanSampler::with_interface(iface));
            let sink: Arc<dyn LocalizationSink> = Arc::new(PrintSink);
            let scheduler = ScanScheduler::new(config, store, sampler, sink);

            scheduler.start();
            tokio::signal::ctrl_c().await?;
            // Stop before exiting so no late result lands after teardown.
            scheduler.stop();
        }
    }

    Ok(())
}
