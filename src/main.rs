// src/main.rs
//! Route Navigator - follow a GPX route against a live GPS feed

use anyhow::Context;
use chrono::{Local, Utc};
use clap::Parser;
use log::{info, warn, LevelFilter};
use route_nav::{
    config::NavConfig,
    display::{summary_line, terminal::TerminalDisplay},
    feed::{run_feed, FeedSource},
    GpxRouteSource, GpxTrackWriter, NavigationEngine, RouteSource, TrackPoint, TrackRecorder,
};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode, WriteLogger};
use std::{
    future::Future,
    path::PathBuf,
    str::FromStr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

#[derive(Debug, Parser)]
#[command(name = "route-nav", version, about = "Follow a GPX route against a live GPS feed")]
struct Cli {
    /// GPX file holding the route (or waypoints) to follow
    route: PathBuf,

    /// Read NMEA from this serial port instead of stdin
    #[arg(long)]
    serial: Option<String>,

    /// Serial baud rate
    #[arg(long, default_value_t = 9600)]
    baud: u32,

    /// Record the travelled track as GPX into this directory
    #[arg(long)]
    track_dir: Option<PathBuf>,

    /// Name written into the recorded track
    #[arg(long, default_value = "route-nav track")]
    track_name: String,

    /// Arrival radius in nautical miles
    #[arg(long)]
    threshold: Option<f64>,

    /// Polling interval for all monitors, in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Print one JSON snapshot per second instead of the dashboard
    #[arg(long)]
    json: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Persist the effective settings as the new defaults
    #[arg(long)]
    save_config: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run(cli));
    // A blocked stdin read would otherwise hold the runtime open
    runtime.shutdown_timeout(Duration::from_millis(200));
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Load configuration
    let mut config = NavConfig::load().unwrap_or_default();
    apply_overrides(&mut config, &cli);
    if cli.save_config {
        config.save().context("saving configuration")?;
    }

    init_logging(&config.log_level, cli.json)?;

    let route = GpxRouteSource::open(&cli.route)
        .and_then(|mut source| source.load_route())
        .with_context(|| format!("loading route from {}", cli.route.display()))?;
    let source = config.feed_source()?;
    info!("Using {} feed", describe(&source));

    let engine = NavigationEngine::new(route, config.engine_settings());
    engine.enable()?;

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            running_clone.store(false, Ordering::Relaxed);
        }
    });

    let mut recorder = match &config.track_dir {
        Some(dir) => {
            let (writer, path) = GpxTrackWriter::create_in(dir, Local::now())?;
            info!("Track file {}", path.display());
            Some(TrackRecorder::start(writer, &cli.track_name)?)
        }
        None => None,
    };

    let feed = run_feed(&source, &engine, &running, |live, elevation| {
        if let Some(recorder) = recorder.as_mut() {
            let point = TrackPoint {
                latitude: live.latitude,
                longitude: live.longitude,
                elevation,
                timestamp: Utc::now(),
            };
            if let Err(e) = recorder.update(point) {
                warn!("Track point dropped: {}", e);
            }
        }
    });
    let (feed_result, output_result) =
        drive(feed, output(&engine, &running, cli.json), &running).await;

    running.store(false, Ordering::Relaxed);
    engine.shutdown().await;

    let finished = recorder.map(TrackRecorder::finish).transpose();
    output_result?;
    finished?;
    if let Some(result) = feed_result {
        let count = result.context("reading position feed")?;
        info!("Feed ended after {} fixes", count);
    }

    if !cli.json {
        println!("{}", summary_line(&engine.snapshot()));
    }
    Ok(())
}

/// Run the feed and the output side together. When the feed ends first the
/// output is told to stop and awaited, so the dashboard can restore the
/// terminal. The feed result is `None` if the output finished first.
async fn drive<F, O>(
    feed: F,
    output: O,
    running: &AtomicBool,
) -> (Option<route_nav::Result<usize>>, anyhow::Result<()>)
where
    F: Future<Output = route_nav::Result<usize>>,
    O: Future<Output = anyhow::Result<()>>,
{
    tokio::pin!(output);
    let feed_result = tokio::select! {
        result = feed => result,
        result = &mut output => return (None, result),
    };
    running.store(false, Ordering::Relaxed);
    (Some(feed_result), output.await)
}

async fn output(engine: &NavigationEngine, running: &AtomicBool, json: bool) -> anyhow::Result<()> {
    if !json {
        TerminalDisplay::new().run(engine, running).await?;
        return Ok(());
    }

    while running.load(Ordering::Relaxed) {
        println!("{}", serde_json::to_string(&engine.snapshot())?);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    Ok(())
}

fn apply_overrides(config: &mut NavConfig, cli: &Cli) {
    if let Some(ref port) = cli.serial {
        config.update_serial(port.clone(), cli.baud);
    }
    if let Some(ref dir) = cli.track_dir {
        config.track_dir = Some(dir.clone());
    }
    if let Some(threshold) = cli.threshold {
        config.arrival_threshold_nm = threshold;
    }
    if let Some(interval) = cli.interval_ms {
        config.update_intervals(interval);
    }
    if let Some(ref level) = cli.log_level {
        config.log_level = level.clone();
    }
}

// The dashboard owns stdout, so its logs go to a file
fn init_logging(level: &str, json: bool) -> anyhow::Result<()> {
    let level = LevelFilter::from_str(level).unwrap_or(LevelFilter::Info);

    if json {
        TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto)?;
    } else {
        let path = std::env::temp_dir().join("route-nav.log");
        let file = std::fs::File::create(&path)
            .with_context(|| format!("creating log file {}", path.display()))?;
        WriteLogger::init(level, Config::default(), file)?;
    }
    Ok(())
}

fn describe(source: &FeedSource) -> String {
    match source {
        FeedSource::Stdin => "stdin".to_string(),
        FeedSource::Serial { port, baudrate } => format!("{} @ {}", port, baudrate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use route_nav::NavError;

    #[tokio::test]
    async fn test_feed_end_stops_output_cleanly() {
        let running = AtomicBool::new(true);
        let restored = AtomicBool::new(false);

        let feed = async { Err::<usize, _>(NavError::Other("port unavailable".to_string())) };
        let output = async {
            while running.load(Ordering::Relaxed) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            restored.store(true, Ordering::Relaxed);
            Ok::<(), anyhow::Error>(())
        };

        let (feed_result, output_result) = drive(feed, output, &running).await;
        assert!(matches!(feed_result, Some(Err(NavError::Other(_)))));
        assert!(output_result.is_ok());
        assert!(restored.load(Ordering::Relaxed));
        assert!(!running.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn test_output_end_drops_feed() {
        let running = AtomicBool::new(true);
        let feed = std::future::pending::<route_nav::Result<usize>>();
        let output = async { Ok::<(), anyhow::Error>(()) };

        let (feed_result, output_result) = drive(feed, output, &running).await;
        assert!(feed_result.is_none());
        assert!(output_result.is_ok());
    }
}
