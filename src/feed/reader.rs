// src/feed/reader.rs
//! Feed transports: stdin or a serial port

use super::{parse_line, FeedState};
use crate::{
    error::Result,
    navigation::{LiveStatus, NavigationEngine},
};
use log::{debug, info, warn};
use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_serial::SerialPortBuilderExt;

/// Where feed lines come from
#[derive(Debug, Clone, PartialEq)]
pub enum FeedSource {
    Stdin,
    Serial { port: String, baudrate: u32 },
}

/// Open the source and pump it into the engine until EOF or `running`
/// is cleared. `on_fix` sees every accepted status and the last elevation.
pub async fn run_feed<F>(
    source: &FeedSource,
    engine: &NavigationEngine,
    running: &AtomicBool,
    on_fix: F,
) -> Result<usize>
where
    F: FnMut(&LiveStatus, Option<f64>),
{
    match source {
        FeedSource::Stdin => {
            info!("Reading position feed from stdin");
            pump(BufReader::new(tokio::io::stdin()), engine, running, on_fix).await
        }
        FeedSource::Serial { port, baudrate } => {
            info!("Connecting to GPS on {} at {} baud", port, baudrate);
            let serial = tokio_serial::new(port.as_str(), *baudrate)
                .timeout(Duration::from_millis(1000))
                .open_native_async()?;
            pump(BufReader::new(serial), engine, running, on_fix).await
        }
    }
}

/// Read lines, merge them into a live status and hand it to the engine.
/// Returns the number of statuses applied.
pub async fn pump<R, F>(
    mut reader: R,
    engine: &NavigationEngine,
    running: &AtomicBool,
    mut on_fix: F,
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    F: FnMut(&LiveStatus, Option<f64>),
{
    let mut state = FeedState::new();
    let mut line = String::new();
    let mut applied = 0;

    while running.load(Ordering::Relaxed) {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            debug!("Feed reached end of input");
            break;
        }

        match parse_line(&line) {
            Ok(Some(update)) => {
                if let Some(live) = state.apply(update) {
                    engine.update_live_status(live);
                    on_fix(&live, state.elevation());
                    applied += 1;
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Ignoring feed line: {}", e),
        }
    }

    Ok(applied)
}
