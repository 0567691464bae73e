// src/feed/mod.rs
//! Live position feed: NMEA or gpsd lines into engine updates

pub mod gpsd;
pub mod nmea;
pub mod reader;

pub use reader::{pump, run_feed, FeedSource};

use crate::{
    error::{NavError, Result},
    navigation::LiveStatus,
};

/// Fields carried by one feed line; absent fields keep their last value
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeedUpdate {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed_knots: Option<f64>,
    pub elevation: Option<f64>,
}

/// Parse one line of either NMEA (`$...`) or gpsd JSON (`{...}`)
pub fn parse_line(line: &str) -> Result<Option<FeedUpdate>> {
    let line = line.trim();
    if line.is_empty() {
        Ok(None)
    } else if line.starts_with('$') {
        Ok(nmea::parse_nmea_sentence(line))
    } else if line.starts_with('{') {
        gpsd::parse_gpsd_json(line)
    } else {
        Err(NavError::Parse(format!("Unrecognised feed line: {}", line)))
    }
}

/// Merges partial updates into a complete live status
#[derive(Debug, Clone, Default)]
pub struct FeedState {
    latitude: Option<f64>,
    longitude: Option<f64>,
    speed: f64,
    elevation: Option<f64>,
}

impl FeedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge an update. Returns the live status once a position is known.
    pub fn apply(&mut self, update: FeedUpdate) -> Option<LiveStatus> {
        if let Some(lat) = update.latitude {
            self.latitude = Some(lat);
        }
        if let Some(lon) = update.longitude {
            self.longitude = Some(lon);
        }
        if let Some(speed) = update.speed_knots {
            self.speed = speed;
        }
        if update.elevation.is_some() {
            self.elevation = update.elevation;
        }
        self.live_status()
    }

    pub fn live_status(&self) -> Option<LiveStatus> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(LiveStatus::new(lat, lon, self.speed)),
            _ => None,
        }
    }

    pub fn elevation(&self) -> Option<f64> {
        self.elevation
    }
}
