// src/track.rs
//! Track recording to GPX

use crate::{
    error::{NavError, Result},
    geo::great_circle,
};
use chrono::{DateTime, Local, Utc};
use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    time::Duration,
};

/// One recorded position
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: Option<f64>, // meters
    pub timestamp: DateTime<Utc>,
}

/// Output side of a recording session
pub trait TrackSink {
    /// Open a session and write its header
    fn start(&mut self, name: &str) -> Result<()>;

    fn append(&mut self, point: &TrackPoint) -> Result<()>;

    /// Write the footer. Closing twice is a no-op.
    fn close(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Idle,
    Open,
    Closed,
}

/// Streams a single-segment GPX track to any writer
pub struct GpxTrackWriter<W: Write> {
    out: W,
    state: SessionState,
    bytes_written: usize,
    points: usize,
}

impl<W: Write> GpxTrackWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            state: SessionState::Idle,
            bytes_written: 0,
            points: 0,
        }
    }

    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    pub fn point_count(&self) -> usize {
        self.points
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn text_out(&mut self, text: &str) -> Result<()> {
        self.out.write_all(text.as_bytes())?;
        self.bytes_written += text.len();
        Ok(())
    }

    fn escape_xml(s: &str) -> String {
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&apos;")
    }
}

impl GpxTrackWriter<BufWriter<File>> {
    /// Create `<dir>/YYYY-MM-DD HHMM.gpx`, appending if it already exists
    pub fn create_in(dir: &Path, now: DateTime<Local>) -> Result<(Self, PathBuf)> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.gpx", now.format("%Y-%m-%d %H%M")));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok((Self::new(BufWriter::new(file)), path))
    }
}

impl<W: Write> TrackSink for GpxTrackWriter<W> {
    fn start(&mut self, name: &str) -> Result<()> {
        if self.state != SessionState::Idle {
            return Err(NavError::Other("Track session already started".to_string()));
        }

        let header = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="no" ?>
<gpx version="1.1" creator="route-nav" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>{}</name>
    <trkseg>
"#,
            Self::escape_xml(name)
        );
        self.text_out(&header)?;
        self.state = SessionState::Open;
        Ok(())
    }

    fn append(&mut self, point: &TrackPoint) -> Result<()> {
        if self.state != SessionState::Open {
            return Err(NavError::Other("Track session is not open".to_string()));
        }

        let mut trkpt = format!(
            "      <trkpt lat=\"{}\" lon=\"{}\">\n",
            point.latitude, point.longitude
        );
        if let Some(ele) = point.elevation {
            trkpt.push_str(&format!("        <ele>{}</ele>\n", ele));
        }
        trkpt.push_str(&format!(
            "        <time>{}</time>\n      </trkpt>\n",
            point.timestamp.to_rfc3339()
        ));

        self.text_out(&trkpt)?;
        self.points += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        match self.state {
            SessionState::Closed => return Ok(()),
            SessionState::Idle => {
                self.state = SessionState::Closed;
                return Ok(());
            }
            SessionState::Open => {}
        }
        self.text_out("    </trkseg>\n  </trk>\n</gpx>\n")?;
        self.out.flush()?;
        self.state = SessionState::Closed;
        Ok(())
    }
}

/// Throttles live positions into a track sink
pub struct TrackRecorder<S: TrackSink> {
    sink: S,
    min_distance_nm: f64,
    min_time: Duration,
    last_point: Option<TrackPoint>,
    recorded: usize,
}

impl<S: TrackSink> TrackRecorder<S> {
    pub fn start(mut sink: S, name: &str) -> Result<Self> {
        sink.start(name)?;
        log::info!("Recording track '{}'", name);
        Ok(Self {
            sink,
            min_distance_nm: 0.003, // about 5 meters
            min_time: Duration::from_secs(1),
            last_point: None,
            recorded: 0,
        })
    }

    pub fn set_min_distance(&mut self, nautical_miles: f64) {
        self.min_distance_nm = nautical_miles.max(0.0);
    }

    pub fn set_min_time(&mut self, min_time: Duration) {
        self.min_time = min_time;
    }

    /// Record the point unless it is too soon or too close to the last one.
    /// Returns whether it was written.
    pub fn update(&mut self, point: TrackPoint) -> Result<bool> {
        if let Some(ref last) = self.last_point {
            let elapsed = point
                .timestamp
                .signed_duration_since(last.timestamp)
                .to_std()
                .unwrap_or(Duration::ZERO);
            if elapsed < self.min_time {
                return Ok(false);
            }

            let moved = great_circle(last.latitude, last.longitude, point.latitude, point.longitude)?;
            if moved.distance < self.min_distance_nm {
                return Ok(false);
            }
        }

        self.sink.append(&point)?;
        self.recorded += 1;
        self.last_point = Some(point);
        Ok(true)
    }

    pub fn recorded(&self) -> usize {
        self.recorded
    }

    pub fn finish(mut self) -> Result<S> {
        self.sink.close()?;
        log::info!("Track closed with {} points", self.recorded);
        Ok(self.sink)
    }
}
