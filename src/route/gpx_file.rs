// src/route/gpx_file.rs
//! GPX route ingestion

use super::{source::RouteSource, store::RoutePoint};
use crate::error::Result;
use std::{fs::File, io::BufReader, io::Read, path::Path};

/// Reads route points from a GPX document.
///
/// Points of the first `<rte>` are used in document order. Files without a
/// route fall back to their top-level `<wpt>` list. Unnamed points are
/// labelled `WPT<n>` with a 1-based index.
pub struct GpxRouteSource<R: Read> {
    reader: Option<R>,
}

impl<R: Read> GpxRouteSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
        }
    }
}

impl GpxRouteSource<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> RouteSource for GpxRouteSource<R> {
    fn route_points(&mut self) -> Result<Vec<RoutePoint>> {
        let reader = match self.reader.take() {
            Some(reader) => reader,
            None => return Ok(Vec::new()),
        };
        let document = gpx::read(reader)?;

        let points = match document.routes.into_iter().find(|r| !r.points.is_empty()) {
            Some(route) => route.points,
            None => document.waypoints,
        };

        Ok(points
            .into_iter()
            .enumerate()
            .map(|(i, wp)| {
                let position = wp.point();
                let name = wp.name.unwrap_or_else(|| format!("WPT{}", i + 1));
                RoutePoint::new(position.y(), position.x(), name)
            })
            .collect())
    }
}
