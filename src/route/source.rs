// src/route/source.rs
//! Pluggable route ingestion

use super::store::{Route, RoutePoint};
use crate::error::Result;

/// Anything that can produce route points in visiting order
pub trait RouteSource {
    /// Read the ordered route points
    fn route_points(&mut self) -> Result<Vec<RoutePoint>>;

    /// Read the points and build a `Route` from them
    fn load_route(&mut self) -> Result<Route> {
        Route::load(self.route_points()?)
    }
}

/// In-memory source, handy for callers that already hold the points
impl RouteSource for Vec<RoutePoint> {
    fn route_points(&mut self) -> Result<Vec<RoutePoint>> {
        Ok(std::mem::take(self))
    }
}
