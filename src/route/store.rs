// src/route/store.rs
//! Ordered waypoint storage with precomputed legs

use crate::{
    error::{NavError, Result},
    geo::great_circle,
};
use serde::{Deserialize, Serialize};

/// A raw route point as produced by an ingester, in visiting order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
}

impl RoutePoint {
    pub fn new(latitude: f64, longitude: f64, name: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            name: name.into(),
        }
    }
}

/// A loaded waypoint. The `*_to_next` fields describe the leg towards the
/// following waypoint and stay zero on the last one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
    pub distance_to_next: f64, // nautical miles
    pub bearing_to_next: f64,  // degrees
}

impl From<RoutePoint> for Waypoint {
    fn from(point: RoutePoint) -> Self {
        Self {
            latitude: point.latitude,
            longitude: point.longitude,
            name: point.name,
            distance_to_next: 0.0,
            bearing_to_next: 0.0,
        }
    }
}

/// Immutable, ordered route
#[derive(Debug, Clone, Serialize)]
pub struct Route {
    waypoints: Vec<Waypoint>,
    total_distance: f64,
}

impl Route {
    /// Build a route from ingested points, computing every leg once.
    ///
    /// Fails with `EmptyRoute` if the sequence is empty and with
    /// `InvalidInput` if any coordinate is not finite.
    pub fn load<I>(points: I) -> Result<Self>
    where
        I: IntoIterator<Item = RoutePoint>,
    {
        let mut waypoints: Vec<Waypoint> = Vec::new();
        let mut total_distance = 0.0;

        for point in points {
            if let Some(previous) = waypoints.last_mut() {
                let leg = great_circle(
                    previous.latitude,
                    previous.longitude,
                    point.latitude,
                    point.longitude,
                )?;
                previous.distance_to_next = leg.distance;
                previous.bearing_to_next = leg.bearing;
                total_distance += leg.distance;
            } else if !point.latitude.is_finite() || !point.longitude.is_finite() {
                return Err(NavError::InvalidInput(format!(
                    "waypoint {} has a non-finite coordinate",
                    point.name
                )));
            }
            waypoints.push(Waypoint::from(point));
        }

        if waypoints.is_empty() {
            return Err(NavError::EmptyRoute);
        }

        log::info!(
            "Loaded route with {} waypoints, {:.2} nm",
            waypoints.len(),
            total_distance
        );

        Ok(Self {
            waypoints,
            total_distance,
        })
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Always false for a loaded route, kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Waypoint> {
        self.waypoints.get(index)
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// Sum of all legs from the first to the last waypoint
    pub fn total_distance(&self) -> f64 {
        self.total_distance
    }

    pub fn last_index(&self) -> usize {
        self.waypoints.len() - 1
    }
}
