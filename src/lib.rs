// src/lib.rs
//! Route Navigator Library
//!
//! Follows a predefined route of waypoints against a live position feed,
//! advancing through the route on arrival and publishing distance, ETA and
//! crosstrack error for the active waypoint.

pub mod config;
pub mod display;
pub mod error;
pub mod feed;
pub mod geo;
pub mod navigation;
pub mod route;
pub mod track;

// Re-export main types for convenience
pub use error::{NavError, Result};
pub use geo::{great_circle, GreatCircle};
pub use navigation::{DerivedMetrics, EngineSettings, LiveStatus, NavigationEngine, Side};
pub use route::{GpxRouteSource, Route, RouteCursor, RoutePoint, RouteSource, Waypoint};
pub use track::{GpxTrackWriter, TrackPoint, TrackRecorder, TrackSink};
