// src/route/mod.rs
//! Route storage, ingestion and the active-waypoint cursor

pub mod cursor;
pub mod gpx_file;
pub mod source;
pub mod store;

pub use cursor::RouteCursor;
pub use gpx_file::GpxRouteSource;
pub use source::RouteSource;
pub use store::{Route, RoutePoint, Waypoint};
