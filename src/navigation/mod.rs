// src/navigation/mod.rs
//! Route following: live status in, waypoint progress and metrics out

pub mod engine;
pub mod metrics;

pub use engine::{EngineSettings, Monitor, NavigationEngine};
pub use metrics::{
    Crosstrack, DerivedMetrics, EtaMetrics, LiveStatus, NavigationSnapshot, Side, TimeToGo,
    WaypointFix,
};
