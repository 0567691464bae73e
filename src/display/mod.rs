// src/display/mod.rs
//! Display modules for navigation output

pub mod terminal;

use crate::navigation::NavigationSnapshot;

/// Format a distance in nautical miles for display
pub fn format_nm(distance: f64) -> String {
    format!("{:>10.2} nm", distance)
}

/// Format a bearing in whole degrees for display
pub fn format_bearing(bearing: f64) -> String {
    format!("{:>10.0}°", bearing.round() % 360.0)
}

/// One-line summary used when stdout is not a dashboard
pub fn summary_line(snapshot: &NavigationSnapshot) -> String {
    let name = snapshot
        .waypoint
        .as_ref()
        .map(|w| w.name.as_str())
        .unwrap_or("-");
    let metrics = &snapshot.metrics;
    format!(
        "{} {:.2}nm {:03.0}° total {:.2}nm eta {} / {} xte {:.2}{}",
        name,
        metrics.waypoint.distance,
        metrics.waypoint.bearing.round() % 360.0,
        metrics.waypoint.total_distance,
        metrics.eta.format_waypoint(),
        metrics.eta.format_route_end(),
        metrics.crosstrack.distance,
        metrics.crosstrack.side.symbol()
    )
}
