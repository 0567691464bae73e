// src/navigation/metrics.rs
//! Live input and derived navigation metrics

use crate::route::Waypoint;
use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Latest position and speed supplied by the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveStatus {
    pub latitude: f64,
    pub longitude: f64,
    pub speed: f64, // knots
}

impl LiveStatus {
    pub fn new(latitude: f64, longitude: f64, speed: f64) -> Self {
        Self {
            latitude,
            longitude,
            speed,
        }
    }
}

/// Distance and bearing from the live position to the active waypoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WaypointFix {
    pub distance: f64,
    pub bearing: f64,
    /// Live leg plus the static legs still ahead
    pub total_distance: f64,
    /// Set when the waypoint is closer than the waypoint alarm distance
    pub alarm: bool,
}

/// Time to the active waypoint, minute resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeToGo {
    pub hours: u64,
    pub minutes: u32,
}

impl TimeToGo {
    /// Split fractional hours into whole hours and rounded minutes
    pub fn from_hours(hours: f64) -> Self {
        let whole = hours.trunc();
        let mut minutes = ((hours - whole) * 60.0).round() as u32;
        let mut hours = whole as u64;
        if minutes >= 60 {
            hours = hours.saturating_add(1);
            minutes -= 60;
        }
        Self { hours, minutes }
    }

    pub fn total_minutes(&self) -> u64 {
        self.hours.saturating_mul(60).saturating_add(self.minutes as u64)
    }
}

impl fmt::Display for TimeToGo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}", self.hours, self.minutes)
    }
}

/// Arrival estimates. `None` is the "unknown" state used while stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EtaMetrics {
    pub waypoint: Option<TimeToGo>,
    pub route_end: Option<DateTime<Local>>,
}

impl EtaMetrics {
    pub const UNKNOWN: EtaMetrics = EtaMetrics {
        waypoint: None,
        route_end: None,
    };

    /// Constant-speed projection of both estimates from `now`
    pub fn project(
        waypoint_distance: f64,
        total_distance: f64,
        speed: f64,
        now: DateTime<Local>,
    ) -> Self {
        // Speed is sampled to hundredths of a knot before the zero check
        let speed = (speed * 100.0).round() / 100.0;
        if speed.is_nan() || speed <= 0.0 {
            return Self::UNKNOWN;
        }

        let waypoint = TimeToGo::from_hours(waypoint_distance / speed);
        let route = TimeToGo::from_hours(total_distance / speed);

        let route_end = i64::try_from(route.total_minutes())
            .ok()
            .filter(|minutes| *minutes < MAX_PROJECTION_MINUTES)
            .and_then(|minutes| now.checked_add_signed(Duration::minutes(minutes)));

        Self {
            waypoint: Some(waypoint),
            route_end,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.waypoint.is_none() && self.route_end.is_none()
    }

    pub fn format_waypoint(&self) -> String {
        match self.waypoint {
            Some(ttg) => ttg.to_string(),
            None => "--:--".to_string(),
        }
    }

    pub fn format_route_end(&self) -> String {
        match self.route_end {
            Some(eta) => eta.format("%Y-%m-%d %H:%M").to_string(),
            None => "--".to_string(),
        }
    }
}

// About a thousand years; anything longer is reported as unknown
const MAX_PROJECTION_MINUTES: i64 = 525_600_000;

/// Which side of the course line the vehicle is on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
    #[default]
    None,
}

impl Side {
    pub fn symbol(&self) -> &str {
        match self {
            Side::Left => "L",
            Side::Right => "R",
            Side::None => "",
        }
    }
}

/// Crosstrack error against the leg from the previous waypoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Crosstrack {
    /// Always non-negative, the direction is carried by `side`
    pub distance: f64,
    pub side: Side,
    pub alarm: bool,
}

impl Crosstrack {
    /// No leg travelled yet
    pub const NONE: Crosstrack = Crosstrack {
        distance: 0.0,
        side: Side::None,
        alarm: false,
    };

    /// Build from a signed offset, negative being left of course
    pub fn from_signed(offset: f64, alarm_distance: f64) -> Self {
        let side = if offset < 0.0 {
            Side::Left
        } else if offset > 0.0 {
            Side::Right
        } else {
            Side::None
        };
        let distance = offset.abs();
        Self {
            distance,
            side,
            alarm: distance > alarm_distance,
        }
    }
}

/// All derived outputs, each group read under its own lock
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub waypoint: WaypointFix,
    pub eta: EtaMetrics,
    pub crosstrack: Crosstrack,
}

/// Point-in-time view of the engine for displays
#[derive(Debug, Clone, Serialize)]
pub struct NavigationSnapshot {
    pub enabled: bool,
    pub live: LiveStatus,
    pub position: Option<usize>,
    pub route_len: usize,
    pub waypoint: Option<Waypoint>,
    pub remaining_distance: f64,
    pub metrics: DerivedMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_time_to_go_split() {
        assert_eq!(TimeToGo::from_hours(1.5), TimeToGo { hours: 1, minutes: 30 });
        assert_eq!(TimeToGo::from_hours(0.0), TimeToGo { hours: 0, minutes: 0 });
        // 59.7 minutes rounds up into the next hour
        assert_eq!(TimeToGo::from_hours(0.995), TimeToGo { hours: 1, minutes: 0 });
        assert_eq!(TimeToGo::from_hours(2.1).to_string(), "2:06");
    }

    #[test]
    fn test_zero_speed_is_unknown() {
        let eta = EtaMetrics::project(10.0, 100.0, 0.0, noon());
        assert!(eta.is_unknown());
        assert_eq!(eta.format_waypoint(), "--:--");
        assert_eq!(eta.format_route_end(), "--");
    }

    #[test]
    fn test_negligible_and_invalid_speed_is_unknown() {
        assert!(EtaMetrics::project(10.0, 100.0, 0.004, noon()).is_unknown());
        assert!(EtaMetrics::project(10.0, 100.0, -3.0, noon()).is_unknown());
        assert!(EtaMetrics::project(10.0, 100.0, f64::NAN, noon()).is_unknown());
    }

    #[test]
    fn test_projection() {
        let eta = EtaMetrics::project(5.0, 25.0, 10.0, noon());
        assert_eq!(eta.waypoint, Some(TimeToGo { hours: 0, minutes: 30 }));
        assert_eq!(eta.format_route_end(), "2024-06-01 14:30");
    }

    #[test]
    fn test_crosstrack_sides() {
        let left = Crosstrack::from_signed(-0.4, 1.0);
        assert_eq!(left.side, Side::Left);
        assert_eq!(left.distance, 0.4);
        assert!(!left.alarm);

        let right = Crosstrack::from_signed(1.5, 1.0);
        assert_eq!(right.side, Side::Right);
        assert!(right.alarm);

        assert_eq!(Crosstrack::from_signed(0.0, 1.0).side, Side::None);
        assert_eq!(Side::None.symbol(), "");
    }
}
