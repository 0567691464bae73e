// src/route/cursor.rs
//! Active waypoint pointer into a loaded route

use super::store::{Route, Waypoint};
use std::sync::Arc;

/// Tracks the active waypoint and the static distance still ahead of it.
///
/// The cursor starts before the route (`position() == None`) and only
/// enters it on the first `advance` or `retreat`. Both moves clamp to the
/// route bounds.
#[derive(Debug, Clone)]
pub struct RouteCursor {
    route: Arc<Route>,
    position: Option<usize>,
    remaining_distance: f64,
}

impl RouteCursor {
    pub fn new(route: Arc<Route>) -> Self {
        Self {
            route,
            position: None,
            remaining_distance: 0.0,
        }
    }

    /// Move to the next waypoint, holding at the destination
    pub fn advance(&mut self) -> &Waypoint {
        let next = match self.position {
            None => 0,
            Some(index) => (index + 1).min(self.route.last_index()),
        };
        self.move_to(next)
    }

    /// Move to the previous waypoint, holding at the first one
    pub fn retreat(&mut self) -> &Waypoint {
        let previous = self.position.map_or(0, |index| index.saturating_sub(1));
        self.move_to(previous)
    }

    /// The active waypoint, `None` until the cursor has entered the route
    pub fn current(&self) -> Option<&Waypoint> {
        self.position.and_then(|index| self.route.get(index))
    }

    /// The waypoint the vehicle is travelling from, if any leg has started
    pub fn previous(&self) -> Option<&Waypoint> {
        match self.position {
            Some(index) if index > 0 => self.route.get(index - 1),
            _ => None,
        }
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn is_at_destination(&self) -> bool {
        self.position == Some(self.route.last_index())
    }

    /// Static legs beyond the one leaving the active waypoint
    pub fn remaining_distance(&self) -> f64 {
        self.remaining_distance
    }

    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }

    fn move_to(&mut self, index: usize) -> &Waypoint {
        self.position = Some(index);
        self.remaining_distance = self.legs_after(index);
        &self.route.waypoints()[index]
    }

    // Waypoints strictly between `index` and the last one
    fn legs_after(&self, index: usize) -> f64 {
        let last = self.route.last_index();
        if index + 1 >= last {
            return 0.0;
        }
        self.route.waypoints()[index + 1..last]
            .iter()
            .map(|w| w.distance_to_next)
            .sum()
    }
}
