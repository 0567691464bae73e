// src/geo.rs
//! Great-circle math on a spherical earth, in nautical miles and degrees

use crate::error::{NavError, Result};
use serde::{Deserialize, Serialize};

/// Mean earth radius in nautical miles
pub const EARTH_RADIUS_NM: f64 = 3443.92;

/// Distance and initial bearing between two coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GreatCircle {
    pub distance: f64, // nautical miles
    pub bearing: f64,  // degrees, [0, 360)
}

/// Haversine distance and initial bearing from point 1 to point 2.
///
/// Identical points give a distance of 0 and a bearing of 0. Any non-finite
/// coordinate is rejected with `NavError::InvalidInput`.
pub fn great_circle(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Result<GreatCircle> {
    if ![lat1, lon1, lat2, lon2].iter().all(|v| v.is_finite()) {
        return Err(NavError::InvalidInput(format!(
            "non-finite coordinate ({}, {}) -> ({}, {})",
            lat1, lon1, lat2, lon2
        )));
    }

    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = phi2 - phi1;
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Clamp guards asin against a rounding overshoot for antipodal points
    let c = 2.0 * a.sqrt().min(1.0).asin();

    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();

    Ok(GreatCircle {
        distance: EARTH_RADIUS_NM * c,
        bearing: wrap_360(y.atan2(x).to_degrees()),
    })
}

/// Signed cross-track distance in nautical miles.
///
/// `from_start` is the great circle from the leg's start point to the
/// current position, `course` the leg's bearing in degrees. Positive means
/// right of the course line, negative left.
pub fn cross_track(from_start: GreatCircle, course: f64) -> f64 {
    let angular = from_start.distance / EARTH_RADIUS_NM;
    let delta = (from_start.bearing - course).to_radians();
    (angular.sin() * delta.sin()).asin() * EARTH_RADIUS_NM
}

/// Normalize an angle in degrees to [0, 360)
pub fn wrap_360(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}
