// src/feed/gpsd.rs
//! gpsd JSON report parsing

use super::FeedUpdate;
use crate::error::{NavError, Result};
use serde::Deserialize;

const KNOTS_PER_MPS: f64 = 1.943_844_5;

/// TPV (Time Position Velocity) report; other classes only need `class`
#[derive(Debug, Deserialize)]
struct GpsdReport {
    class: String,
    mode: Option<u8>,
    lat: Option<f64>,
    lon: Option<f64>,
    alt: Option<f64>,
    speed: Option<f64>, // m/s
}

/// Parse a single gpsd JSON line. Non-TPV reports and TPV reports without a
/// fix yield `Ok(None)`.
pub fn parse_gpsd_json(line: &str) -> Result<Option<FeedUpdate>> {
    let report: GpsdReport = serde_json::from_str(line)
        .map_err(|e| NavError::Parse(format!("Failed to parse gpsd JSON: {}", e)))?;

    if report.class != "TPV" {
        return Ok(None);
    }
    if report.mode.map_or(false, |m| m < 2) {
        return Ok(None);
    }

    Ok(Some(FeedUpdate {
        latitude: report.lat,
        longitude: report.lon,
        speed_knots: report.speed.map(|mps| mps * KNOTS_PER_MPS),
        elevation: report.alt,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tpv_parsing() {
        let json = r#"{"class":"TPV","device":"/dev/ttyUSB0","mode":3,"time":"2023-01-01T12:00:00.000Z","ept":0.005,"lat":48.117,"lon":11.517,"alt":545.4,"epx":15.319,"epy":17.054,"epv":124.484,"track":10.3797,"speed":0.091,"climb":10.7,"eps":34.11,"epc":248.97}"#;

        let update = parse_gpsd_json(json).unwrap().unwrap();

        assert_eq!(update.latitude, Some(48.117));
        assert_eq!(update.longitude, Some(11.517));
        assert_eq!(update.elevation, Some(545.4));
        assert!((update.speed_knots.unwrap() - 0.1769).abs() < 0.001);
    }

    #[test]
    fn test_no_fix_ignored() {
        let json = r#"{"class":"TPV","mode":1}"#;
        assert!(parse_gpsd_json(json).unwrap().is_none());
    }

    #[test]
    fn test_other_classes_ignored() {
        let json = r#"{"class":"SKY","hdop":1.2,"satellites":[{"PRN":1,"ss":42,"used":true}]}"#;
        assert!(parse_gpsd_json(json).unwrap().is_none());
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            parse_gpsd_json(r#"{"invalid": json"#),
            Err(NavError::Parse(_))
        ));
    }
}
