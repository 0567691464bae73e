// src/feed/nmea.rs
//! NMEA sentence parsing

use super::FeedUpdate;

/// Parse a single NMEA sentence. Sentences other than GGA and RMC, and RMC
/// fixes flagged void, yield `None`.
pub fn parse_nmea_sentence(line: &str) -> Option<FeedUpdate> {
    // Checksum is not verified, only stripped
    let body = line.split('*').next().unwrap_or(line);
    let parts: Vec<&str> = body.split(',').collect();
    let talker = parts.first()?;

    if talker.len() == 6 && talker.ends_with("GGA") {
        parse_gga(&parts)
    } else if talker.len() == 6 && talker.ends_with("RMC") {
        parse_rmc(&parts)
    } else {
        None
    }
}

/// GGA (fix data): position and altitude
fn parse_gga(parts: &[&str]) -> Option<FeedUpdate> {
    if parts.len() < 10 {
        return None;
    }
    // Fix quality 0 means no fix
    if parts[6].is_empty() || parts[6] == "0" {
        return None;
    }

    Some(FeedUpdate {
        latitude: parse_coordinate(parts[2], parts[3], "S"),
        longitude: parse_coordinate(parts[4], parts[5], "W"),
        elevation: parts[9].parse::<f64>().ok(),
        ..FeedUpdate::default()
    })
}

/// RMC (recommended minimum): position and speed over ground in knots
fn parse_rmc(parts: &[&str]) -> Option<FeedUpdate> {
    if parts.len() < 8 || parts[2] != "A" {
        return None;
    }

    Some(FeedUpdate {
        latitude: parse_coordinate(parts[3], parts[4], "S"),
        longitude: parse_coordinate(parts[5], parts[6], "W"),
        speed_knots: parts[7].parse::<f64>().ok(),
        ..FeedUpdate::default()
    })
}

/// Convert `ddmm.mmmm` plus hemisphere into signed decimal degrees
fn parse_coordinate(value: &str, hemisphere: &str, negative: &str) -> Option<f64> {
    if value.is_empty() || hemisphere.is_empty() {
        return None;
    }
    let raw = value.parse::<f64>().ok()?;
    let degrees = (raw / 100.0).trunc();
    let minutes = raw - degrees * 100.0;
    let decimal = degrees + minutes / 60.0;
    Some(if hemisphere == negative { -decimal } else { decimal })
}
