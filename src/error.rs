// src/error.rs
//! Error types for the route navigator

use std::fmt;

pub type Result<T> = std::result::Result<T, NavError>;

#[derive(Debug)]
pub enum NavError {
    Io(std::io::Error),
    Serial(tokio_serial::Error),
    Json(serde_json::Error),
    Gpx(String),
    Parse(String),
    /// Route ingestion produced no waypoints
    EmptyRoute,
    /// Non-finite coordinate handed to the geo math
    InvalidInput(String),
    Other(String),
}

impl fmt::Display for NavError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavError::Io(e) => write!(f, "IO error: {}", e),
            NavError::Serial(e) => write!(f, "Serial error: {}", e),
            NavError::Json(e) => write!(f, "JSON error: {}", e),
            NavError::Gpx(msg) => write!(f, "GPX error: {}", msg),
            NavError::Parse(msg) => write!(f, "Parse error: {}", msg),
            NavError::EmptyRoute => write!(f, "Route contains no waypoints"),
            NavError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            NavError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for NavError {}

impl From<std::io::Error> for NavError {
    fn from(error: std::io::Error) -> Self {
        NavError::Io(error)
    }
}

impl From<tokio_serial::Error> for NavError {
    fn from(error: tokio_serial::Error) -> Self {
        NavError::Serial(error)
    }
}

impl From<serde_json::Error> for NavError {
    fn from(error: serde_json::Error) -> Self {
        NavError::Json(error)
    }
}

impl From<gpx::errors::GpxError> for NavError {
    fn from(error: gpx::errors::GpxError) -> Self {
        NavError::Gpx(error.to_string())
    }
}
