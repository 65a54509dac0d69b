//! Ground Stations Library
//!
//! Ground sites used for downlink, and the shared `GeoLocation` type that
//! imaging targets reuse for their coordinates.

use orbital_mechanics::GeodeticPosition;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StationError {
    #[error("Station not found: {0}")]
    NotFound(String),
    #[error("No ground stations configured")]
    Empty,
    #[error("Duplicate station id: {0}")]
    Duplicate(String),
    #[error("Invalid location for {id}: {reason}")]
    InvalidLocation { id: String, reason: String },
}

pub type Result<T> = std::result::Result<T, StationError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude_m: f64,
}

impl GeoLocation {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude_m: 0.0,
        }
    }

    pub fn with_altitude(mut self, altitude_m: f64) -> Self {
        self.altitude_m = altitude_m;
        self
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude)
            && self.latitude.is_finite()
            && (-180.0..=180.0).contains(&self.longitude)
            && self.longitude.is_finite()
            && self.altitude_m.is_finite()
    }

    pub fn geodetic(&self) -> GeodeticPosition {
        GeodeticPosition {
            latitude: self.latitude,
            longitude: self.longitude,
            altitude_km: self.altitude_m / 1000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundStation {
    pub id: String,
    pub location: GeoLocation,
}

impl GroundStation {
    pub fn new(id: impl Into<String>, location: GeoLocation) -> Self {
        Self {
            id: id.into(),
            location,
        }
    }
}

/// Validated, non-empty set of ground stations in configuration order
#[derive(Debug, Clone)]
pub struct StationRegistry {
    stations: Vec<GroundStation>,
}

impl StationRegistry {
    pub fn from_stations(stations: Vec<GroundStation>) -> Result<Self> {
        if stations.is_empty() {
            return Err(StationError::Empty);
        }

        for (i, station) in stations.iter().enumerate() {
            if !station.location.is_valid() {
                return Err(StationError::InvalidLocation {
                    id: station.id.clone(),
                    reason: format!(
                        "lat={} lon={} alt_m={}",
                        station.location.latitude,
                        station.location.longitude,
                        station.location.altitude_m
                    ),
                });
            }
            if stations[..i].iter().any(|s| s.id == station.id) {
                return Err(StationError::Duplicate(station.id.clone()));
            }
        }

        Ok(Self { stations })
    }

    pub fn get(&self, id: &str) -> Result<&GroundStation> {
        self.stations
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| StationError::NotFound(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &GroundStation> {
        self.stations.iter()
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}
