//! Fixtures and a scripted geometry double for unit tests.

use crate::geometry::GeometryPort;
use crate::scenario::{
    LookaheadConfig, Satellite, SatelliteConfig, Scenario, Target, TwoLineElements,
};
use crate::{Result, TaskingError};
use chrono::{DateTime, Duration, TimeZone, Utc};
use ground_stations::{GeoLocation, GroundStation, StationRegistry};
use nalgebra::Vector3;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

pub const ISS_TLE: (&str, &str) = (
    "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927",
    "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537",
);

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
}

/// Unit vector in the x-y plane at `angle` degrees from +x
pub fn direction_deg(angle: f64) -> Vector3<f64> {
    let rad = angle.to_radians();
    Vector3::new(rad.cos(), rad.sin(), 0.0)
}

/// Target whose coordinates are derived from its id so fixtures never collide
pub fn target(id: &str, priority: i32, revisit_hours: f64) -> Target {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let h = hasher.finish();
    let lat = (h % 120_000) as f64 / 1000.0 - 60.0;
    let lon = ((h / 120_000) % 360_000) as f64 / 1000.0 - 180.0;

    Target {
        id: id.to_string(),
        location: GeoLocation::new(lat, lon),
        priority,
        revisit_hours,
        image_size_mb: 50.0,
        image_energy_wh: 5.0,
    }
}

pub fn satellite_config(id: &str) -> SatelliteConfig {
    SatelliteConfig {
        id: id.to_string(),
        elements: TwoLineElements {
            line1: ISS_TLE.0.to_string(),
            line2: ISS_TLE.1.to_string(),
        },
        battery_wh: 100.0,
        initial_battery_wh: 100.0,
        charge_rate_w: 20.0,
        imaging_power_w: 15.0,
        downlink_power_w: 10.0,
        idle_power_w: 2.0,
        storage_capacity_mb: 500.0,
        initial_storage_mb: 0.0,
        downlink_mbps: 10.0,
    }
}

pub fn satellite(id: &str) -> Satellite {
    Satellite::from(&satellite_config(id))
}

pub fn ground_station() -> GroundStation {
    GroundStation::new("GS-1", GeoLocation::new(78.23, 15.39))
}

pub fn stations() -> StationRegistry {
    StationRegistry::from_stations(vec![ground_station()]).unwrap()
}

pub fn scenario_with(satellites: Vec<SatelliteConfig>, targets: Vec<Target>) -> Scenario {
    Scenario {
        start_time: t0(),
        duration: Duration::minutes(10),
        timestep: Duration::seconds(60),
        min_elevation_deg: 15.0,
        max_slew_deg: 20.0,
        lookahead: LookaheadConfig::default(),
        satellites,
        ground_stations: stations(),
        targets,
    }
}

#[derive(Debug, Clone)]
struct Pass {
    elevation_deg: f64,
    pointing: Vector3<f64>,
    window: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

/// Geometry answered from a script; unscripted sites sit below the horizon
#[derive(Debug, Clone, Default)]
pub struct MockGeometry {
    passes: HashMap<(String, u64, u64), Vec<Pass>>,
    sunlit: HashMap<String, bool>,
    failing: Option<String>,
}

fn site_key(satellite: &str, location: &GeoLocation) -> (String, u64, u64) {
    (
        satellite.to_string(),
        location.latitude.to_bits(),
        location.longitude.to_bits(),
    )
}

impl MockGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Site visible for the whole run
    pub fn site(
        mut self,
        satellite: &str,
        location: &GeoLocation,
        elevation_deg: f64,
        pointing: Vector3<f64>,
    ) -> Self {
        self.passes
            .entry(site_key(satellite, location))
            .or_default()
            .push(Pass {
                elevation_deg,
                pointing,
                window: None,
            });
        self
    }

    /// Site visible only in `[from, to)`
    pub fn pass(
        mut self,
        satellite: &str,
        location: &GeoLocation,
        elevation_deg: f64,
        pointing: Vector3<f64>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Self {
        self.passes
            .entry(site_key(satellite, location))
            .or_default()
            .push(Pass {
                elevation_deg,
                pointing,
                window: Some((from, to)),
            });
        self
    }

    pub fn sunlit(mut self, satellite: &str, lit: bool) -> Self {
        self.sunlit.insert(satellite.to_string(), lit);
        self
    }

    /// Every query for `satellite` fails as if propagation broke
    pub fn failing(mut self, satellite: &str) -> Self {
        self.failing = Some(satellite.to_string());
        self
    }

    fn lookup(
        &self,
        satellite: &Satellite,
        location: &GeoLocation,
        time: DateTime<Utc>,
    ) -> Result<Option<&Pass>> {
        if self.failing.as_deref() == Some(satellite.id.as_str()) {
            return Err(TaskingError::Geometry(
                orbital_mechanics::OrbitalError::PropagationFailed("scripted".to_string()),
            ));
        }
        Ok(self
            .passes
            .get(&site_key(&satellite.id, location))
            .and_then(|passes| {
                passes.iter().find(|p| match p.window {
                    Some((from, to)) => time >= from && time < to,
                    None => true,
                })
            }))
    }
}

impl GeometryPort for MockGeometry {
    fn is_sunlit(&self, satellite: &Satellite, _time: DateTime<Utc>) -> Result<bool> {
        if self.failing.as_deref() == Some(satellite.id.as_str()) {
            return Err(TaskingError::Geometry(
                orbital_mechanics::OrbitalError::PropagationFailed("scripted".to_string()),
            ));
        }
        Ok(self.sunlit.get(&satellite.id).copied().unwrap_or(false))
    }

    fn elevation_deg(
        &self,
        satellite: &Satellite,
        location: &GeoLocation,
        time: DateTime<Utc>,
    ) -> Result<f64> {
        Ok(self
            .lookup(satellite, location, time)?
            .map(|p| p.elevation_deg)
            .unwrap_or(-90.0))
    }

    fn pointing_vector(
        &self,
        satellite: &Satellite,
        location: &GeoLocation,
        time: DateTime<Utc>,
    ) -> Result<Vector3<f64>> {
        Ok(self
            .lookup(satellite, location, time)?
            .map(|p| p.pointing)
            .unwrap_or_else(|| Vector3::z()))
    }
}
