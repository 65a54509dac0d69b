//! Geometry Port: the astrodynamics questions the scheduler asks.

use crate::scenario::{Satellite, SatelliteConfig};
use crate::{Result, TaskingError};
use chrono::{DateTime, Utc};
use ground_stations::GeoLocation;
use nalgebra::Vector3;
use orbital_mechanics::{look, propagation::Propagator, solar};
use std::collections::HashMap;
use tracing::debug;

/// Pure functions of (satellite orbit, location, time)
pub trait GeometryPort {
    fn is_sunlit(&self, satellite: &Satellite, time: DateTime<Utc>) -> Result<bool>;

    fn elevation_deg(
        &self,
        satellite: &Satellite,
        location: &GeoLocation,
        time: DateTime<Utc>,
    ) -> Result<f64>;

    /// Unit vector from the satellite towards `location`
    fn pointing_vector(
        &self,
        satellite: &Satellite,
        location: &GeoLocation,
        time: DateTime<Utc>,
    ) -> Result<Vector3<f64>>;
}

/// SGP4-backed port; TLEs are parsed once up front
pub struct Sgp4Geometry {
    propagators: HashMap<String, Propagator>,
}

impl Sgp4Geometry {
    pub fn from_satellites(satellites: &[SatelliteConfig]) -> Result<Self> {
        let mut propagators = HashMap::with_capacity(satellites.len());
        for sat in satellites {
            let propagator = Propagator::from_tle(&sat.elements.line1, &sat.elements.line2)?;
            debug!(
                satellite = %sat.id,
                norad_id = propagator.norad_id(),
                epoch = %propagator.epoch(),
                "parsed TLE"
            );
            propagators.insert(sat.id.clone(), propagator);
        }
        Ok(Self { propagators })
    }

    fn position(&self, satellite: &Satellite, time: DateTime<Utc>) -> Result<Vector3<f64>> {
        let propagator = self
            .propagators
            .get(&satellite.id)
            .ok_or_else(|| TaskingError::UnknownSatellite(satellite.id.clone()))?;
        Ok(propagator.propagate(time)?.position())
    }
}

impl GeometryPort for Sgp4Geometry {
    fn is_sunlit(&self, satellite: &Satellite, time: DateTime<Utc>) -> Result<bool> {
        let position = self.position(satellite, time)?;
        Ok(solar::is_sunlit(&position, &solar::sun_position(time)))
    }

    fn elevation_deg(
        &self,
        satellite: &Satellite,
        location: &GeoLocation,
        time: DateTime<Utc>,
    ) -> Result<f64> {
        let position = self.position(satellite, time)?;
        Ok(look::look_angles(&location.geodetic(), &position, time).elevation_deg)
    }

    fn pointing_vector(
        &self,
        satellite: &Satellite,
        location: &GeoLocation,
        time: DateTime<Utc>,
    ) -> Result<Vector3<f64>> {
        let position = self.position(satellite, time)?;
        Ok(look::line_of_sight(&location.geodetic(), &position, time)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{satellite_config, ISS_TLE};
    use chrono::TimeZone;

    #[test]
    fn test_unknown_satellite() {
        let geometry = Sgp4Geometry::from_satellites(&[satellite_config("SAT-1")]).unwrap();
        let stranger = Satellite::from(&satellite_config("SAT-9"));
        let t = Utc.with_ymd_and_hms(2008, 9, 20, 12, 0, 0).unwrap();
        assert!(matches!(
            geometry.is_sunlit(&stranger, t),
            Err(TaskingError::UnknownSatellite(_))
        ));
    }

    #[test]
    fn test_bad_tle_is_configuration_error() {
        let mut cfg = satellite_config("SAT-1");
        cfg.elements.line1 = "1 nonsense".to_string();
        let err = Sgp4Geometry::from_satellites(&[cfg]).err().unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_sgp4_answers_are_consistent() {
        let cfg = satellite_config("SAT-1");
        assert_eq!(cfg.elements.line1, ISS_TLE.0);
        let geometry = Sgp4Geometry::from_satellites(&[cfg.clone()]).unwrap();
        let sat = Satellite::from(&cfg);
        let t = Utc.with_ymd_and_hms(2008, 9, 20, 12, 30, 0).unwrap();

        let site = GeoLocation::new(51.5, -0.12);
        let elevation = geometry.elevation_deg(&sat, &site, t).unwrap();
        assert!((-90.0..=90.0).contains(&elevation));

        let v = geometry.pointing_vector(&sat, &site, t).unwrap();
        assert!((v.norm() - 1.0).abs() < 1e-9);

        // Either answer is fine; it just has to be computable
        geometry.is_sunlit(&sat, t).unwrap();
    }
}
