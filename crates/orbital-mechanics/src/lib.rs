//! Orbital Mechanics Library
//!
//! SGP4 propagation, WGS-84 coordinate transforms, solar ephemeris and
//! topocentric look angles. Everything the tasking engine needs to answer
//! "is this satellite in sunlight" and "where is this ground site from here".

use chrono::{DateTime, Utc};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrbitalError {
    #[error("Invalid TLE format: {0}")]
    InvalidTle(String),
    #[error("Propagation failed: {0}")]
    PropagationFailed(String),
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),
}

pub type Result<T> = std::result::Result<T, OrbitalError>;

/// Position and velocity in the TEME inertial frame (km, km/s)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StateVector {
    pub position_x: f64,
    pub position_y: f64,
    pub position_z: f64,
    pub velocity_x: f64,
    pub velocity_y: f64,
    pub velocity_z: f64,
    pub epoch: DateTime<Utc>,
}

impl StateVector {
    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.position_x, self.position_y, self.position_z)
    }
}

/// Geodetic position, degrees and km above the WGS-84 ellipsoid
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeodeticPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_km: f64,
}

/// Julian date (UT1 ~ UTC) for a UTC instant
pub fn julian_date(time: DateTime<Utc>) -> f64 {
    let seconds = time.timestamp() as f64 + f64::from(time.timestamp_subsec_nanos()) * 1e-9;
    seconds / 86400.0 + 2440587.5
}

pub mod propagation {
    use super::*;

    /// Parsed two-line element set ready for repeated SGP4 propagation
    pub struct Propagator {
        elements: sgp4::Elements,
        constants: sgp4::Constants,
        epoch: DateTime<Utc>,
    }

    impl Propagator {
        pub fn from_tle(tle_line1: &str, tle_line2: &str) -> Result<Self> {
            let elements = sgp4::Elements::from_tle(
                None,
                tle_line1.trim().as_bytes(),
                tle_line2.trim().as_bytes(),
            )
            .map_err(|e| OrbitalError::InvalidTle(format!("{:?}", e)))?;

            let constants = sgp4::Constants::from_elements(&elements)
                .map_err(|e| OrbitalError::InvalidTle(format!("{:?}", e)))?;

            let epoch = DateTime::<Utc>::from_naive_utc_and_offset(elements.datetime, Utc);

            Ok(Self {
                elements,
                constants,
                epoch,
            })
        }

        pub fn epoch(&self) -> DateTime<Utc> {
            self.epoch
        }

        pub fn norad_id(&self) -> u64 {
            self.elements.norad_id
        }

        pub fn propagate(&self, time: DateTime<Utc>) -> Result<StateVector> {
            let duration = time.signed_duration_since(self.epoch);
            let minutes_since_epoch = duration.num_milliseconds() as f64 / 60_000.0;

            let prediction = self
                .constants
                .propagate(minutes_since_epoch)
                .map_err(|e| OrbitalError::PropagationFailed(format!("{:?}", e)))?;

            Ok(StateVector {
                position_x: prediction.position[0],
                position_y: prediction.position[1],
                position_z: prediction.position[2],
                velocity_x: prediction.velocity[0],
                velocity_y: prediction.velocity[1],
                velocity_z: prediction.velocity[2],
                epoch: time,
            })
        }
    }
}

pub mod transforms {
    use super::*;
    use std::f64::consts::PI;

    pub const EARTH_RADIUS_KM: f64 = 6378.137;
    pub const EARTH_FLATTENING: f64 = 1.0 / 298.257223563;

    /// Greenwich mean sidereal time (IAU 1982), radians in [0, 2π)
    pub fn gmst(time: DateTime<Utc>) -> f64 {
        let t = (julian_date(time) - 2451545.0) / 36525.0;

        let gmst_sec = 67310.54841
            + (876600.0 * 3600.0 + 8640184.812866) * t
            + 0.093104 * t * t
            - 6.2e-6 * t * t * t;

        let gmst_rad = (gmst_sec / 240.0).to_radians();
        gmst_rad.rem_euclid(2.0 * PI)
    }

    /// WGS-84 geodetic to Earth-fixed cartesian (km)
    pub fn geodetic_to_ecef(pos: &GeodeticPosition) -> Vector3<f64> {
        let lat_rad = pos.latitude.to_radians();
        let lon_rad = pos.longitude.to_radians();
        let alt = pos.altitude_km;

        let e2 = 2.0 * EARTH_FLATTENING - EARTH_FLATTENING * EARTH_FLATTENING;
        let n = EARTH_RADIUS_KM / (1.0 - e2 * lat_rad.sin().powi(2)).sqrt();

        Vector3::new(
            (n + alt) * lat_rad.cos() * lon_rad.cos(),
            (n + alt) * lat_rad.cos() * lon_rad.sin(),
            (n * (1.0 - e2) + alt) * lat_rad.sin(),
        )
    }

    /// Rotate an Earth-fixed vector into the inertial frame by GMST
    pub fn ecef_to_inertial(ecef: &Vector3<f64>, gmst_rad: f64) -> Vector3<f64> {
        let (sin_g, cos_g) = gmst_rad.sin_cos();
        Vector3::new(
            cos_g * ecef.x - sin_g * ecef.y,
            sin_g * ecef.x + cos_g * ecef.y,
            ecef.z,
        )
    }

    /// Ground site position in the inertial frame at `time`
    pub fn site_inertial(site: &GeodeticPosition, time: DateTime<Utc>) -> Vector3<f64> {
        ecef_to_inertial(&geodetic_to_ecef(site), gmst(time))
    }
}

pub mod solar {
    //! Low-precision solar ephemeris and Earth shadow test.

    use super::transforms::EARTH_RADIUS_KM;
    use super::*;

    pub const AU_KM: f64 = 149_597_870.7;

    /// Sun position in the inertial frame (km), good to about 0.01°
    pub fn sun_position(time: DateTime<Utc>) -> Vector3<f64> {
        let n = julian_date(time) - 2451545.0;

        let mean_longitude = (280.460 + 0.9856474 * n).rem_euclid(360.0);
        let mean_anomaly = (357.528 + 0.9856003 * n).rem_euclid(360.0).to_radians();
        let ecliptic_longitude = (mean_longitude
            + 1.915 * mean_anomaly.sin()
            + 0.020 * (2.0 * mean_anomaly).sin())
        .to_radians();
        let obliquity = (23.439 - 0.0000004 * n).to_radians();
        let distance_au =
            1.00014 - 0.01671 * mean_anomaly.cos() - 0.00014 * (2.0 * mean_anomaly).cos();

        let r = distance_au * AU_KM;
        Vector3::new(
            r * ecliptic_longitude.cos(),
            r * obliquity.cos() * ecliptic_longitude.sin(),
            r * obliquity.sin() * ecliptic_longitude.sin(),
        )
    }

    /// Cylindrical shadow: lit on the day side, or off the shadow axis by more than R⊕
    pub fn is_sunlit(satellite: &Vector3<f64>, sun: &Vector3<f64>) -> bool {
        let sun_dir = sun.normalize();
        let along = satellite.dot(&sun_dir);
        if along >= 0.0 {
            return true;
        }
        let off_axis = satellite - sun_dir * along;
        off_axis.norm() > EARTH_RADIUS_KM
    }
}

pub mod look {
    //! Topocentric look angles and line-of-sight vectors.

    use super::transforms::{ecef_to_inertial, geodetic_to_ecef, gmst};
    use super::*;

    #[derive(Debug, Clone, Copy, Serialize, Deserialize)]
    pub struct LookAngles {
        /// Degrees clockwise from North
        pub azimuth_deg: f64,
        /// Degrees above the local horizon
        pub elevation_deg: f64,
        pub range_km: f64,
    }

    /// Look angles from a ground site to a satellite at inertial `sat_position`
    pub fn look_angles(
        site: &GeodeticPosition,
        sat_position: &Vector3<f64>,
        time: DateTime<Utc>,
    ) -> LookAngles {
        let theta = gmst(time);
        let site_eci = ecef_to_inertial(&geodetic_to_ecef(site), theta);
        let range_vec = sat_position - site_eci;
        let range = range_vec.norm();

        // South-East-Zenith rotation at local sidereal angle
        let lat = site.latitude.to_radians();
        let lst = site.longitude.to_radians() + theta;
        let (sin_lat, cos_lat) = lat.sin_cos();
        let (sin_lst, cos_lst) = lst.sin_cos();

        let s = sin_lat * cos_lst * range_vec.x + sin_lat * sin_lst * range_vec.y
            - cos_lat * range_vec.z;
        let e = -sin_lst * range_vec.x + cos_lst * range_vec.y;
        let z = cos_lat * cos_lst * range_vec.x + cos_lat * sin_lst * range_vec.y
            + sin_lat * range_vec.z;

        let azimuth = e.atan2(-s).to_degrees().rem_euclid(360.0);
        let elevation = if range > 0.0 {
            (z / range).clamp(-1.0, 1.0).asin().to_degrees()
        } else {
            90.0
        };

        LookAngles {
            azimuth_deg: azimuth,
            elevation_deg: elevation,
            range_km: range,
        }
    }

    /// Unit vector from the satellite towards the ground site, inertial frame
    pub fn line_of_sight(
        site: &GeodeticPosition,
        sat_position: &Vector3<f64>,
        time: DateTime<Utc>,
    ) -> Result<Vector3<f64>> {
        let site_eci = ecef_to_inertial(&geodetic_to_ecef(site), gmst(time));
        let los = site_eci - sat_position;
        los.try_normalize(1e-9).ok_or_else(|| {
            OrbitalError::InvalidCoordinates("satellite coincides with ground site".to_string())
        })
    }

    /// Angle between two pointing directions, degrees
    pub fn slew_angle_deg(from: &Vector3<f64>, to: &Vector3<f64>) -> f64 {
        from.angle(to).to_degrees()
    }
}
