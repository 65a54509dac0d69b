//! Eligibility filter: visibility, fleet cooldown and slew budget
//!
//! Narrows the target list for one satellite at one instant. Runs before any
//! resource check and never mutates state.

use crate::geometry::GeometryPort;
use crate::ledger::RevisitLedger;
use crate::scenario::{Satellite, Target};
use crate::Result;
use chrono::{DateTime, Utc};
use ground_stations::StationRegistry;
use nalgebra::Vector3;
use orbital_mechanics::look::slew_angle_deg;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EligibilityLimits {
    pub min_elevation_deg: f64,
    pub max_slew_deg: f64,
}

#[derive(Debug, Clone)]
pub struct EligibleTarget<'a> {
    pub target: &'a Target,
    /// Attitude the satellite would hold to image this target
    pub pointing: Vector3<f64>,
    /// None when the satellite has not imaged yet
    pub slew_deg: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct Eligibility<'a> {
    /// Targets above the elevation mask, before cooldown and slew
    pub visible: usize,
    pub eligible: Vec<EligibleTarget<'a>>,
}

impl Eligibility<'_> {
    pub fn over_target(&self) -> bool {
        self.visible > 0
    }
}

/// Strictly above the mask counts as in view
pub fn above_mask(elevation_deg: f64, min_elevation_deg: f64) -> bool {
    elevation_deg > min_elevation_deg
}

pub fn filter_targets<'a, G: GeometryPort + ?Sized>(
    geometry: &G,
    satellite: &Satellite,
    targets: &'a [Target],
    ledger: &RevisitLedger,
    limits: &EligibilityLimits,
    now: DateTime<Utc>,
) -> Result<Eligibility<'a>> {
    let mut result = Eligibility::default();

    for target in targets {
        let elevation = geometry.elevation_deg(satellite, &target.location, now)?;
        if !above_mask(elevation, limits.min_elevation_deg) {
            continue;
        }
        result.visible += 1;

        if ledger.in_cooldown(target, now) {
            trace!(satellite = %satellite.id, target_id = %target.id, "in revisit cooldown");
            continue;
        }

        let pointing = geometry.pointing_vector(satellite, &target.location, now)?;
        let slew_deg = satellite
            .attitude
            .as_ref()
            .map(|previous| slew_angle_deg(previous, &pointing));

        if let Some(angle) = slew_deg {
            if angle > limits.max_slew_deg {
                trace!(
                    satellite = %satellite.id,
                    target_id = %target.id,
                    slew_deg = angle,
                    "slew exceeds budget"
                );
                continue;
            }
        }

        result.eligible.push(EligibleTarget {
            target,
            pointing,
            slew_deg,
        });
    }

    Ok(result)
}

/// Any configured station above the mask
pub fn ground_in_view<G: GeometryPort + ?Sized>(
    geometry: &G,
    satellite: &Satellite,
    stations: &StationRegistry,
    min_elevation_deg: f64,
    now: DateTime<Utc>,
) -> Result<bool> {
    for station in stations.iter() {
        if above_mask(
            geometry.elevation_deg(satellite, &station.location, now)?,
            min_elevation_deg,
        ) {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{direction_deg, satellite, stations, t0, target, MockGeometry};
    use chrono::Duration;

    const LIMITS: EligibilityLimits = EligibilityLimits {
        min_elevation_deg: 15.0,
        max_slew_deg: 20.0,
    };

    #[test]
    fn test_elevation_mask() {
        let targets = vec![target("LOW", 1, 12.0), target("HIGH", 1, 12.0)];
        let geometry = MockGeometry::new()
            .site("SAT-1", &targets[0].location, 10.0, direction_deg(0.0))
            .site("SAT-1", &targets[1].location, 40.0, direction_deg(0.0));
        let sat = satellite("SAT-1");

        let ledger = RevisitLedger::new();
        let result = filter_targets(&geometry, &sat, &targets, &ledger, &LIMITS, t0()).unwrap();
        assert_eq!(result.visible, 1);
        assert_eq!(result.eligible.len(), 1);
        assert_eq!(result.eligible[0].target.id, "HIGH");
        assert!(result.eligible[0].slew_deg.is_none());
    }

    #[test]
    fn test_exactly_at_mask_is_not_visible() {
        let targets = vec![target("EDGE", 1, 12.0)];
        let geometry =
            MockGeometry::new().site("SAT-1", &targets[0].location, 15.0, direction_deg(0.0));
        let result = filter_targets(
            &geometry,
            &satellite("SAT-1"),
            &targets,
            &RevisitLedger::new(),
            &LIMITS,
            t0(),
        )
        .unwrap();
        assert!(!result.over_target());
    }

    #[test]
    fn test_fleet_cooldown() {
        // Imaged by another satellite at t0 with a 4h revisit
        let targets = vec![target("CITY", 1, 4.0)];
        let geometry =
            MockGeometry::new().site("SAT-Y", &targets[0].location, 50.0, direction_deg(0.0));
        let sat_y = satellite("SAT-Y");
        let mut ledger = RevisitLedger::new();
        ledger.record("CITY", t0());

        let at_2h = filter_targets(
            &geometry,
            &sat_y,
            &targets,
            &ledger,
            &LIMITS,
            t0() + Duration::hours(2),
        )
        .unwrap();
        assert!(at_2h.over_target());
        assert!(at_2h.eligible.is_empty());

        let at_5h = filter_targets(
            &geometry,
            &sat_y,
            &targets,
            &ledger,
            &LIMITS,
            t0() + Duration::hours(5),
        )
        .unwrap();
        assert_eq!(at_5h.eligible.len(), 1);
    }

    #[test]
    fn test_slew_budget() {
        let targets = vec![target("FAR", 1, 12.0), target("NEAR", 1, 12.0)];
        let geometry = MockGeometry::new()
            .site("SAT-1", &targets[0].location, 60.0, direction_deg(25.0))
            .site("SAT-1", &targets[1].location, 60.0, direction_deg(15.0));
        let mut sat = satellite("SAT-1");
        sat.attitude = Some(direction_deg(0.0));

        let ledger = RevisitLedger::new();
        let result = filter_targets(&geometry, &sat, &targets, &ledger, &LIMITS, t0()).unwrap();
        assert_eq!(result.visible, 2);
        assert_eq!(result.eligible.len(), 1);
        assert_eq!(result.eligible[0].target.id, "NEAR");
        assert!((result.eligible[0].slew_deg.unwrap() - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_attitude_means_no_slew_limit() {
        let targets = vec![target("FAR", 1, 12.0)];
        let geometry =
            MockGeometry::new().site("SAT-1", &targets[0].location, 60.0, direction_deg(170.0));
        let result = filter_targets(
            &geometry,
            &satellite("SAT-1"),
            &targets,
            &RevisitLedger::new(),
            &LIMITS,
            t0(),
        )
        .unwrap();
        assert_eq!(result.eligible.len(), 1);
    }

    #[test]
    fn test_ground_in_view() {
        let registry = stations();
        let station = registry.iter().next().unwrap().location;
        let sat = satellite("SAT-1");

        let visible = MockGeometry::new().site("SAT-1", &station, 30.0, direction_deg(0.0));
        assert!(ground_in_view(&visible, &sat, &registry, 15.0, t0()).unwrap());

        let hidden = MockGeometry::new();
        assert!(!ground_in_view(&hidden, &sat, &registry, 15.0, t0()).unwrap());
    }
}
