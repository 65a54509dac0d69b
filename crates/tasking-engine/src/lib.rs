//! Constellation Tasking Engine
//!
//! Plans, tick by tick, what every satellite in a constellation does:
//! image a ground target, downlink stored data, or idle.
//!
//! # Decision pipeline (per tick, per satellite, in configured order)
//!
//! ```text
//! GeometryPort ─► eligibility ─► arbitration ─► EnergyState / DataState ─► OutputRow
//!                     ▲               │
//!                     └── RevisitLedger ◄┘   (shared by the whole fleet)
//! ```
//!
//! | Gate | Where | Failure result |
//! |------|-------|----------------|
//! | elevation > min | eligibility | target dropped |
//! | revisit cooldown (fleet-wide) | eligibility | target dropped |
//! | slew ≤ max from last attitude | eligibility | target dropped |
//! | energy ≥ image cost | arbitration | idle |
//! | storage admits full image | arbitration | idle |
//! | lookahead reserve | arbitration | idle |
//!
//! Satellites earlier in the list claim targets first within a tick: the
//! ledger write in arbitration is visible to the next satellite's filter.

use thiserror::Error;

pub mod arbitration;
pub mod data;
pub mod eligibility;
pub mod energy;
pub mod geometry;
pub mod ledger;
pub mod loader;
pub mod lookahead;
pub mod report;
pub mod scenario;
pub mod simulation;

#[cfg(test)]
pub(crate) mod testing;

pub use arbitration::{Decision, Gate, Rejection, TaskAction};
pub use data::DataState;
pub use energy::{Activity, EnergyState};
pub use geometry::{GeometryPort, Sgp4Geometry};
pub use ledger::RevisitLedger;
pub use lookahead::LookaheadGuard;
pub use report::{OutputRow, RunReport, RunSummary};
pub use scenario::{LookaheadConfig, Satellite, SatelliteConfig, Scenario, Target};
pub use simulation::Simulation;

/// Minimum elevation for imaging and ground contact (degrees)
pub const DEFAULT_MIN_ELEVATION_DEG: f64 = 15.0;

/// Maximum slew from the last imaging attitude (degrees)
pub const DEFAULT_MAX_SLEW_DEG: f64 = 20.0;

/// Simulation step (seconds)
pub const DEFAULT_TIMESTEP_SEC: i64 = 60;

pub const DEFAULT_PRIORITY: i32 = 1;
pub const DEFAULT_REVISIT_HOURS: f64 = 12.0;
pub const DEFAULT_IMAGE_SIZE_MB: f64 = 50.0;
pub const DEFAULT_IMAGE_ENERGY_WH: f64 = 5.0;

/// Lookahead reserve floor (Wh)
pub const DEFAULT_RESERVE_WH: f64 = 10.0;

/// Lookahead horizon of worst-case idle discharge (minutes)
pub const DEFAULT_LOOKAHEAD_MINUTES: f64 = 10.0;

pub const DEFAULT_STORAGE_CAPACITY_MB: f64 = 500.0;
pub const DEFAULT_DOWNLINK_MBPS: f64 = 10.0;

/// Upper bound on ticks × satellites for one run
pub const MAX_OUTPUT_ROWS: u64 = 5_000_000;

#[derive(Error, Debug)]
pub enum TaskingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),
    #[error("No ground stations defined in scenario")]
    NoGroundStations,
    #[error("Ground station error: {0}")]
    Station(#[from] ground_stations::StationError),
    #[error("Geometry error: {0}")]
    Geometry(#[from] orbital_mechanics::OrbitalError),
    #[error("Unknown satellite: {0}")]
    UnknownSatellite(String),
    #[error("Simulation aborted at tick {tick} after an earlier error")]
    Aborted { tick: u64 },
}

impl TaskingError {
    /// True for errors raised before any tick runs because the input is unusable
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            TaskingError::Json(_)
                | TaskingError::InvalidScenario(_)
                | TaskingError::NoGroundStations
                | TaskingError::Station(_)
                | TaskingError::Geometry(orbital_mechanics::OrbitalError::InvalidTle(_))
        )
    }
}

pub type Result<T> = std::result::Result<T, TaskingError>;

/// Build the SGP4 geometry for a scenario and run it to completion
pub fn run_scenario(scenario: Scenario) -> Result<RunReport> {
    let geometry = Sgp4Geometry::from_satellites(&scenario.satellites)?;
    let mut simulation = Simulation::new(scenario)?;
    simulation.run(&geometry)
}

/// Round half away from zero to `places` decimals
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}
