//! Scenario model: the immutable run configuration and per-satellite state.

use crate::data::DataState;
use crate::energy::EnergyState;
use crate::{
    Result, TaskingError, DEFAULT_LOOKAHEAD_MINUTES, DEFAULT_RESERVE_WH, MAX_OUTPUT_ROWS,
};
use chrono::{DateTime, Duration, Utc};
use ground_stations::{GeoLocation, StationRegistry};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A ground point to image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    pub location: GeoLocation,
    /// Higher is preferred
    pub priority: i32,
    pub revisit_hours: f64,
    pub image_size_mb: f64,
    pub image_energy_wh: f64,
}

impl Target {
    pub fn revisit_cooldown(&self) -> Duration {
        Duration::milliseconds((self.revisit_hours * 3_600_000.0).round() as i64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TwoLineElements {
    pub line1: String,
    pub line2: String,
}

/// Static description of one satellite, as loaded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatelliteConfig {
    pub id: String,
    pub elements: TwoLineElements,
    pub battery_wh: f64,
    pub initial_battery_wh: f64,
    pub charge_rate_w: f64,
    pub imaging_power_w: f64,
    pub downlink_power_w: f64,
    pub idle_power_w: f64,
    pub storage_capacity_mb: f64,
    pub initial_storage_mb: f64,
    pub downlink_mbps: f64,
}

/// Live satellite: resource state plus the attitude it last imaged with
#[derive(Debug, Clone)]
pub struct Satellite {
    pub id: String,
    pub elements: TwoLineElements,
    pub energy: EnergyState,
    pub data: DataState,
    /// Unset until the first image is taken
    pub attitude: Option<Vector3<f64>>,
    /// Local record only; cooldown reads the fleet ledger
    pub last_imaged: HashMap<String, DateTime<Utc>>,
}

impl From<&SatelliteConfig> for Satellite {
    fn from(config: &SatelliteConfig) -> Self {
        Self {
            id: config.id.clone(),
            elements: config.elements.clone(),
            energy: EnergyState::new(
                config.battery_wh,
                config.initial_battery_wh,
                config.charge_rate_w,
                config.imaging_power_w,
                config.downlink_power_w,
                config.idle_power_w,
            ),
            data: DataState::new(
                config.storage_capacity_mb,
                config.initial_storage_mb,
                config.downlink_mbps,
            ),
            attitude: None,
            last_imaged: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LookaheadConfig {
    #[serde(default = "default_horizon")]
    pub horizon_minutes: f64,
    #[serde(default = "default_reserve")]
    pub reserve_wh: f64,
    /// Credit charging over the horizon when currently sunlit
    #[serde(default)]
    pub credit_sunlight: bool,
}

fn default_horizon() -> f64 {
    DEFAULT_LOOKAHEAD_MINUTES
}

fn default_reserve() -> f64 {
    DEFAULT_RESERVE_WH
}

impl Default for LookaheadConfig {
    fn default() -> Self {
        Self {
            horizon_minutes: DEFAULT_LOOKAHEAD_MINUTES,
            reserve_wh: DEFAULT_RESERVE_WH,
            credit_sunlight: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Scenario {
    pub start_time: DateTime<Utc>,
    pub duration: Duration,
    pub timestep: Duration,
    pub min_elevation_deg: f64,
    pub max_slew_deg: f64,
    pub lookahead: LookaheadConfig,
    /// Evaluation order within a tick
    pub satellites: Vec<SatelliteConfig>,
    pub ground_stations: StationRegistry,
    pub targets: Vec<Target>,
}

impl Scenario {
    pub fn tick_count(&self) -> u64 {
        let step = self.timestep.num_milliseconds();
        if step <= 0 {
            return 0;
        }
        (self.duration.num_milliseconds().max(0) / step) as u64
    }

    pub fn dt_minutes(&self) -> f64 {
        self.timestep.num_milliseconds() as f64 / 60_000.0
    }

    pub fn time_at(&self, tick: u64) -> DateTime<Utc> {
        self.start_time + Duration::milliseconds(self.timestep.num_milliseconds() * tick as i64)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(TaskingError::InvalidScenario(msg));

        if self.timestep <= Duration::zero() {
            return invalid("timestep must be positive".to_string());
        }
        if self.duration < Duration::zero() {
            return invalid("duration must not be negative".to_string());
        }
        if !(-90.0..=90.0).contains(&self.min_elevation_deg) {
            return invalid(format!("min_elevation_deg {} out of range", self.min_elevation_deg));
        }
        if !(0.0..=180.0).contains(&self.max_slew_deg) {
            return invalid(format!("max_slew_deg {} out of range", self.max_slew_deg));
        }
        if self.lookahead.horizon_minutes < 0.0 || !self.lookahead.reserve_wh.is_finite() {
            return invalid("lookahead horizon must be non-negative".to_string());
        }
        if self.satellites.is_empty() {
            return invalid("no satellites defined".to_string());
        }
        if self.start_time.checked_add_signed(self.duration).is_none() {
            return invalid("run ends outside the representable time range".to_string());
        }
        let rows = self.tick_count().saturating_mul(self.satellites.len() as u64);
        if rows > MAX_OUTPUT_ROWS {
            return invalid(format!(
                "{} ticks x {} satellites exceeds {} output rows",
                self.tick_count(),
                self.satellites.len(),
                MAX_OUTPUT_ROWS
            ));
        }

        let mut seen = HashSet::new();
        for sat in &self.satellites {
            if !seen.insert(sat.id.as_str()) {
                return invalid(format!("duplicate satellite {}", sat.id));
            }
            let quantities = [
                ("battery_wh", sat.battery_wh),
                ("charge_rate_w", sat.charge_rate_w),
                ("imaging_power_w", sat.imaging_power_w),
                ("downlink_power_w", sat.downlink_power_w),
                ("idle_power_w", sat.idle_power_w),
                ("storage_capacity_mb", sat.storage_capacity_mb),
                ("downlink_bandwidth_mbps", sat.downlink_mbps),
            ];
            if let Some((name, value)) = quantities.iter().find(|(_, v)| !(*v >= 0.0)) {
                return invalid(format!("satellite {}: {} = {} must be >= 0", sat.id, name, value));
            }
        }

        let mut seen = HashSet::new();
        for target in &self.targets {
            if !seen.insert(target.id.as_str()) {
                return invalid(format!("duplicate target {}", target.id));
            }
            if !target.location.is_valid() {
                return invalid(format!("target {} has invalid coordinates", target.id));
            }
            if !(target.revisit_hours >= 0.0
                && target.image_size_mb >= 0.0
                && target.image_energy_wh >= 0.0)
            {
                return invalid(format!("target {} has negative sizing", target.id));
            }
        }

        Ok(())
    }
}
