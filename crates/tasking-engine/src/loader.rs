//! Scenario and target loading from JSON files

use crate::scenario::{LookaheadConfig, SatelliteConfig, Scenario, Target, TwoLineElements};
use crate::{
    Result, TaskingError, DEFAULT_DOWNLINK_MBPS, DEFAULT_IMAGE_ENERGY_WH, DEFAULT_IMAGE_SIZE_MB,
    DEFAULT_MAX_SLEW_DEG, DEFAULT_MIN_ELEVATION_DEG, DEFAULT_PRIORITY, DEFAULT_REVISIT_HOURS,
    DEFAULT_STORAGE_CAPACITY_MB, DEFAULT_TIMESTEP_SEC,
};
use chrono::{DateTime, Duration, Utc};
use ground_stations::{GeoLocation, GroundStation, StationRegistry};
use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{info, warn};

/// Ids end up in action labels and CSV cells: whitespace becomes `_`,
/// anything outside alphanumerics and `-_.` is dropped
pub fn sanitize_id(id: &str) -> String {
    id.trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_alphanumeric() || "-_.".contains(*c))
        .take(128)
        .collect()
}

fn sanitized_or(id: Option<String>, fallback: impl FnOnce() -> String) -> String {
    match id.as_deref().map(sanitize_id) {
        Some(clean) if !clean.is_empty() => clean,
        _ => fallback(),
    }
}

fn required<T>(value: Option<T>, what: impl FnOnce() -> String) -> Result<T> {
    value.ok_or_else(|| TaskingError::InvalidScenario(format!("missing {}", what())))
}

/// Raw simulation window from JSON
#[derive(Debug, Default, Deserialize)]
struct RawSimulation {
    start_time: Option<DateTime<Utc>>,
    duration_minutes: Option<f64>,
    #[serde(alias = "timestep_sec")]
    timestep_seconds: Option<f64>,
}

/// Raw satellite from JSON
#[derive(Debug, Deserialize)]
struct RawSatellite {
    name: Option<String>,
    tle: Option<Vec<String>>,
    #[serde(alias = "energy_capacity_wh")]
    battery_wh: Option<f64>,
    initial_battery_wh: Option<f64>,
    charge_rate_w: Option<f64>,
    imaging_power_w: Option<f64>,
    downlink_power_w: Option<f64>,
    idle_power_w: Option<f64>,
    storage_capacity_mb: Option<f64>,
    initial_storage_mb: Option<f64>,
    downlink_bandwidth_mbps: Option<f64>,
}

/// Raw ground station from JSON
#[derive(Debug, Deserialize)]
struct RawStation {
    name: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    altitude_m: Option<f64>,
}

/// Raw scenario file; older files put the window at the top level
#[derive(Debug, Deserialize)]
struct RawScenario {
    simulation: Option<RawSimulation>,
    duration_minutes: Option<f64>,
    #[serde(alias = "timestep_sec")]
    timestep_seconds: Option<f64>,
    min_elevation_deg: Option<f64>,
    max_slew_deg: Option<f64>,
    lookahead: Option<LookaheadConfig>,
    satellites: Option<Vec<RawSatellite>>,
    ground_stations: Option<Vec<RawStation>>,
}

/// Raw target from JSON
#[derive(Debug, Deserialize)]
struct RawTarget {
    name: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    priority: Option<i32>,
    revisit_hours: Option<f64>,
    image_size_mb: Option<f64>,
    image_energy_wh: Option<f64>,
}

fn read_json(path: &Path) -> Result<Value> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Load targets from a JSON file
pub fn load_targets(path: impl AsRef<Path>) -> Result<Vec<Target>> {
    let path = path.as_ref();
    info!("Loading targets from {:?}", path);
    parse_targets(read_json(path)?)
}

/// Accepts a bare array or an object with a `targets` array.
/// Entries without usable coordinates are skipped.
pub fn parse_targets(value: Value) -> Result<Vec<Target>> {
    let raw: Vec<RawTarget> = if let Some(list) = value.get("targets") {
        serde_json::from_value(list.clone())?
    } else if value.is_array() {
        serde_json::from_value(value)?
    } else {
        return Err(TaskingError::InvalidScenario(
            "targets must be a JSON array".to_string(),
        ));
    };

    let mut targets = Vec::with_capacity(raw.len());
    let mut skipped = 0;

    for (i, entry) in raw.into_iter().enumerate() {
        let location = match (entry.lat, entry.lon) {
            (Some(lat), Some(lon)) => GeoLocation::new(lat, lon),
            _ => {
                skipped += 1;
                continue;
            }
        };
        if !location.is_valid() {
            skipped += 1;
            continue;
        }

        targets.push(Target {
            id: sanitized_or(entry.name, || format!("target-{}", i)),
            location,
            priority: entry.priority.unwrap_or(DEFAULT_PRIORITY),
            revisit_hours: entry.revisit_hours.unwrap_or(DEFAULT_REVISIT_HOURS),
            image_size_mb: entry.image_size_mb.unwrap_or(DEFAULT_IMAGE_SIZE_MB),
            image_energy_wh: entry.image_energy_wh.unwrap_or(DEFAULT_IMAGE_ENERGY_WH),
        });
    }

    info!(
        "Loaded {} targets ({} skipped for missing coords)",
        targets.len(),
        skipped
    );

    Ok(targets)
}

/// Load the scenario file and attach `targets`
pub fn load_scenario(path: impl AsRef<Path>, targets: Vec<Target>) -> Result<Scenario> {
    let path = path.as_ref();
    info!("Loading scenario from {:?}", path);
    parse_scenario(read_json(path)?, targets)
}

/// Load both files
pub fn load_inputs(
    scenario_path: impl AsRef<Path>,
    targets_path: impl AsRef<Path>,
) -> Result<Scenario> {
    let targets = load_targets(targets_path)?;
    load_scenario(scenario_path, targets)
}

pub fn parse_scenario(value: Value, targets: Vec<Target>) -> Result<Scenario> {
    let raw: RawScenario = serde_json::from_value(value)?;
    let window = raw.simulation.unwrap_or_default();

    let start_time = window.start_time.unwrap_or_else(Utc::now);
    let duration_minutes = required(window.duration_minutes.or(raw.duration_minutes), || {
        "simulation.duration_minutes".to_string()
    })?;
    let timestep_seconds = window
        .timestep_seconds
        .or(raw.timestep_seconds)
        .unwrap_or(DEFAULT_TIMESTEP_SEC as f64);

    if !duration_minutes.is_finite() || duration_minutes < 0.0 {
        return Err(TaskingError::InvalidScenario(format!(
            "duration_minutes {} must be >= 0",
            duration_minutes
        )));
    }
    if !timestep_seconds.is_finite() || timestep_seconds <= 0.0 {
        return Err(TaskingError::InvalidScenario(format!(
            "timestep_seconds {} must be > 0",
            timestep_seconds
        )));
    }

    let raw_satellites = raw.satellites.unwrap_or_default();
    let mut satellites = Vec::with_capacity(raw_satellites.len());
    for (i, sat) in raw_satellites.into_iter().enumerate() {
        satellites.push(satellite_config(i, sat)?);
    }

    let raw_stations = raw.ground_stations.unwrap_or_default();
    if raw_stations.is_empty() {
        return Err(TaskingError::NoGroundStations);
    }
    let mut stations = Vec::with_capacity(raw_stations.len());
    for (i, station) in raw_stations.into_iter().enumerate() {
        let id = sanitized_or(station.name, || format!("gs-{}", i));
        let lat = required(station.lat, || format!("lat for ground station {}", id))?;
        let lon = required(station.lon, || format!("lon for ground station {}", id))?;
        let location = GeoLocation::new(lat, lon).with_altitude(station.altitude_m.unwrap_or(0.0));
        stations.push(GroundStation::new(id, location));
    }

    let scenario = Scenario {
        start_time,
        duration: Duration::milliseconds((duration_minutes * 60_000.0).round() as i64),
        timestep: Duration::milliseconds((timestep_seconds * 1000.0).round() as i64),
        min_elevation_deg: raw.min_elevation_deg.unwrap_or(DEFAULT_MIN_ELEVATION_DEG),
        max_slew_deg: raw.max_slew_deg.unwrap_or(DEFAULT_MAX_SLEW_DEG),
        lookahead: raw.lookahead.unwrap_or_default(),
        satellites,
        ground_stations: StationRegistry::from_stations(stations)?,
        targets,
    };
    scenario.validate()?;

    info!(
        "Scenario: start {}, {} ticks, {} satellites, {} ground stations, {} targets",
        scenario.start_time,
        scenario.tick_count(),
        scenario.satellites.len(),
        scenario.ground_stations.len(),
        scenario.targets.len()
    );

    Ok(scenario)
}

fn satellite_config(index: usize, raw: RawSatellite) -> Result<SatelliteConfig> {
    let id = sanitized_or(raw.name, || format!("sat-{}", index));
    let field = |name: &str| format!("{} for satellite {}", name, id);

    let tle = required(raw.tle, || field("tle"))?;
    let elements = match <[String; 2]>::try_from(tle) {
        Ok([line1, line2]) => TwoLineElements { line1, line2 },
        Err(lines) => {
            return Err(TaskingError::InvalidScenario(format!(
                "satellite {}: tle must have exactly 2 lines, got {}",
                id,
                lines.len()
            )))
        }
    };

    let battery_wh = required(raw.battery_wh, || field("battery_wh"))?;
    let initial_battery_wh = raw.initial_battery_wh.unwrap_or(battery_wh);
    if initial_battery_wh > battery_wh {
        warn!(
            satellite = %id,
            initial_battery_wh,
            battery_wh,
            "initial battery above capacity, clamping"
        );
    }

    Ok(SatelliteConfig {
        elements,
        battery_wh,
        initial_battery_wh,
        charge_rate_w: required(raw.charge_rate_w, || field("charge_rate_w"))?,
        imaging_power_w: required(raw.imaging_power_w, || field("imaging_power_w"))?,
        downlink_power_w: required(raw.downlink_power_w, || field("downlink_power_w"))?,
        idle_power_w: required(raw.idle_power_w, || field("idle_power_w"))?,
        storage_capacity_mb: raw.storage_capacity_mb.unwrap_or(DEFAULT_STORAGE_CAPACITY_MB),
        initial_storage_mb: raw.initial_storage_mb.unwrap_or(0.0),
        downlink_mbps: raw.downlink_bandwidth_mbps.unwrap_or(DEFAULT_DOWNLINK_MBPS),
        id,
    })
}
