//! Simulation driver: ticks, satellite order and output rows

use crate::arbitration::{arbitrate, Decision, TickContext};
use crate::eligibility::{filter_targets, ground_in_view, EligibilityLimits};
use crate::geometry::GeometryPort;
use crate::ledger::RevisitLedger;
use crate::lookahead::LookaheadGuard;
use crate::report::{OutputRow, RunReport, RunSummary, SatelliteSummary};
use crate::scenario::{Satellite, Scenario};
use crate::{Result, TaskingError};
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{debug, info};

pub struct Simulation {
    scenario: Scenario,
    satellites: Vec<Satellite>,
    ledger: RevisitLedger,
    guard: LookaheadGuard,
    limits: EligibilityLimits,
    tick: u64,
    /// Set when a tick was abandoned part way through
    failed: bool,
    counters: BTreeMap<String, SatelliteSummary>,
}

impl Simulation {
    pub fn new(scenario: Scenario) -> Result<Self> {
        scenario.validate()?;

        let satellites: Vec<Satellite> = scenario.satellites.iter().map(Satellite::from).collect();
        let counters = satellites
            .iter()
            .map(|s| (s.id.clone(), SatelliteSummary::default()))
            .collect();

        Ok(Self {
            guard: LookaheadGuard::from(scenario.lookahead),
            limits: EligibilityLimits {
                min_elevation_deg: scenario.min_elevation_deg,
                max_slew_deg: scenario.max_slew_deg,
            },
            satellites,
            ledger: RevisitLedger::new(),
            tick: 0,
            failed: false,
            counters,
            scenario,
        })
    }

    pub fn ledger(&self) -> &RevisitLedger {
        &self.ledger
    }

    /// Index of the next tick to run
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn is_finished(&self) -> bool {
        self.tick >= self.scenario.tick_count()
    }

    /// Runs one tick, satellites in configured order, and returns its rows.
    ///
    /// Rows come back only once every satellite has decided. A geometry error
    /// abandons the tick after earlier satellites have committed their actions;
    /// every later call returns [`TaskingError::Aborted`].
    /// Returns no rows once the run is finished.
    pub fn step<G: GeometryPort + ?Sized>(&mut self, geometry: &G) -> Result<Vec<OutputRow>> {
        if self.failed {
            return Err(TaskingError::Aborted { tick: self.tick });
        }
        if self.is_finished() {
            return Ok(Vec::new());
        }

        let rows = self.advance(geometry);
        if rows.is_err() {
            self.failed = true;
        }
        rows
    }

    fn advance<G: GeometryPort + ?Sized>(&mut self, geometry: &G) -> Result<Vec<OutputRow>> {
        let now = self.scenario.time_at(self.tick);
        let dt_minutes = self.scenario.dt_minutes();
        let mut rows = Vec::with_capacity(self.satellites.len());
        let mut decisions: Vec<Decision> = Vec::with_capacity(self.satellites.len());

        for satellite in self.satellites.iter_mut() {
            let sunlit = geometry.is_sunlit(satellite, now)?;
            let eligibility = filter_targets(
                geometry,
                satellite,
                &self.scenario.targets,
                &self.ledger,
                &self.limits,
                now,
            )?;
            let over_ground = ground_in_view(
                geometry,
                satellite,
                &self.scenario.ground_stations,
                self.limits.min_elevation_deg,
                now,
            )?;

            let ctx = TickContext {
                tick: self.tick,
                time: now,
                dt_minutes,
                sunlit,
                over_ground,
            };
            let decision = arbitrate(
                satellite,
                &eligibility.eligible,
                &ctx,
                &mut self.ledger,
                &self.guard,
            );

            rows.push(OutputRow::capture(
                now,
                satellite,
                &decision.action,
                sunlit,
                eligibility.over_target(),
                over_ground,
            ));
            decisions.push(decision);
        }

        for (satellite, decision) in self.satellites.iter().zip(&decisions) {
            if let Some(counter) = self.counters.get_mut(&satellite.id) {
                counter.record(decision);
                counter.final_energy_wh = satellite.energy.level_wh();
                counter.final_data_mb = satellite.data.stored_mb();
            }
        }

        debug!(tick = self.tick, time = %now, "tick complete");
        self.tick += 1;
        Ok(rows)
    }

    /// Runs the remaining ticks
    pub fn run<G: GeometryPort + ?Sized>(&mut self, geometry: &G) -> Result<RunReport> {
        let ticks = self.scenario.tick_count();
        info!(
            "Simulating {} ticks of {:.2} min for {} satellites, {} targets, {} ground stations",
            ticks,
            self.scenario.dt_minutes(),
            self.satellites.len(),
            self.scenario.targets.len(),
            self.scenario.ground_stations.len()
        );

        let mut rows = Vec::new();
        while !self.is_finished() {
            rows.extend(self.step(geometry)?);
        }

        debug!(targets_imaged = self.ledger.len(), "revisit ledger at end of run");
        Ok(self.report(rows))
    }

    fn report(&self, rows: Vec<OutputRow>) -> RunReport {
        RunReport {
            summary: RunSummary {
                ticks: self.tick,
                rows: rows.len(),
                start_time: self.scenario.start_time,
                generated_at: Utc::now(),
                satellites: self.counters.clone(),
            },
            rows,
        }
    }
}
