//! Arbitration: choose and commit exactly one action per satellite per tick
//!
//! Imaging beats downlink beats idle. A chosen image must clear three gates,
//! checked in order with short-circuit: energy, storage, lookahead. Storage is
//! only allocated once every gate has passed, so a rejected image leaves the
//! data store untouched.

use crate::eligibility::EligibleTarget;
use crate::energy::Activity;
use crate::ledger::RevisitLedger;
use crate::lookahead::LookaheadGuard;
use crate::scenario::Satellite;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskAction {
    Idle,
    Image(String),
    Downlink,
}

impl TaskAction {
    pub fn activity(&self) -> Activity {
        match self {
            TaskAction::Idle => Activity::Idle,
            TaskAction::Image(_) => Activity::Imaging,
            TaskAction::Downlink => Activity::Downlink,
        }
    }
}

impl fmt::Display for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskAction::Idle => write!(f, "idle"),
            TaskAction::Image(target) => write!(f, "image:{}", target),
            TaskAction::Downlink => write!(f, "downlink"),
        }
    }
}

/// Feasibility check that turned an action into idle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gate {
    Energy,
    Storage,
    Lookahead,
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Gate::Energy => "energy",
            Gate::Storage => "storage",
            Gate::Lookahead => "lookahead",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub satellite: String,
    pub tick: u64,
    /// None for a rejected downlink
    pub candidate: Option<String>,
    pub gate: Gate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub action: TaskAction,
    pub downlinked_mb: f64,
    pub rejection: Option<Rejection>,
}

impl Decision {
    fn idle() -> Self {
        Self {
            action: TaskAction::Idle,
            downlinked_mb: 0.0,
            rejection: None,
        }
    }
}

/// Per-satellite inputs for one tick
#[derive(Debug, Clone, Copy)]
pub struct TickContext {
    pub tick: u64,
    pub time: DateTime<Utc>,
    pub dt_minutes: f64,
    pub sunlit: bool,
    pub over_ground: bool,
}

/// Highest priority first; ties go to the never-imaged, then the longest unserved.
/// Stable, so remaining ties keep configuration order.
pub fn select_candidate<'e, 't>(
    eligible: &'e [EligibleTarget<'t>],
    ledger: &RevisitLedger,
) -> Option<&'e EligibleTarget<'t>> {
    let mut ranked: Vec<&EligibleTarget<'t>> = eligible.iter().collect();
    ranked.sort_by(|a, b| {
        b.target
            .priority
            .cmp(&a.target.priority)
            // Option orders None before Some
            .then_with(|| ledger.last_imaged(&a.target.id).cmp(&ledger.last_imaged(&b.target.id)))
    });
    ranked.first().copied()
}

pub fn arbitrate(
    satellite: &mut Satellite,
    eligible: &[EligibleTarget<'_>],
    ctx: &TickContext,
    ledger: &mut RevisitLedger,
    guard: &LookaheadGuard,
) -> Decision {
    if let Some(candidate) = select_candidate(eligible, ledger) {
        let target = candidate.target;

        let failed = if !satellite.energy.can_perform(target.image_energy_wh) {
            Some(Gate::Energy)
        } else if !satellite.data.can_store(target.image_size_mb) {
            Some(Gate::Storage)
        } else if !guard.approves(&satellite.energy, ctx.sunlit, Activity::Imaging, ctx.dt_minutes)
        {
            Some(Gate::Lookahead)
        } else {
            None
        };

        if let Some(gate) = failed {
            satellite.energy.step(ctx.sunlit, Activity::Idle, ctx.dt_minutes);
            return reject(satellite, ctx, Some(target.id.clone()), gate);
        }

        satellite.data.store(target.image_size_mb);
        satellite.energy.step(ctx.sunlit, Activity::Imaging, ctx.dt_minutes);
        satellite.attitude = Some(candidate.pointing);
        satellite.last_imaged.insert(target.id.clone(), ctx.time);
        ledger.record(&target.id, ctx.time);

        debug!(
            satellite = %satellite.id,
            tick = ctx.tick,
            target_id = %target.id,
            priority = target.priority,
            slew_deg = ?candidate.slew_deg,
            "imaging"
        );

        return Decision {
            action: TaskAction::Image(target.id.clone()),
            downlinked_mb: 0.0,
            rejection: None,
        };
    }

    if ctx.over_ground && satellite.data.stored_mb() > 0.0 {
        let required_wh = satellite.energy.downlink_power_w * ctx.dt_minutes / 60.0;

        let failed = if !satellite.energy.can_perform(required_wh) {
            Some(Gate::Energy)
        } else if !guard.approves(&satellite.energy, ctx.sunlit, Activity::Downlink, ctx.dt_minutes)
        {
            Some(Gate::Lookahead)
        } else {
            None
        };

        if let Some(gate) = failed {
            satellite.energy.step(ctx.sunlit, Activity::Idle, ctx.dt_minutes);
            return reject(satellite, ctx, None, gate);
        }

        let sent = satellite.data.downlink(ctx.dt_minutes);
        if sent > 0.0 {
            satellite.energy.step(ctx.sunlit, Activity::Downlink, ctx.dt_minutes);
            debug!(satellite = %satellite.id, tick = ctx.tick, mb = sent, "downlink");
            return Decision {
                action: TaskAction::Downlink,
                downlinked_mb: sent,
                rejection: None,
            };
        }
    }

    satellite.energy.step(ctx.sunlit, Activity::Idle, ctx.dt_minutes);
    Decision::idle()
}

fn reject(
    satellite: &Satellite,
    ctx: &TickContext,
    candidate: Option<String>,
    gate: Gate,
) -> Decision {
    debug!(
        satellite = %satellite.id,
        tick = ctx.tick,
        candidate = candidate.as_deref().unwrap_or("downlink"),
        %gate,
        energy_wh = satellite.energy.level_wh(),
        data_mb = satellite.data.stored_mb(),
        "action rejected"
    );

    Decision {
        rejection: Some(Rejection {
            satellite: satellite.id.clone(),
            tick: ctx.tick,
            candidate,
            gate,
        }),
        ..Decision::idle()
    }
}
