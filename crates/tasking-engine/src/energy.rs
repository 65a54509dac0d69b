//! Battery model: solar charging plus a per-activity power draw.

use serde::{Deserialize, Serialize};

/// What the satellite spends a tick doing, for power accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activity {
    Imaging,
    Downlink,
    Idle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyState {
    capacity_wh: f64,
    level_wh: f64,
    pub charge_rate_w: f64,
    pub imaging_power_w: f64,
    pub downlink_power_w: f64,
    pub idle_power_w: f64,
}

impl EnergyState {
    /// Initial level is clamped into `[0, capacity]`
    pub fn new(
        capacity_wh: f64,
        initial_wh: f64,
        charge_rate_w: f64,
        imaging_power_w: f64,
        downlink_power_w: f64,
        idle_power_w: f64,
    ) -> Self {
        let capacity_wh = capacity_wh.max(0.0);
        Self {
            capacity_wh,
            level_wh: initial_wh.clamp(0.0, capacity_wh),
            charge_rate_w,
            imaging_power_w,
            downlink_power_w,
            idle_power_w,
        }
    }

    pub fn capacity_wh(&self) -> f64 {
        self.capacity_wh
    }

    pub fn level_wh(&self) -> f64 {
        self.level_wh
    }

    pub fn power_draw_w(&self, activity: Activity) -> f64 {
        match activity {
            Activity::Imaging => self.imaging_power_w,
            Activity::Downlink => self.downlink_power_w,
            Activity::Idle => self.idle_power_w,
        }
    }

    /// Charge (if sunlit) then discharge for `activity` over one step
    pub fn step(&mut self, sunlit: bool, activity: Activity, dt_minutes: f64) -> f64 {
        let dt_hours = dt_minutes / 60.0;
        if sunlit {
            self.charge(dt_hours);
        }
        self.discharge(activity, dt_hours);
        self.level_wh
    }

    pub(crate) fn charge(&mut self, dt_hours: f64) {
        self.level_wh = (self.level_wh + self.charge_rate_w * dt_hours).min(self.capacity_wh);
    }

    pub(crate) fn discharge(&mut self, activity: Activity, dt_hours: f64) {
        self.level_wh = (self.level_wh - self.power_draw_w(activity) * dt_hours).max(0.0);
    }

    pub fn can_perform(&self, required_wh: f64) -> bool {
        self.level_wh >= required_wh
    }

    /// Percent of capacity; 0 for a zero-capacity battery
    pub fn state_of_charge(&self) -> f64 {
        if self.capacity_wh > 0.0 {
            self.level_wh / self.capacity_wh * 100.0
        } else {
            0.0
        }
    }
}
