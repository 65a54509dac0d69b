//! Onboard storage: whole-image admission and bandwidth-limited downlink.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataState {
    capacity_mb: f64,
    stored_mb: f64,
    pub downlink_mbps: f64,
}

impl DataState {
    /// Initial fill is clamped into `[0, capacity]`
    pub fn new(capacity_mb: f64, initial_mb: f64, downlink_mbps: f64) -> Self {
        let capacity_mb = capacity_mb.max(0.0);
        Self {
            capacity_mb,
            stored_mb: initial_mb.clamp(0.0, capacity_mb),
            downlink_mbps,
        }
    }

    pub fn capacity_mb(&self) -> f64 {
        self.capacity_mb
    }

    pub fn stored_mb(&self) -> f64 {
        self.stored_mb
    }

    /// Trial half of `store`: would an image of `size_mb` fit right now
    pub fn can_store(&self, size_mb: f64) -> bool {
        self.stored_mb + size_mb <= self.capacity_mb
    }

    /// Stores the whole image or nothing
    pub fn store(&mut self, size_mb: f64) -> bool {
        if self.can_store(size_mb) {
            self.stored_mb += size_mb;
            true
        } else {
            false
        }
    }

    /// MB the link can move in `dt_minutes` (Mbps → MB/min)
    pub fn transfer_capacity_mb(&self, dt_minutes: f64) -> f64 {
        self.downlink_mbps / 8.0 * 60.0 * dt_minutes
    }

    /// Drains up to one step's worth of data; returns MB sent
    pub fn downlink(&mut self, dt_minutes: f64) -> f64 {
        let sent = self.stored_mb.min(self.transfer_capacity_mb(dt_minutes)).max(0.0);
        self.stored_mb -= sent;
        sent
    }

    /// Percent of capacity in use; 0 for zero capacity
    pub fn fill_level(&self) -> f64 {
        if self.capacity_mb > 0.0 {
            self.stored_mb / self.capacity_mb * 100.0
        } else {
            0.0
        }
    }
}
