//! Fleet-wide record of when each target was last imaged.

use crate::scenario::Target;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::warn;

/// Shared across every satellite: one cooldown per target regardless of imager
#[derive(Debug, Clone, Default)]
pub struct RevisitLedger {
    last_imaged: HashMap<String, DateTime<Utc>>,
}

impl RevisitLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_imaged(&self, target_id: &str) -> Option<DateTime<Utc>> {
        self.last_imaged.get(target_id).copied()
    }

    pub fn in_cooldown(&self, target: &Target, now: DateTime<Utc>) -> bool {
        match self.last_imaged(&target.id) {
            Some(last) => now.signed_duration_since(last) < target.revisit_cooldown(),
            None => false,
        }
    }

    /// Timestamps only move forward; an older write is ignored
    pub fn record(&mut self, target_id: &str, at: DateTime<Utc>) {
        match self.last_imaged.get_mut(target_id) {
            Some(last) if *last > at => {
                warn!(target_id, %at, last = %last, "ignoring out-of-order ledger write");
            }
            Some(last) => *last = at,
            None => {
                self.last_imaged.insert(target_id.to_string(), at);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.last_imaged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_imaged.is_empty()
    }
}
