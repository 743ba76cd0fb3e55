// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Global tolerance budget.
//!
//! A process-wide scalar that starts at 1.0 and loses 0.01 per admitted
//! registration. It caps hourly volume (100 consumptions, then everything is
//! blocked) and doubles as the spam-score threshold, so registrations late in
//! the hour face a stricter bar.
//!
//! The value is kept as whole hundredths so 100 steps land exactly on zero.

use tokio::sync::Mutex;
use tracing::{debug, info};

/// Units in a full budget; one unit is 0.01.
const FULL_UNITS: u32 = 100;

/// Shared decaying budget.
#[derive(Debug)]
pub struct ToleranceBudget {
    units: Mutex<u32>,
}

impl Default for ToleranceBudget {
    fn default() -> Self {
        Self::new()
    }
}

impl ToleranceBudget {
    pub fn new() -> Self {
        Self {
            units: Mutex::new(FULL_UNITS),
        }
    }

    /// Consume one unit.
    ///
    /// Returns the post-decrement value produced by this call, or `None`
    /// without mutating when the budget is already exhausted. Callers must
    /// use the returned value as their spam threshold instead of re-reading
    /// the shared budget.
    pub async fn try_consume(&self) -> Option<f64> {
        let mut units = self.units.lock().await;
        if *units == 0 {
            debug!("Tolerance budget exhausted");
            return None;
        }
        *units -= 1;
        Some(to_value(*units))
    }

    /// Current value in [0.0, 1.0].
    pub async fn current_value(&self) -> f64 {
        to_value(*self.units.lock().await)
    }

    /// Restore the budget to 1.0.
    pub async fn reset(&self) {
        let mut units = self.units.lock().await;
        let previous = to_value(*units);
        *units = FULL_UNITS;
        info!(previous, "Tolerance budget reset");
    }
}

fn to_value(units: u32) -> f64 {
    f64::from(units) / f64::from(FULL_UNITS)
}
