// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Fixed-window hourly quotas per identity.
//!
//! Windows are globally synchronized: every count is cleared at once by the
//! periodic reset job, not relative to each identity's first request.

use crate::identity::Identity;
use crate::limiter::Registry;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Per-identity admission counter.
pub struct QuotaCounter {
    counts: Mutex<Registry<Identity, u32>>,
}

impl QuotaCounter {
    pub fn new(max_identities: usize) -> Self {
        Self {
            counts: Mutex::new(Registry::new(max_identities)),
        }
    }

    /// Count one admission for `identity` if it is still below `limit`.
    pub async fn allow(&self, identity: &Identity, limit: u32) -> bool {
        let mut counts = self.counts.lock().await;
        let count = counts.touch_or_insert(identity, || 0);
        if *count < limit {
            *count += 1;
            true
        } else {
            debug!(%identity, limit, "Hourly quota exhausted");
            false
        }
    }

    /// Admissions counted for `identity` in the current window.
    pub async fn count(&self, identity: &Identity) -> u32 {
        self.counts
            .lock()
            .await
            .get(identity)
            .copied()
            .unwrap_or(0)
    }

    /// Start a new window for every identity.
    pub async fn reset(&self) {
        let mut counts = self.counts.lock().await;
        let cleared = counts.len();
        counts.clear();
        info!(cleared, "Hourly quotas reset");
    }
}
