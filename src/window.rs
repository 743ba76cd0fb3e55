// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Bounded FIFO of recently admitted registrations, used as context for
//! spam scoring.

use serde::Serialize;
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// A recently admitted domain and the target it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityEntry {
    pub name: String,
    pub target: String,
}

/// Recent-activity window.
///
/// Eviction follows insertion order. Re-adding a name already present only
/// updates its target.
#[derive(Debug)]
pub struct RecentActivityWindow {
    capacity: usize,
    /// Oldest at the front
    entries: Mutex<VecDeque<ActivityEntry>>,
}

impl RecentActivityWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record an admission.
    pub async fn add(&self, name: impl Into<String>, target: impl Into<String>) {
        let name = name.into();
        let target = target.into();
        if self.capacity == 0 {
            return;
        }

        let mut entries = self.entries.lock().await;
        if let Some(existing) = entries.iter_mut().find(|e| e.name == name) {
            existing.target = target;
            return;
        }

        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(ActivityEntry { name, target });
    }

    /// Copy of the window, most recent first.
    pub async fn snapshot(&self) -> Vec<ActivityEntry> {
        self.entries.lock().await.iter().rev().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
