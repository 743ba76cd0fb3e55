// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Metrics collection for attack simulation results.

use registrar_admission::Verdict;
use std::collections::HashMap;
use std::fmt;

/// Counts verdicts by label during an attack simulation.
#[derive(Debug, Default)]
pub struct AttackMetrics {
    outcomes: HashMap<&'static str, usize>,
    requests_per_identity: HashMap<String, usize>,
    /// Verdict labels in request order
    sequence: Vec<&'static str>,
}

impl AttackMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, identity: &str, verdict: &Verdict) {
        let label = verdict.label();
        *self.outcomes.entry(label).or_insert(0) += 1;
        *self
            .requests_per_identity
            .entry(identity.to_string())
            .or_insert(0) += 1;
        self.sequence.push(label);
    }

    pub fn total_requests(&self) -> usize {
        self.sequence.len()
    }

    pub fn count(&self, label: &str) -> usize {
        self.outcomes.get(label).copied().unwrap_or(0)
    }

    pub fn admitted(&self) -> usize {
        self.count("admitted")
    }

    pub fn unique_identities(&self) -> usize {
        self.requests_per_identity.len()
    }

    pub fn sequence(&self) -> &[&'static str] {
        &self.sequence
    }

    pub fn block_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.0
        } else {
            (total - self.admitted()) as f64 / total as f64
        }
    }
}

impl fmt::Display for AttackMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Attack Simulation Report ===")?;
        writeln!(f, "Total requests:     {}", self.total_requests())?;
        writeln!(f, "Unique identities:  {}", self.unique_identities())?;
        writeln!(f, "Block rate:         {:.1}%", self.block_rate() * 100.0)?;
        let mut outcomes: Vec<_> = self.outcomes.iter().collect();
        outcomes.sort();
        for (label, count) in outcomes {
            writeln!(f, "  {label:<20}{count}")?;
        }
        Ok(())
    }
}
