// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics for admission decisions.

use prometheus::{Encoder, Gauge, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Admission counters, registered in their own registry.
#[derive(Clone)]
pub struct AdmissionMetrics {
    registry: Registry,
    /// Decisions by outcome label (`admitted`, `budget_exhausted`, ...)
    decisions: IntCounterVec,
    /// Classifier calls that fell back to the safe default
    classifier_failures: IntCounterVec,
    /// Tolerance budget value, refreshed on each scrape
    budget_value: Gauge,
    /// Hourly resets performed
    resets: IntCounter,
}

impl AdmissionMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("registrar".to_string()), None)?;

        let decisions = IntCounterVec::new(
            Opts::new("admission_decisions_total", "Admission decisions by outcome"),
            &["outcome"],
        )?;
        let classifier_failures = IntCounterVec::new(
            Opts::new(
                "classifier_failures_total",
                "Classifier calls resolved to the safe default",
            ),
            &["check"],
        )?;
        let budget_value = Gauge::new(
            "tolerance_budget_value",
            "Current tolerance budget value",
        )?;
        let resets = IntCounter::new("periodic_resets_total", "Quota and budget resets")?;

        registry.register(Box::new(decisions.clone()))?;
        registry.register(Box::new(classifier_failures.clone()))?;
        registry.register(Box::new(budget_value.clone()))?;
        registry.register(Box::new(resets.clone()))?;
        budget_value.set(1.0);

        Ok(Self {
            registry,
            decisions,
            classifier_failures,
            budget_value,
            resets,
        })
    }

    pub fn record_decision(&self, outcome: &str) {
        self.decisions.with_label_values(&[outcome]).inc();
    }

    pub fn record_classifier_failure(&self, check: &str) {
        self.classifier_failures.with_label_values(&[check]).inc();
    }

    pub fn set_budget(&self, value: f64) {
        self.budget_value.set(value);
    }

    pub fn record_reset(&self) {
        self.resets.inc();
    }

    pub fn decisions(&self, outcome: &str) -> u64 {
        self.decisions.with_label_values(&[outcome]).get()
    }

    /// Render in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if encoder.encode(&self.registry.gather(), &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
