// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Attack simulation patterns for security testing.

use super::generators;
use super::metrics::AttackMetrics;
use registrar_admission::{AdmissionDecider, AdmissionPolicy, Candidate, Identity};
use std::time::Duration;

/// Attack pattern configuration.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Total number of registration attempts
    pub total_requests: usize,
    /// Number of unique identities to rotate through
    pub unique_identities: usize,
    /// Use spam-shaped names instead of plausible ones
    pub spam_wave: bool,
    /// Pause between attempts
    pub pause: Duration,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            total_requests: 100,
            unique_identities: 1,
            spam_wave: false,
            pause: Duration::ZERO,
        }
    }
}

/// Predefined attack patterns.
impl AttackConfig {
    /// Single IP hammering the public endpoint.
    pub fn single_ip_flood() -> Self {
        Self {
            total_requests: 200,
            unique_identities: 1,
            ..Default::default()
        }
    }

    /// Many IPs, one attempt each, all at once.
    pub fn distributed_flood() -> Self {
        Self {
            total_requests: 300,
            unique_identities: 300,
            ..Default::default()
        }
    }

    /// Distributed and slow enough to dodge the global burst bucket.
    pub fn slow_distributed_flood() -> Self {
        Self {
            total_requests: 150,
            unique_identities: 150,
            pause: Duration::from_secs(61),
            ..Default::default()
        }
    }

    /// Repetitive names pointing at one landing page.
    pub fn spam_wave() -> Self {
        Self {
            total_requests: 30,
            unique_identities: 30,
            spam_wave: true,
            pause: Duration::from_secs(61),
        }
    }
}

/// Drive `decider` with the attack described by `config`.
pub async fn run_attack(
    config: &AttackConfig,
    decider: &AdmissionDecider,
    policy: &AdmissionPolicy,
) -> AttackMetrics {
    let identities = generators::generate_ips(config.unique_identities);
    let candidates = if config.spam_wave {
        generators::generate_spam_wave(config.total_requests, "dev")
    } else {
        generators::generate_candidates(config.total_requests, "dev")
    };

    attack_with(decider, policy, &identities, &candidates, config.pause).await
}

/// Send `candidates[i]` from `identities[i % len]`, in order.
pub async fn attack_with(
    decider: &AdmissionDecider,
    policy: &AdmissionPolicy,
    identities: &[Identity],
    candidates: &[Candidate],
    pause: Duration,
) -> AttackMetrics {
    let mut metrics = AttackMetrics::new();
    for (i, candidate) in candidates.iter().enumerate() {
        let identity = &identities[i % identities.len()];
        let verdict = decider
            .decide(identity, candidate, policy)
            .await
            .expect("memory store never fails");
        metrics.record(identity.as_str(), &verdict);

        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }
    metrics
}
