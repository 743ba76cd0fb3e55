// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Periodic background jobs: quota reset, budget reset and registry sweep.
//!
//! Jobs run on tokio's clock, so tests with paused time can advance them
//! deterministically. Each job first fires one full period after it starts.

use crate::admission::AdmissionDecider;
use crate::config::AdmissionConfig;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Owned set of cancellable periodic jobs.
pub struct BackgroundJobs {
    shutdown: watch::Sender<bool>,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl Default for BackgroundJobs {
    fn default() -> Self {
        Self::new()
    }
}

impl BackgroundJobs {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            shutdown,
            handles: Vec::new(),
        }
    }

    /// Start the quota reset, budget reset and bucket sweep jobs for
    /// `decider`.
    pub fn for_admission(decider: &AdmissionDecider, config: &AdmissionConfig) -> Self {
        let mut jobs = Self::new();

        let quota = Arc::clone(decider.quota());
        let metrics = decider.metrics().clone();
        jobs.spawn_periodic("quota_reset", config.quota_reset_period(), move || {
            let quota = Arc::clone(&quota);
            let metrics = metrics.clone();
            async move {
                quota.reset().await;
                metrics.record_reset();
            }
        });

        let budget = Arc::clone(decider.budget());
        let metrics = decider.metrics().clone();
        jobs.spawn_periodic("budget_reset", config.budget_reset_period(), move || {
            let budget = Arc::clone(&budget);
            let metrics = metrics.clone();
            async move {
                budget.reset().await;
                metrics.record_reset();
            }
        });

        let limiter = Arc::clone(decider.identity_limiter());
        jobs.spawn_periodic("bucket_sweep", config.sweep_interval(), move || {
            let limiter = Arc::clone(&limiter);
            async move {
                let removed = limiter.sweep().await;
                if removed > 0 {
                    debug!(removed, "Swept replenished buckets");
                }
            }
        });

        jobs
    }

    /// Run `job` every `period` until shutdown.
    pub fn spawn_periodic<F, Fut>(&mut self, name: &'static str, period: Duration, job: F)
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut shutdown = self.shutdown.subscribe();
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => job().await,
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!(job = name, "Background job stopped");
        });
        self.handles.push((name, handle));
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Signal every job to stop and wait for them to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for (name, handle) in self.handles {
            if let Err(e) = handle.await {
                info!(job = name, error = %e, "Background job ended abnormally");
            }
        }
        info!("Background jobs stopped");
    }
}
