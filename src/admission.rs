// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Admission decisions for domain registrations.
//!
//! Checks run in a fixed order and stop at the first rejection:
//! 1. Per-identity burst
//! 2. Global burst
//! 3. Global hourly volume
//! 4. Per-identity hourly quota
//! 5. Tolerance budget consumption
//! 6. Content classifier
//! 7. Spam score against the budget value produced by step 5
//!
//! Steps 2, 3, 5 and 7 only apply to policies that screen for spam. Units
//! consumed by earlier steps are not refunded when a later step rejects.

use crate::budget::ToleranceBudget;
use crate::classifier::{clamp_score, Classifier, ClassifierError};
use crate::config::{AdmissionConfig, ApiKeyConfig};
use crate::error::{AppError, Result};
use crate::identity::{Candidate, Identity};
use crate::limiter::{GlobalLimiter, IdentityRateLimiter, RateLimitResult};
use crate::metrics::AdmissionMetrics;
use crate::quota::QuotaCounter;
use crate::store::{DomainRecord, DomainStore, InsertOutcome};
use crate::window::{ActivityEntry, RecentActivityWindow};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Limits for one call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionPolicy {
    /// Tokens in the identity's burst bucket
    pub identity_burst: u32,
    /// Admissions per identity per quota window
    pub hourly_quota: u32,
    /// Apply global limits, the tolerance budget and spam scoring
    pub screen_spam: bool,
}

impl AdmissionPolicy {
    /// Anonymous registrations keyed by client address.
    pub fn public(config: &AdmissionConfig) -> Self {
        Self {
            identity_burst: config.public_identity_burst,
            hourly_quota: config.public_hourly_quota,
            screen_spam: true,
        }
    }

    /// Pre-authorized integrators keyed by API key. Spam heuristics are
    /// skipped.
    pub fn authorized(config: &AdmissionConfig, key: &ApiKeyConfig) -> Self {
        Self {
            identity_burst: config.authorized_identity_burst,
            hourly_quota: key.hourly_quota,
            screen_spam: false,
        }
    }
}

/// Caller-visible class of a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionCategory {
    /// Retry after waiting
    RateLimited,
    /// Content or spam screening blocked the candidate
    SpamOrAbuse,
    /// The domain is taken
    Conflict,
}

/// Why a registration was not admitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    IdentityBurst { retry_after: Duration },
    GlobalBurst { retry_after: Duration },
    GlobalQuota { retry_after: Duration },
    IdentityQuota,
    BudgetExhausted,
    UnsafeContent,
    Spam { score: f64, threshold: f64 },
    AlreadyRegistered,
}

impl Rejection {
    pub fn category(&self) -> RejectionCategory {
        match self {
            Self::IdentityBurst { .. }
            | Self::GlobalBurst { .. }
            | Self::GlobalQuota { .. }
            | Self::IdentityQuota
            | Self::BudgetExhausted => RejectionCategory::RateLimited,
            Self::UnsafeContent | Self::Spam { .. } => RejectionCategory::SpamOrAbuse,
            Self::AlreadyRegistered => RejectionCategory::Conflict,
        }
    }

    /// Stable label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::IdentityBurst { .. } => "identity_burst",
            Self::GlobalBurst { .. } => "global_burst",
            Self::GlobalQuota { .. } => "global_quota",
            Self::IdentityQuota => "identity_quota",
            Self::BudgetExhausted => "budget_exhausted",
            Self::UnsafeContent => "unsafe_content",
            Self::Spam { .. } => "spam",
            Self::AlreadyRegistered => "already_registered",
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::IdentityBurst { retry_after }
            | Self::GlobalBurst { retry_after }
            | Self::GlobalQuota { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdentityBurst { .. } => write!(f, "Blocked due to spam"),
            Self::GlobalBurst { .. } => {
                write!(f, "API under heavy load, use an external registrar")
            }
            Self::GlobalQuota { .. } | Self::BudgetExhausted => {
                write!(f, "API is being botted, try again in an hour")
            }
            Self::IdentityQuota => write!(f, "Rate limit exceeded, try again in an hour"),
            Self::UnsafeContent => write!(f, "Domain contains inappropriate content"),
            Self::Spam { .. } => write!(f, "Blocked due to possible spam"),
            Self::AlreadyRegistered => write!(f, "Domain already registered"),
        }
    }
}

/// Outcome of an admission decision.
#[derive(Debug, Clone)]
pub enum Verdict {
    /// Registered; the record carries the registrant's secret key
    Admitted(DomainRecord),
    Rejected(Rejection),
}

impl Verdict {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Verdict::Admitted(_))
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Verdict::Admitted(_) => None,
            Verdict::Rejected(r) => Some(r),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Admitted(_) => "admitted",
            Verdict::Rejected(r) => r.label(),
        }
    }
}

/// Admission pipeline and the shared state it guards.
pub struct AdmissionDecider {
    identity_limiter: Arc<IdentityRateLimiter>,
    global_burst: GlobalLimiter,
    global_hourly: GlobalLimiter,
    quota: Arc<QuotaCounter>,
    budget: Arc<ToleranceBudget>,
    window: Arc<RecentActivityWindow>,
    classifier: Arc<dyn Classifier>,
    store: Arc<dyn DomainStore>,
    metrics: AdmissionMetrics,
    classifier_timeout: Duration,
}

impl AdmissionDecider {
    pub fn new(
        config: &AdmissionConfig,
        classifier: Arc<dyn Classifier>,
        store: Arc<dyn DomainStore>,
    ) -> Result<Self> {
        let metrics = AdmissionMetrics::new().map_err(|e| AppError::Internal(e.to_string()))?;
        Ok(Self {
            identity_limiter: Arc::new(IdentityRateLimiter::new(
                config.identity_refill(),
                config.registry_capacity,
            )),
            global_burst: GlobalLimiter::new(
                "global_burst",
                config.global_burst,
                config.global_burst_refill(),
            ),
            global_hourly: GlobalLimiter::new(
                "global_hourly",
                config.global_hourly_capacity,
                config.global_hourly_refill(),
            ),
            quota: Arc::new(QuotaCounter::new(config.registry_capacity)),
            budget: Arc::new(ToleranceBudget::new()),
            window: Arc::new(RecentActivityWindow::new(config.window_capacity)),
            classifier,
            store,
            metrics,
            classifier_timeout: config.classifier_timeout(),
        })
    }

    pub fn identity_limiter(&self) -> &Arc<IdentityRateLimiter> {
        &self.identity_limiter
    }

    pub fn quota(&self) -> &Arc<QuotaCounter> {
        &self.quota
    }

    pub fn budget(&self) -> &Arc<ToleranceBudget> {
        &self.budget
    }

    pub fn window(&self) -> &Arc<RecentActivityWindow> {
        &self.window
    }

    pub fn store(&self) -> &Arc<dyn DomainStore> {
        &self.store
    }

    pub fn metrics(&self) -> &AdmissionMetrics {
        &self.metrics
    }

    /// Render metrics with the budget gauge read at scrape time.
    pub async fn render_metrics(&self) -> String {
        self.metrics.set_budget(self.budget.current_value().await);
        self.metrics.render()
    }

    /// Decide whether `identity` may register `candidate` now, persisting
    /// and recording it on admission.
    ///
    /// Rejections are returned as [`Verdict::Rejected`]; `Err` means the
    /// store failed.
    pub async fn decide(
        &self,
        identity: &Identity,
        candidate: &Candidate,
        policy: &AdmissionPolicy,
    ) -> Result<Verdict> {
        let verdict = self.evaluate(identity, candidate, policy).await?;
        self.metrics.record_decision(verdict.label());

        match &verdict {
            Verdict::Admitted(record) => info!(
                %identity,
                domain = %candidate.domain(),
                target = %record.target,
                screened = policy.screen_spam,
                "Registration admitted"
            ),
            Verdict::Rejected(rejection) => info!(
                %identity,
                domain = %candidate.domain(),
                reason = rejection.label(),
                "Registration rejected"
            ),
        }
        Ok(verdict)
    }

    async fn evaluate(
        &self,
        identity: &Identity,
        candidate: &Candidate,
        policy: &AdmissionPolicy,
    ) -> Result<Verdict> {
        let domain = candidate.domain();

        if let RateLimitResult::Limited { retry_after } =
            self.identity_limiter.allow(identity, policy.identity_burst).await
        {
            return Ok(Verdict::Rejected(Rejection::IdentityBurst { retry_after }));
        }

        if policy.screen_spam {
            if let RateLimitResult::Limited { retry_after } = self.global_burst.allow().await {
                return Ok(Verdict::Rejected(Rejection::GlobalBurst { retry_after }));
            }
            if let RateLimitResult::Limited { retry_after } = self.global_hourly.allow().await {
                return Ok(Verdict::Rejected(Rejection::GlobalQuota { retry_after }));
            }
        }

        if !self.quota.allow(identity, policy.hourly_quota).await {
            return Ok(Verdict::Rejected(Rejection::IdentityQuota));
        }

        // The threshold is this request's own post-decrement value, never a
        // later re-read of the shared budget.
        let threshold = if policy.screen_spam {
            match self.budget.try_consume().await {
                Some(value) => Some(value),
                None => return Ok(Verdict::Rejected(Rejection::BudgetExhausted)),
            }
        } else {
            None
        };

        if self.is_unsafe_content(&domain).await {
            return Ok(Verdict::Rejected(Rejection::UnsafeContent));
        }

        if let Some(threshold) = threshold {
            let recent = self.window.snapshot().await;
            let score = self.spam_score(&recent, &domain).await;
            debug!(%domain, score, threshold, "Spam score");
            if score >= threshold {
                return Ok(Verdict::Rejected(Rejection::Spam { score, threshold }));
            }
        }

        if self.store.exists(&candidate.name, &candidate.tld).await? {
            return Ok(Verdict::Rejected(Rejection::AlreadyRegistered));
        }

        let record = DomainRecord::new(&candidate.name, &candidate.tld, &candidate.target);
        if self.store.insert(record.clone()).await? == InsertOutcome::Conflict {
            return Ok(Verdict::Rejected(Rejection::AlreadyRegistered));
        }

        if policy.screen_spam {
            self.window.add(domain, record.target.clone()).await;
        }

        Ok(Verdict::Admitted(record))
    }

    /// Content check; an unavailable classifier counts as "safe".
    async fn is_unsafe_content(&self, domain: &str) -> bool {
        let call = self.classifier.is_unsafe_content(domain);
        match self.bounded(call).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(%domain, error = %e, "Content classifier unavailable, treating as safe");
                self.metrics.record_classifier_failure("content");
                false
            }
        }
    }

    /// Spam score in [0, 1]; an unavailable classifier scores 0.
    async fn spam_score(&self, recent: &[ActivityEntry], domain: &str) -> f64 {
        let call = self.classifier.spam_score(recent, domain);
        match self.bounded(call).await {
            Ok(score) => clamp_score(score),
            Err(e) => {
                warn!(%domain, error = %e, "Spam classifier unavailable, scoring 0");
                self.metrics.record_classifier_failure("spam");
                0.0
            }
        }
    }

    async fn bounded<T>(
        &self,
        call: impl std::future::Future<Output = std::result::Result<T, ClassifierError>>,
    ) -> std::result::Result<T, ClassifierError> {
        match tokio::time::timeout(self.classifier_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ClassifierError::Timeout(self.classifier_timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::PermissiveClassifier;
    use crate::store::MemoryStore;

    fn decider(config: &AdmissionConfig) -> AdmissionDecider {
        AdmissionDecider::new(config, Arc::new(PermissiveClassifier), Arc::new(MemoryStore::new()))
            .unwrap()
    }

    fn id(key: &str) -> Identity {
        Identity::new(key).unwrap()
    }

    #[test]
    fn test_rejection_categories() {
        assert_eq!(
            Rejection::BudgetExhausted.category(),
            RejectionCategory::RateLimited
        );
        assert_eq!(
            Rejection::Spam {
                score: 0.5,
                threshold: 0.4
            }
            .category(),
            RejectionCategory::SpamOrAbuse
        );
        assert_eq!(
            Rejection::AlreadyRegistered.category(),
            RejectionCategory::Conflict
        );
        assert_ne!(
            Rejection::BudgetExhausted.label(),
            Rejection::IdentityQuota.label()
        );
    }

    #[test]
    fn test_policies() {
        let config = AdmissionConfig::default();
        let public = AdmissionPolicy::public(&config);
        assert!(public.screen_spam);
        assert_eq!(public.identity_burst, 3);

        let key = ApiKeyConfig {
            owner: "acme".to_string(),
            hourly_quota: 40,
        };
        let authorized = AdmissionPolicy::authorized(&config, &key);
        assert!(!authorized.screen_spam);
        assert_eq!(authorized.hourly_quota, 40);
        assert_eq!(authorized.identity_burst, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_public_admission_records_window_and_store() {
        let config = AdmissionConfig::default();
        let decider = decider(&config);
        let policy = AdmissionPolicy::public(&config);

        let verdict = decider
            .decide(&id("10.0.0.1"), &Candidate::new("Hello", "dev", "1.1.1.1"), &policy)
            .await
            .unwrap();

        match verdict {
            Verdict::Admitted(record) => {
                assert_eq!(record.name, "hello");
                assert_eq!(record.secret_key.len(), 24);
            }
            Verdict::Rejected(r) => panic!("unexpected rejection: {r}"),
        }
        assert_eq!(decider.budget().current_value().await, 0.99);
        assert_eq!(decider.window().snapshot().await[0].name, "hello.dev");
        assert!(decider.store().exists("hello", "dev").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_metrics_report_budget_at_scrape() {
        let config = AdmissionConfig::default();
        let decider = decider(&config);
        let policy = AdmissionPolicy::public(&config);

        assert!(decider
            .render_metrics()
            .await
            .contains("registrar_tolerance_budget_value 1"));

        decider
            .decide(&id("10.0.0.1"), &Candidate::new("hello", "dev", "1.1.1.1"), &policy)
            .await
            .unwrap();
        assert!(decider
            .render_metrics()
            .await
            .contains("registrar_tolerance_budget_value 0.99"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_authorized_path_skips_budget_and_window() {
        let config = AdmissionConfig::default();
        let decider = decider(&config);
        let key = ApiKeyConfig {
            owner: "acme".to_string(),
            hourly_quota: 2,
        };
        let policy = AdmissionPolicy::authorized(&config, &key);
        let integrator = id("key-123");

        for name in ["one", "two"] {
            let verdict = decider
                .decide(&integrator, &Candidate::new(name, "dev", "1.1.1.1"), &policy)
                .await
                .unwrap();
            assert!(verdict.is_admitted());
        }
        let verdict = decider
            .decide(&integrator, &Candidate::new("three", "dev", "1.1.1.1"), &policy)
            .await
            .unwrap();
        assert_eq!(verdict.rejection(), Some(&Rejection::IdentityQuota));

        assert_eq!(decider.budget().current_value().await, 1.0);
        assert!(decider.window().is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_is_conflict_after_pipeline() {
        let config = AdmissionConfig {
            public_hourly_quota: 5,
            ..Default::default()
        };
        let decider = decider(&config);
        let policy = AdmissionPolicy::public(&config);
        let candidate = Candidate::new("taken", "lol", "1.1.1.1");

        assert!(decider
            .decide(&id("10.0.0.1"), &candidate, &policy)
            .await
            .unwrap()
            .is_admitted());

        let verdict = decider
            .decide(&id("10.0.0.2"), &candidate, &policy)
            .await
            .unwrap();
        assert_eq!(verdict.rejection(), Some(&Rejection::AlreadyRegistered));
        // The pipeline ran first, so a budget unit was still spent
        assert_eq!(decider.budget().current_value().await, 0.98);
    }
}
