// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the registrar admission service.
//!
//! Values are layered: built-in defaults, then an optional TOML file
//! (`REGISTRAR_CONFIG`, default `registrar.toml`), then `REGISTRAR__*`
//! environment variables (`REGISTRAR__ADMISSION__PUBLIC_HOURLY_QUOTA=2`).

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Configuration for the registrar admission service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Take the client address from `CF-Connecting-IP` when present
    #[serde(default)]
    pub trust_proxy_header: bool,

    /// Admission limits
    #[serde(default)]
    pub admission: AdmissionConfig,

    /// Classifier oracle
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Authorized integrators, keyed by API key
    #[serde(default)]
    pub api_keys: HashMap<String, ApiKeyConfig>,

    /// Registrable top-level domains
    #[serde(default = "default_tlds")]
    pub tlds: Vec<String>,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Limits applied by the admission pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Burst size per client IP on the public path (default: 3)
    #[serde(default = "default_public_identity_burst")]
    pub public_identity_burst: u32,

    /// Registrations per client IP per hour (default: 1)
    #[serde(default = "default_public_hourly_quota")]
    pub public_hourly_quota: u32,

    /// Burst size per API key (default: 5)
    #[serde(default = "default_authorized_identity_burst")]
    pub authorized_identity_burst: u32,

    /// Seconds per token regained by identity buckets (default: 1)
    #[serde(default = "default_identity_refill_secs")]
    pub identity_refill_secs: u64,

    /// Global burst across all identities (default: 10)
    #[serde(default = "default_global_burst")]
    pub global_burst: u32,

    /// Seconds per token regained by the global burst bucket (default: 60)
    #[serde(default = "default_global_burst_refill_secs")]
    pub global_burst_refill_secs: u64,

    /// Global registrations per hour (default: 100)
    #[serde(default = "default_global_hourly_capacity")]
    pub global_hourly_capacity: u32,

    /// Seconds per token regained by the global hourly bucket (default: 3600)
    #[serde(default = "default_global_hourly_refill_secs")]
    pub global_hourly_refill_secs: u64,

    /// Recent registrations kept as spam-scoring context (default: 10)
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,

    /// Quota window length in seconds (default: 3600)
    #[serde(default = "default_reset_secs")]
    pub quota_reset_secs: u64,

    /// Tolerance budget reset period in seconds (default: 3600)
    #[serde(default = "default_reset_secs")]
    pub budget_reset_secs: u64,

    /// Maximum identities tracked per registry (default: 100000)
    #[serde(default = "default_registry_capacity")]
    pub registry_capacity: usize,

    /// Seconds between sweeps of replenished buckets (default: 60)
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Upper bound on each classifier call in milliseconds (default: 5000)
    #[serde(default = "default_classifier_timeout_ms")]
    pub classifier_timeout_ms: u64,
}

/// Classifier oracle endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// OpenAI-compatible chat completions URL
    #[serde(default = "default_classifier_endpoint")]
    pub endpoint: String,

    /// Bearer token; without one every domain is treated as safe
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_classifier_model")]
    pub model: String,
}

/// An authorized integrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiKeyConfig {
    pub owner: String,

    /// Registrations per hour for this key
    #[serde(alias = "ratelimit")]
    pub hourly_quota: u32,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_public_identity_burst() -> u32 {
    3
}

fn default_public_hourly_quota() -> u32 {
    1
}

fn default_authorized_identity_burst() -> u32 {
    5
}

fn default_identity_refill_secs() -> u64 {
    1
}

fn default_global_burst() -> u32 {
    10
}

fn default_global_burst_refill_secs() -> u64 {
    60
}

fn default_global_hourly_capacity() -> u32 {
    100
}

fn default_global_hourly_refill_secs() -> u64 {
    3600
}

fn default_window_capacity() -> usize {
    10
}

fn default_reset_secs() -> u64 {
    3600
}

fn default_registry_capacity() -> usize {
    100_000
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_classifier_timeout_ms() -> u64 {
    5000
}

fn default_classifier_endpoint() -> String {
    "https://api.groq.com/openai/v1/chat/completions".to_string()
}

fn default_classifier_model() -> String {
    "mixtral-8x7b-32768".to_string()
}

fn default_tlds() -> Vec<String> {
    [
        "mf", "btw", "fr", "yap", "dev", "scam", "zip", "root", "web", "rizz", "habibi",
        "sigma", "now", "it", "soy", "lol", "uwu", "ohio",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            trust_proxy_header: false,
            admission: AdmissionConfig::default(),
            classifier: ClassifierConfig::default(),
            api_keys: HashMap::new(),
            tlds: default_tlds(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            public_identity_burst: default_public_identity_burst(),
            public_hourly_quota: default_public_hourly_quota(),
            authorized_identity_burst: default_authorized_identity_burst(),
            identity_refill_secs: default_identity_refill_secs(),
            global_burst: default_global_burst(),
            global_burst_refill_secs: default_global_burst_refill_secs(),
            global_hourly_capacity: default_global_hourly_capacity(),
            global_hourly_refill_secs: default_global_hourly_refill_secs(),
            window_capacity: default_window_capacity(),
            quota_reset_secs: default_reset_secs(),
            budget_reset_secs: default_reset_secs(),
            registry_capacity: default_registry_capacity(),
            sweep_interval_secs: default_sweep_interval_secs(),
            classifier_timeout_ms: default_classifier_timeout_ms(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: default_classifier_endpoint(),
            api_key: None,
            model: default_classifier_model(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl AdmissionConfig {
    pub fn identity_refill(&self) -> Duration {
        Duration::from_secs(self.identity_refill_secs)
    }

    pub fn global_burst_refill(&self) -> Duration {
        Duration::from_secs(self.global_burst_refill_secs)
    }

    pub fn global_hourly_refill(&self) -> Duration {
        Duration::from_secs(self.global_hourly_refill_secs)
    }

    /// Reset periods are floored at one second so a zero in the file cannot
    /// spin the reset jobs.
    pub fn quota_reset_period(&self) -> Duration {
        Duration::from_secs(self.quota_reset_secs.max(1))
    }

    pub fn budget_reset_period(&self) -> Duration {
        Duration::from_secs(self.budget_reset_secs.max(1))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn classifier_timeout(&self) -> Duration {
        Duration::from_millis(self.classifier_timeout_ms)
    }
}

impl Config {
    /// Load configuration from `path` (if it exists) and the environment.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("REGISTRAR")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
