// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Registrar Admission
//!
//! This crate decides, for every domain registration attempt, whether to
//! admit, throttle or reject it:
//!
//! - Per-identity token bucket bursts (client IP or API key)
//! - Global burst and hourly volume limits
//! - Per-identity hourly quotas, reset on a fixed schedule
//! - A decaying global tolerance budget that doubles as the spam threshold
//! - A bounded window of recent registrations fed to a spam classifier
//! - Content screening through an external classifier oracle

pub mod admission;
pub mod budget;
pub mod classifier;
pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod limiter;
pub mod metrics;
pub mod quota;
pub mod scheduler;
pub mod store;
pub mod validator;
pub mod window;

pub use admission::{AdmissionDecider, AdmissionPolicy, Rejection, RejectionCategory, Verdict};
pub use config::Config;
pub use error::{AppError, Result};
pub use identity::{Candidate, Identity};
pub use scheduler::BackgroundJobs;
