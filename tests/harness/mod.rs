// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for registration abuse simulation.
//!
//! Provides a scripted classifier oracle, a failing store, request generators
//! and outcome metrics for driving the admission pipeline with attack patterns.

#![allow(dead_code)]

pub mod attacks;
pub mod classifier;
pub mod generators;
pub mod metrics;
pub mod store;
