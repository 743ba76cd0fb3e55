// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the registrar admission service.

use thiserror::Error;

/// Application error types.
///
/// Admission rejections are not errors; they are returned as
/// [`crate::admission::Verdict`] values. Only failures the caller cannot
/// recover from end up here.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;
