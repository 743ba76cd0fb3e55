// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Registration request validator.
//!
//! Syntactic checks that run before the admission pipeline:
//! - Name: at most 24 characters of ASCII letters and hyphens
//! - TLD: one of the configured registrable TLDs
//! - Target: an IP address, or an absolute URL with a scheme and host, at
//!   most 64 characters

use crate::identity::Candidate;
use std::net::IpAddr;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Longest registrable name.
pub const MAX_NAME_LEN: usize = 24;

/// Longest accepted target.
pub const MAX_TARGET_LEN: usize = 64;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    EmptyField(&'static str),

    #[error("Domain name is longer than {MAX_NAME_LEN} characters")]
    NameTooLong,

    #[error("Domain name may only contain letters and hyphens, found {0:?}")]
    InvalidNameCharacter(char),

    #[error("Unknown TLD: {0}")]
    UnknownTld(String),

    #[error("Invalid target, use an IP address or URL (for example 1.1.1.1): {0}")]
    InvalidTarget(String),
}

/// Result of validation.
#[derive(Debug, Clone)]
pub enum ValidationResult {
    /// Request is valid
    Valid,
    /// Request is invalid
    Invalid(ValidationError),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn error(&self) -> Option<&ValidationError> {
        match self {
            ValidationResult::Valid => None,
            ValidationResult::Invalid(e) => Some(e),
        }
    }
}

/// Registration request validator.
pub struct RegistrationValidator {
    tlds: Vec<String>,
}

impl RegistrationValidator {
    /// Create a validator accepting the given TLDs (case-insensitive).
    pub fn new(tlds: &[String]) -> Self {
        Self {
            tlds: tlds.iter().map(|t| t.to_lowercase()).collect(),
        }
    }

    pub fn tlds(&self) -> &[String] {
        &self.tlds
    }

    /// Validate the domain name and TLD.
    pub fn validate_domain(&self, name: &str, tld: &str) -> ValidationResult {
        if name.is_empty() {
            return ValidationResult::Invalid(ValidationError::EmptyField("name"));
        }
        if tld.is_empty() {
            return ValidationResult::Invalid(ValidationError::EmptyField("tld"));
        }

        if name.chars().count() > MAX_NAME_LEN {
            debug!(%name, "Domain name too long");
            return ValidationResult::Invalid(ValidationError::NameTooLong);
        }

        if let Some(bad) = name.chars().find(|c| !(c.is_ascii_alphabetic() || *c == '-')) {
            debug!(%name, "Domain name has invalid characters");
            return ValidationResult::Invalid(ValidationError::InvalidNameCharacter(bad));
        }

        if !self.tlds.contains(&tld.to_lowercase()) {
            debug!(%tld, "Unknown TLD");
            return ValidationResult::Invalid(ValidationError::UnknownTld(tld.to_string()));
        }

        ValidationResult::Valid
    }

    /// Validate what the domain points at.
    pub fn validate_target(&self, target: &str) -> ValidationResult {
        if target.is_empty() {
            return ValidationResult::Invalid(ValidationError::EmptyField("ip"));
        }

        if target.len() > MAX_TARGET_LEN {
            debug!(%target, "Target too long");
            return ValidationResult::Invalid(ValidationError::InvalidTarget(target.to_string()));
        }

        if target.parse::<IpAddr>().is_ok() {
            return ValidationResult::Valid;
        }

        match Url::parse(target) {
            Ok(url) if url.host_str().is_some_and(|h| !h.is_empty()) => ValidationResult::Valid,
            _ => {
                debug!(%target, "Target is neither an IP nor a URL");
                ValidationResult::Invalid(ValidationError::InvalidTarget(target.to_string()))
            }
        }
    }

    /// Validate a complete registration candidate.
    pub fn validate(&self, candidate: &Candidate) -> ValidationResult {
        let domain = self.validate_domain(&candidate.name, &candidate.tld);
        if !domain.is_valid() {
            return domain;
        }
        self.validate_target(&candidate.target)
    }
}
