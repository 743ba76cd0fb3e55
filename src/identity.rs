// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Requester identities and registration candidates.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// The key a rate limit is scoped to: a client IP address or an API key.
///
/// Equality and hashing use the key alone. API keys are credentials, so
/// their `Display` and `Debug` forms name the key's owner instead of the key.
#[derive(Clone)]
pub struct Identity {
    key: String,
    owner: Option<String>,
}

impl Identity {
    /// Create an identity, rejecting empty keys.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(AppError::InvalidIdentity("identity key is empty".to_string()));
        }
        Ok(Self { key, owner: None })
    }

    /// Identity for a pre-authorized integrator's API key.
    pub fn api_key(key: impl Into<String>, owner: impl Into<String>) -> Result<Self> {
        let mut identity = Self::new(key)?;
        identity.owner = Some(owner.into());
        Ok(identity)
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    pub fn is_api_key(&self) -> bool {
        self.owner.is_some()
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Identity {}

impl Hash for Identity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner {
            Some(owner) => write!(f, "api-key:{owner}"),
            None => f.write_str(&self.key),
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({self})")
    }
}

/// A domain someone is trying to register.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    pub tld: String,
    /// IP address or URL the domain should point at
    #[serde(rename = "ip")]
    pub target: String,
}

impl Candidate {
    pub fn new(name: impl Into<String>, tld: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tld: tld.into(),
            target: target.into(),
        }
    }

    /// Fully qualified domain in lower case, e.g. `example.dev`. This is the
    /// form that is classified, stored and remembered as recent activity.
    pub fn domain(&self) -> String {
        format!("{}.{}", self.name, self.tld).to_lowercase()
    }
}
