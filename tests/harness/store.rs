// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Store that behaves like an unreachable database.

use async_trait::async_trait;
use registrar_admission::error::{AppError, Result};
use registrar_admission::store::{DomainRecord, DomainStore, InsertOutcome};

/// Every operation fails with [`AppError::Store`].
#[derive(Debug, Default)]
pub struct UnavailableStore;

fn unavailable<T>() -> Result<T> {
    Err(AppError::Store("connection refused".to_string()))
}

#[async_trait]
impl DomainStore for UnavailableStore {
    async fn exists(&self, _name: &str, _tld: &str) -> Result<bool> {
        unavailable()
    }

    async fn insert(&self, _record: DomainRecord) -> Result<InsertOutcome> {
        unavailable()
    }

    async fn get(&self, _name: &str, _tld: &str) -> Result<Option<DomainRecord>> {
        unavailable()
    }

    async fn update_target(&self, _secret_key: &str, _target: &str) -> Result<Option<DomainRecord>> {
        unavailable()
    }

    async fn delete(&self, _secret_key: &str) -> Result<bool> {
        unavailable()
    }
}
