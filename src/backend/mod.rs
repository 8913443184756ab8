// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Vault Backends
//!
//! Where the coordinator persists and looks up vaults.
//!
//! - [`LocalBackend`]: the file-backed [`VaultRepository`] in this process.
//! - [`http::HttpBackend`]: the vault store HTTP API, with a listing cache.
//!
//! Both keep vaults in persisted form (sanitized domain and keys).

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::models::{NewVault, Vault};
use crate::storage::{DocumentStorage, StorageError, VaultRepository};

pub mod cache;
pub mod http;

pub use http::HttpBackend;

/// Errors raised by a vault backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("vault not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("vault storage error: {0}")]
    Storage(StorageError),

    #[error("vault store request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("vault store returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid vault store URL: {0}")]
    InvalidUrl(String),
}

impl From<StorageError> for BackendError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => BackendError::NotFound(what),
            StorageError::PermissionDenied { user, resource } => {
                BackendError::PermissionDenied(format!("{user} cannot access {resource}"))
            }
            other => BackendError::Storage(other),
        }
    }
}

/// Document store holding vault records.
#[allow(async_fn_in_trait)]
pub trait VaultBackend {
    /// Vaults whose receipts contain `email`, oldest first.
    async fn list_for_receipt(&self, email: &str) -> Result<Vec<Vault>, BackendError>;

    /// Persist a newly captured vault shared by `shared_by`.
    async fn create(&self, new_vault: NewVault, shared_by: &str) -> Result<Vault, BackendError>;

    /// Append `email` to the vault's imported set. Idempotent.
    async fn mark_imported(&self, vault_id: &str, email: &str) -> Result<Vault, BackendError>;
}

impl<T: VaultBackend + ?Sized> VaultBackend for Arc<T> {
    async fn list_for_receipt(&self, email: &str) -> Result<Vec<Vault>, BackendError> {
        (**self).list_for_receipt(email).await
    }

    async fn create(&self, new_vault: NewVault, shared_by: &str) -> Result<Vault, BackendError> {
        (**self).create(new_vault, shared_by).await
    }

    async fn mark_imported(&self, vault_id: &str, email: &str) -> Result<Vault, BackendError> {
        (**self).mark_imported(vault_id, email).await
    }
}

/// Backend over vault documents on the local filesystem.
///
/// Read-modify-write operations are serialized through `write_lock`.
#[derive(Clone)]
pub struct LocalBackend {
    storage: Arc<DocumentStorage>,
    write_lock: Arc<Mutex<()>>,
}

impl LocalBackend {
    pub fn new(storage: Arc<DocumentStorage>) -> Self {
        Self::with_lock(storage, Arc::new(Mutex::new(())))
    }

    /// Share `write_lock` with other writers of the same storage.
    pub fn with_lock(storage: Arc<DocumentStorage>, write_lock: Arc<Mutex<()>>) -> Self {
        Self {
            storage,
            write_lock,
        }
    }

    pub fn storage(&self) -> &DocumentStorage {
        &self.storage
    }
}

impl VaultBackend for LocalBackend {
    async fn list_for_receipt(&self, email: &str) -> Result<Vec<Vault>, BackendError> {
        Ok(VaultRepository::new(&self.storage).list_by_receipt(email)?)
    }

    async fn create(&self, new_vault: NewVault, shared_by: &str) -> Result<Vault, BackendError> {
        let _guard = self.write_lock.lock().await;
        let vault = VaultRepository::new(&self.storage).create(new_vault, shared_by)?;
        tracing::info!(vault_id = %vault.id, domain = %vault.domain, "Vault stored");
        Ok(vault)
    }

    async fn mark_imported(&self, vault_id: &str, email: &str) -> Result<Vault, BackendError> {
        let _guard = self.write_lock.lock().await;
        Ok(VaultRepository::new(&self.storage).mark_imported(vault_id, email)?)
    }
}
