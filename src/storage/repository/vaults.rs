// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Vault repository.
//!
//! Each vault is stored as a separate JSON file under `vaults/`. Documents
//! are normalized on the way in: the domain and every local-storage key are
//! sanitized (idempotent), and every email is normalized so lookups do not
//! depend on letter case or surrounding whitespace.

use chrono::Utc;
use uuid::Uuid;

use super::super::{DocumentStorage, StorageError, StorageResult};
use crate::models::{dedup_preserving_order, normalize_email, NewVault, Vault};
use crate::sanitize::{sanitize_key, sanitize_map};

/// Repository for vault documents.
pub struct VaultRepository<'a> {
    storage: &'a DocumentStorage,
}

impl<'a> VaultRepository<'a> {
    /// Create a new VaultRepository.
    pub fn new(storage: &'a DocumentStorage) -> Self {
        Self { storage }
    }

    /// Vault ids are UUIDs; anything else can never name a stored document.
    fn is_valid_id(vault_id: &str) -> bool {
        Uuid::parse_str(vault_id).is_ok()
    }

    /// Check if a vault exists.
    pub fn exists(&self, vault_id: &str) -> bool {
        Self::is_valid_id(vault_id) && self.storage.exists(self.storage.paths().vault(vault_id))
    }

    /// Get a vault by ID.
    pub fn get(&self, vault_id: &str) -> StorageResult<Vault> {
        if !self.exists(vault_id) {
            return Err(StorageError::NotFound(format!("Vault {vault_id}")));
        }
        self.storage.load(self.storage.paths().vault(vault_id))
    }

    /// Store a newly captured vault shared by `shared_by`.
    pub fn create(&self, new_vault: NewVault, shared_by: &str) -> StorageResult<Vault> {
        let receipts = new_vault
            .receipts
            .iter()
            .map(|r| normalize_email(r))
            .filter(|r| !r.is_empty())
            .collect();

        let vault = Vault {
            id: Uuid::new_v4().to_string(),
            domain: sanitize_key(&new_vault.domain),
            cookies: new_vault.cookies,
            local_storage: sanitize_map(&new_vault.local_storage),
            shared_by: normalize_email(shared_by),
            receipts: dedup_preserving_order(receipts),
            imported: Vec::new(),
            created_at: Utc::now(),
        };

        if self.exists(&vault.id) {
            return Err(StorageError::AlreadyExists(format!("Vault {}", vault.id)));
        }

        self.storage
            .save(self.storage.paths().vault(&vault.id), &vault)?;
        Ok(vault)
    }

    /// Update an existing vault.
    pub fn update(&self, vault: &Vault) -> StorageResult<()> {
        if !self.exists(&vault.id) {
            return Err(StorageError::NotFound(format!("Vault {}", vault.id)));
        }

        self.storage
            .save(self.storage.paths().vault(&vault.id), vault)
    }

    /// Delete a vault. Only the user who shared it may delete it.
    pub fn delete(&self, vault_id: &str, user: &str) -> StorageResult<()> {
        let user = normalize_email(user);
        let vault = self.get(vault_id)?;
        if vault.shared_by != user {
            return Err(StorageError::PermissionDenied {
                user,
                resource: format!("vault {vault_id}"),
            });
        }

        self.storage.remove(self.storage.paths().vault(vault_id))
    }

    /// Record that `email` imported the vault.
    ///
    /// Append-to-set: importing twice leaves a single entry. Only users listed
    /// in `receipts` may import.
    pub fn mark_imported(&self, vault_id: &str, email: &str) -> StorageResult<Vault> {
        let email = normalize_email(email);
        let mut vault = self.get(vault_id)?;

        if !vault.is_receipt(&email) {
            return Err(StorageError::PermissionDenied {
                user: email,
                resource: format!("vault {vault_id}"),
            });
        }

        if vault.mark_imported(&email) {
            self.update(&vault)?;
        }
        Ok(vault)
    }

    fn list_where(&self, predicate: impl Fn(&Vault) -> bool) -> StorageResult<Vec<Vault>> {
        let vault_ids = self
            .storage
            .document_ids(self.storage.paths().vaults_dir())?;

        let mut vaults = Vec::new();
        for id in vault_ids {
            match self.get(&id) {
                Ok(vault) if predicate(&vault) => vaults.push(vault),
                Ok(_) => {}
                Err(e) => tracing::warn!(vault_id = %id, error = %e, "Skipping unreadable vault"),
            }
        }

        vaults.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(vaults)
    }

    /// List vaults whose receipts contain `email`.
    pub fn list_by_receipt(&self, email: &str) -> StorageResult<Vec<Vault>> {
        let email = normalize_email(email);
        self.list_where(|vault| vault.is_receipt(&email))
    }

    /// List vaults shared by `email`.
    pub fn list_shared_by(&self, email: &str) -> StorageResult<Vec<Vault>> {
        let email = normalize_email(email);
        self.list_where(|vault| vault.shared_by == email)
    }
}
