// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path constants and utilities for the vault document layout.

use std::path::{Path, PathBuf};

/// Default base directory for persisted documents.
pub const DATA_ROOT: &str = "data";

/// Storage path utilities for the document store.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all documents.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ========== Vault Paths ==========

    /// Directory containing all vault documents.
    pub fn vaults_dir(&self) -> PathBuf {
        self.root.join("vaults")
    }

    /// Path to a specific vault document.
    pub fn vault(&self, vault_id: &str) -> PathBuf {
        self.vaults_dir().join(format!("{vault_id}.json"))
    }

    // ========== Audit Log Paths ==========

    /// Directory containing audit logs.
    pub fn audit_dir(&self) -> PathBuf {
        self.root.join("audit")
    }

    /// Directory for a specific date's audit logs.
    pub fn audit_date_dir(&self, date: &str) -> PathBuf {
        self.audit_dir().join(date)
    }

    /// Path to a daily audit events file (JSONL format).
    pub fn audit_events_file(&self, date: &str) -> PathBuf {
        self.audit_date_dir(date).join("events.jsonl")
    }
}
