// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Vault Document Storage
//!
//! Persistent storage for vault documents and the audit trail, as plain
//! JSON files under a data directory (`DATA_DIR`, default `./data`).
//!
//! ## Storage Layout
//!
//! ```text
//! data/
//!   vaults/
//!     {vault_id}.json      # Vault document (sanitized keys)
//!   audit/
//!     {date}/events.jsonl  # Daily audit logs
//! ```
//!
//! Vault documents hold live session credentials. Restrict the data
//! directory to the service user.

pub mod audit;
pub mod documents;
pub mod paths;
pub mod repository;

pub use audit::{AuditEvent, AuditEventType, AuditRepository};
pub use documents::{DocumentStorage, StorageError, StorageResult};
pub use paths::StoragePaths;
pub use repository::VaultRepository;
