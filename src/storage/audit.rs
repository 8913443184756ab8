// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit logging for vault operations.
//!
//! Sharing, importing and deleting a vault moves session credentials
//! between users, so every such event is appended to a daily JSONL log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{DocumentStorage, StorageResult};

/// Types of auditable events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    VaultCreated,
    VaultImported,
    VaultDeleted,
    PermissionDenied,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Type of event.
    pub event_type: AuditEventType,
    /// User who triggered the event (if known).
    pub user: Option<String>,
    /// Vault affected.
    pub vault_id: Option<String>,
    /// Additional details as JSON.
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

impl AuditEvent {
    /// Create a new audit event.
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            user: None,
            vault_id: None,
            details: None,
        }
    }

    /// Set the user.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Set the affected vault.
    pub fn with_vault(mut self, vault_id: impl Into<String>) -> Self {
        self.vault_id = Some(vault_id.into());
        self
    }

    /// Add details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Repository for audit events.
pub struct AuditRepository<'a> {
    storage: &'a DocumentStorage,
}

impl<'a> AuditRepository<'a> {
    /// Create a new audit repository.
    pub fn new(storage: &'a DocumentStorage) -> Self {
        Self { storage }
    }

    /// Append an event to the log of the day it happened.
    pub fn log(&self, event: &AuditEvent) -> StorageResult<()> {
        let date = event.timestamp.format("%Y-%m-%d").to_string();
        self.storage
            .append_line(self.storage.paths().audit_events_file(&date), event)
    }

    /// Events logged on `date` (`YYYY-MM-DD`), oldest first. Empty for a day
    /// without events.
    pub fn read_events(&self, date: &str) -> StorageResult<Vec<AuditEvent>> {
        self.storage
            .read_lines(self.storage.paths().audit_events_file(date))
    }

    /// Events touching one vault on a given date.
    pub fn search_by_vault(&self, vault_id: &str, date: &str) -> StorageResult<Vec<AuditEvent>> {
        let events = self.read_events(date)?;
        Ok(events
            .into_iter()
            .filter(|e| e.vault_id.as_deref() == Some(vault_id))
            .collect())
    }
}

/// Log an audit event, ignoring storage failures.
#[macro_export]
macro_rules! audit_log {
    ($storage:expr, $event_type:expr, $user:expr) => {{
        let repo = $crate::storage::AuditRepository::new($storage);
        let event = $crate::storage::AuditEvent::new($event_type).with_user(&$user.email);
        if let Err(e) = repo.log(&event) {
            tracing::warn!(error = %e, "Failed to write audit event");
        }
    }};
    ($storage:expr, $event_type:expr, $user:expr, $vault_id:expr) => {{
        let repo = $crate::storage::AuditRepository::new($storage);
        let event = $crate::storage::AuditEvent::new($event_type)
            .with_user(&$user.email)
            .with_vault($vault_id);
        if let Err(e) = repo.log(&event) {
            tracing::warn!(error = %e, "Failed to write audit event");
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoragePaths;
    use tempfile::TempDir;

    fn setup() -> (TempDir, DocumentStorage) {
        let temp = TempDir::new().unwrap();
        let mut storage = DocumentStorage::new(StoragePaths::new(temp.path()));
        storage.initialize().unwrap();
        (temp, storage)
    }

    #[test]
    fn create_audit_event() {
        let event = AuditEvent::new(AuditEventType::VaultImported)
            .with_user("friend@example.com")
            .with_vault("vault_abc")
            .with_details(serde_json::json!({ "cookies": 3 }));

        assert_eq!(event.event_type, AuditEventType::VaultImported);
        assert_eq!(event.user.as_deref(), Some("friend@example.com"));
        assert_eq!(event.vault_id.as_deref(), Some("vault_abc"));
        assert_eq!(event.details.unwrap()["cookies"], 3);
    }

    #[test]
    fn log_and_read_events() {
        let (_temp, storage) = setup();
        let repo = AuditRepository::new(&storage);

        repo.log(
            &AuditEvent::new(AuditEventType::VaultCreated)
                .with_user("owner@example.com")
                .with_vault("v1"),
        )
        .unwrap();
        repo.log(
            &AuditEvent::new(AuditEventType::VaultImported)
                .with_user("friend@example.com")
                .with_vault("v1"),
        )
        .unwrap();

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let events = repo.read_events(&today).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, AuditEventType::VaultCreated);
        assert_eq!(events[1].event_type, AuditEventType::VaultImported);
    }

    #[test]
    fn day_without_events_is_empty() {
        let (_temp, storage) = setup();
        assert!(AuditRepository::new(&storage)
            .read_events("2001-01-01")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn search_by_vault() {
        let (_temp, storage) = setup();
        let repo = AuditRepository::new(&storage);

        for vault_id in ["target", "other", "target"] {
            repo.log(&AuditEvent::new(AuditEventType::VaultCreated).with_vault(vault_id))
                .unwrap();
        }

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let events = repo.search_by_vault("target", &today).unwrap();
        assert_eq!(events.len(), 2);
    }
}
