// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Vault Data Models
//!
//! Data structures shared by the transfer core, the vault store and its
//! HTTP API. All types derive `Serialize`, `Deserialize`, and `ToSchema`.
//!
//! ## Persisted Form
//!
//! A [`Vault`] is always held in its persisted form: `domain` and the keys of
//! `local_storage` are sanitized (see [`crate::sanitize`]). Use
//! [`Vault::hostname`] and [`crate::sanitize::unsanitize_map`] before handing
//! either to a browser.
//!
//! ## Field Names
//!
//! JSON field names are camelCase so cookies round-trip unchanged through the
//! browser cookie API (`httpOnly`, `expirationDate`) and vault documents use
//! `localStorage`, `sharedBy`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::sanitize::unsanitize_key;

/// Mapping of local-storage keys to values. Ordered for deterministic output.
pub type LocalStorageMap = BTreeMap<String, String>;

// =============================================================================
// Cookie
// =============================================================================

/// A browser cookie as read from and written to the privileged cookie API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
    /// Expiry in seconds since the epoch. `None` marks a session cookie.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<f64>,
}

impl Cookie {
    /// Whether the cookie lives only for the browser session.
    pub fn is_session(&self) -> bool {
        self.expiration_date.is_none()
    }
}

// =============================================================================
// Vault
// =============================================================================

/// A persisted snapshot of a website's session state.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Vault {
    /// Opaque document identifier (UUID).
    pub id: String,
    /// Sanitized hostname the snapshot was captured from.
    pub domain: String,
    /// Cookies in capture order.
    pub cookies: Vec<Cookie>,
    /// Local-storage contents keyed by sanitized key.
    pub local_storage: LocalStorageMap,
    /// Email of the user who captured and shared the vault.
    pub shared_by: String,
    /// Emails allowed to import the vault.
    #[serde(default)]
    pub receipts: Vec<String>,
    /// Emails that have imported the vault.
    #[serde(default)]
    pub imported: Vec<String>,
    /// When the vault was stored.
    pub created_at: DateTime<Utc>,
}

impl Vault {
    /// Unsanitized hostname.
    pub fn hostname(&self) -> String {
        unsanitize_key(&self.domain)
    }

    /// Origin the vault's cookies are written against.
    pub fn url(&self) -> String {
        format!("https://{}", self.hostname())
    }

    pub fn is_receipt(&self, email: &str) -> bool {
        self.receipts.iter().any(|r| r == email)
    }

    pub fn is_imported_by(&self, email: &str) -> bool {
        self.imported.iter().any(|i| i == email)
    }

    /// Record an import by `email`. Returns `false` if it was already recorded.
    pub fn mark_imported(&mut self, email: &str) -> bool {
        if self.is_imported_by(email) {
            return false;
        }
        self.imported.push(email.to_string());
        true
    }
}

/// Request to store a newly captured vault.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewVault {
    /// Sanitized hostname.
    pub domain: String,
    pub cookies: Vec<Cookie>,
    /// Local-storage contents keyed by sanitized key.
    pub local_storage: LocalStorageMap,
    /// Emails allowed to import the vault.
    pub receipts: Vec<String>,
}

/// Vaults available to a user, split by whether they already imported them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportableVaults {
    pub not_imported: Vec<Vault>,
    pub imported: Vec<Vault>,
}

/// Partition vaults by whether `email` has imported them.
pub fn split_by_import(vaults: Vec<Vault>, email: &str) -> ImportableVaults {
    let (imported, not_imported) = vaults
        .into_iter()
        .partition(|vault| vault.is_imported_by(email));
    ImportableVaults {
        not_imported,
        imported,
    }
}

/// Canonical form of an email used in `sharedBy`, `receipts` and `imported`.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Remove duplicate entries while keeping first-seen order.
pub(crate) fn dedup_preserving_order(values: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    values
        .into_iter()
        .filter(|value| seen.insert(value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vault(id: &str, imported: &[&str]) -> Vault {
        Vault {
            id: id.to_string(),
            domain: "app_DOT_example_DOT_com".to_string(),
            cookies: Vec::new(),
            local_storage: LocalStorageMap::new(),
            shared_by: "owner@example.com".to_string(),
            receipts: vec!["friend@example.com".to_string()],
            imported: imported.iter().map(|s| s.to_string()).collect(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn cookie_uses_browser_field_names() {
        let cookie = Cookie {
            name: "sid".to_string(),
            value: "abc".to_string(),
            domain: ".example.com".to_string(),
            path: "/".to_string(),
            secure: true,
            http_only: true,
            expiration_date: Some(1_900_000_000.5),
        };
        let value = serde_json::to_value(&cookie).unwrap();
        assert_eq!(value["httpOnly"], json!(true));
        assert_eq!(value["expirationDate"], json!(1_900_000_000.5));
        assert!(!cookie.is_session());
    }

    #[test]
    fn session_cookie_omits_expiration() {
        let cookie: Cookie = serde_json::from_value(json!({
            "name": "sid",
            "value": "abc",
            "domain": "example.com",
            "path": "/"
        }))
        .unwrap();
        assert!(cookie.is_session());
        assert!(!cookie.secure);
        let value = serde_json::to_value(&cookie).unwrap();
        assert!(value.get("expirationDate").is_none());
    }

    #[test]
    fn vault_url_unsanitizes_domain() {
        let v = vault("v1", &[]);
        assert_eq!(v.hostname(), "app.example.com");
        assert_eq!(v.url(), "https://app.example.com");
    }

    #[test]
    fn vault_serializes_local_storage_field() {
        let mut v = vault("v1", &[]);
        v.local_storage.insert("k".to_string(), "v".to_string());
        let value = serde_json::to_value(&v).unwrap();
        assert_eq!(value["localStorage"]["k"], json!("v"));
        assert_eq!(value["sharedBy"], json!("owner@example.com"));
    }

    #[test]
    fn mark_imported_is_idempotent() {
        let mut v = vault("v1", &[]);
        assert!(v.mark_imported("friend@example.com"));
        assert!(!v.mark_imported("friend@example.com"));
        assert_eq!(v.imported, vec!["friend@example.com".to_string()]);
    }

    #[test]
    fn split_by_import_partitions() {
        let vaults = vec![
            vault("a", &[]),
            vault("b", &["friend@example.com"]),
            vault("c", &["someone@example.com"]),
        ];
        let split = split_by_import(vaults, "friend@example.com");
        let not_imported: Vec<_> = split.not_imported.iter().map(|v| v.id.as_str()).collect();
        let imported: Vec<_> = split.imported.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(not_imported, vec!["a", "c"]);
        assert_eq!(imported, vec!["b"]);
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let values = vec!["b".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(dedup_preserving_order(values), vec!["b", "a"]);
    }
}
