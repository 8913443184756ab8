// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Vault Transfer Coordinator
//!
//! Captures a tab's session state into a vault and restores a vault into a
//! tab. Holds no state beyond the current user's email; the browser, the
//! transfer channel and the vault backend are injected.
//!
//! ## Restore Order
//!
//! 1. A vault must be selected.
//! 2. The active tab must expose a parseable URL.
//! 3. The tab hostname must equal the vault hostname exactly, and the vault
//!    must list the user as a receipt. Nothing is written otherwise.
//! 4. Every cookie is written concurrently and all writes settle.
//! 5. Local storage, with keys unsanitized, is delivered once.
//! 6. The vault is marked imported by the user.
//!
//! Any failure stops the flow. Cookies already written stay written, and the
//! vault is only marked imported after step 5 succeeds.

use futures::future::join_all;
use tracing::{info, instrument, warn};

use crate::backend::{BackendError, VaultBackend};
use crate::browser::{BrowserError, CookieApi, Tab, TabApi};
use crate::models::{normalize_email, split_by_import, ImportableVaults, NewVault, Vault};
use crate::sanitize::{sanitize_key, sanitize_map, unsanitize_map};
use crate::transfer::{Delivery, TransferChannel, TransferError};

/// Generic notice for failures without a dedicated message.
pub const GENERIC_RESTORE_NOTICE: &str = "Error importing vault";

/// Failures of the capture flow.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("no active tab")]
    NoActiveTab,

    #[error("active tab exposes no URL")]
    MissingUrl,

    #[error("tab URL has no hostname: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Failures of the restore flow.
#[derive(Debug, thiserror::Error)]
pub enum RestoreError {
    #[error("no vault selected")]
    NoSelection,

    #[error("no active tab")]
    NoActiveTab,

    #[error("active tab exposes no URL")]
    MissingUrl,

    #[error("tab URL has no hostname: {0}")]
    InvalidUrl(String),

    #[error("tab is on {tab}, vault belongs to {vault}")]
    DomainMismatch { tab: String, vault: String },

    #[error("vault {vault_id} is not shared with {user}")]
    NotShared { vault_id: String, user: String },

    #[error("failed to set cookies: {}", .failed.join(", "))]
    CookiesFailed { failed: Vec<String> },

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Browser(#[from] BrowserError),
}

impl RestoreError {
    /// Message shown to the user for this failure.
    pub fn notice(&self) -> &'static str {
        match self {
            RestoreError::NoSelection => "No selected vault.",
            RestoreError::NoActiveTab => "No active tab found.",
            RestoreError::MissingUrl | RestoreError::InvalidUrl(_) => {
                "Can't get the current tab's url"
            }
            RestoreError::DomainMismatch { .. } => {
                "Please go to the domain you're trying to import."
            }
            RestoreError::NotShared { .. } => "This vault wasn't shared with you.",
            _ => GENERIC_RESTORE_NOTICE,
        }
    }
}

/// Summary of a successful restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    pub vault_id: String,
    pub hostname: String,
    pub cookies_written: usize,
    pub delivery: Delivery,
    /// `false` when the user had already imported this vault.
    pub newly_imported: bool,
}

/// Orchestrates capture and restore for one user.
pub struct VaultCoordinator<B, C, V> {
    browser: B,
    channel: C,
    backend: V,
    user_email: String,
}

impl<B, C, V> VaultCoordinator<B, C, V>
where
    B: CookieApi + TabApi,
    C: TransferChannel,
    V: VaultBackend,
{
    pub fn new(browser: B, channel: C, backend: V, user_email: impl Into<String>) -> Self {
        let user_email: String = user_email.into();
        Self {
            browser,
            channel,
            backend,
            user_email: normalize_email(&user_email),
        }
    }

    pub fn user_email(&self) -> &str {
        &self.user_email
    }

    pub fn browser(&self) -> &B {
        &self.browser
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn backend(&self) -> &V {
        &self.backend
    }

    /// Snapshot the active tab's cookies and local storage into a new vault
    /// shared with `receipts`.
    #[instrument(skip(self, receipts), fields(user = %self.user_email))]
    pub async fn capture(&self, receipts: Vec<String>) -> Result<Vault, CaptureError> {
        let tab = self
            .browser
            .active_tab()
            .await?
            .ok_or(CaptureError::NoActiveTab)?;
        let tab_url = tab.url.clone().ok_or(CaptureError::MissingUrl)?;
        let hostname = tab
            .parsed_url()
            .and_then(|u| u.host_str().map(str::to_string))
            .ok_or_else(|| CaptureError::InvalidUrl(tab_url.clone()))?;

        let cookies = self.browser.get_all(&tab_url).await?;
        let local_storage = self.channel.request_local_storage(&tab).await?;

        let new_vault = NewVault {
            domain: sanitize_key(&hostname),
            cookies,
            local_storage: sanitize_map(&local_storage),
            receipts,
        };
        let vault = self.backend.create(new_vault, &self.user_email).await?;

        info!(
            vault_id = %vault.id,
            hostname = %hostname,
            cookies = vault.cookies.len(),
            entries = vault.local_storage.len(),
            "Vault captured"
        );
        Ok(vault)
    }

    /// Apply `vault` to the active tab and record the import.
    #[instrument(skip(self, vault), fields(user = %self.user_email))]
    pub async fn restore(&self, vault: Option<&Vault>) -> Result<RestoreReport, RestoreError> {
        let vault = vault.ok_or(RestoreError::NoSelection)?;
        let tab = self.resolve_tab().await?;
        let hostname = vault.hostname();

        let tab_host = tab_hostname(&tab)?;
        if tab_host != hostname {
            warn!(
                vault_id = %vault.id,
                tab = %tab_host,
                vault = %hostname,
                "Refusing to restore vault onto another domain"
            );
            return Err(RestoreError::DomainMismatch {
                tab: tab_host,
                vault: hostname,
            });
        }

        // Only receipts can be recorded as importers; refuse before any write.
        if !vault.is_receipt(&self.user_email) {
            warn!(vault_id = %vault.id, "Refusing to restore a vault not shared with the user");
            return Err(RestoreError::NotShared {
                vault_id: vault.id.clone(),
                user: self.user_email.clone(),
            });
        }

        self.apply_cookies(vault).await?;

        let entries = unsanitize_map(&vault.local_storage);
        let delivery = self.channel.deliver_local_storage(&tab, &entries).await?;

        let newly_imported = !vault.is_imported_by(&self.user_email);
        self.backend
            .mark_imported(&vault.id, &self.user_email)
            .await?;

        info!(
            vault_id = %vault.id,
            hostname = %hostname,
            cookies = vault.cookies.len(),
            entries = entries.len(),
            "Vault restored"
        );
        Ok(RestoreReport {
            vault_id: vault.id.clone(),
            hostname,
            cookies_written: vault.cookies.len(),
            delivery,
            newly_imported,
        })
    }

    /// Vaults shared with the user, split by whether they imported them.
    pub async fn importable(&self) -> Result<ImportableVaults, BackendError> {
        let vaults = self.backend.list_for_receipt(&self.user_email).await?;
        Ok(split_by_import(vaults, &self.user_email))
    }

    async fn resolve_tab(&self) -> Result<Tab, RestoreError> {
        let tab = self
            .browser
            .active_tab()
            .await?
            .ok_or(RestoreError::NoActiveTab)?;
        if tab.url.is_none() {
            return Err(RestoreError::MissingUrl);
        }
        Ok(tab)
    }

    /// Write every cookie concurrently and wait for all of them to settle.
    async fn apply_cookies(&self, vault: &Vault) -> Result<(), RestoreError> {
        let url = vault.url();
        let results = join_all(
            vault
                .cookies
                .iter()
                .map(|cookie| self.browser.set(&url, cookie)),
        )
        .await;

        let failed: Vec<String> = vault
            .cookies
            .iter()
            .zip(results)
            .filter_map(|(cookie, result)| match result {
                Ok(()) => None,
                Err(e) => {
                    warn!(vault_id = %vault.id, cookie = %cookie.name, error = %e, "Cookie write failed");
                    Some(cookie.name.clone())
                }
            })
            .collect();

        if failed.is_empty() {
            Ok(())
        } else {
            Err(RestoreError::CookiesFailed { failed })
        }
    }
}

fn tab_hostname(tab: &Tab) -> Result<String, RestoreError> {
    let raw = tab.url.as_deref().unwrap_or_default();
    tab.parsed_url()
        .and_then(|u| u.host_str().map(str::to_string))
        .ok_or_else(|| RestoreError::InvalidUrl(raw.to_string()))
}
