// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Browser Capabilities
//!
//! The privileged browser APIs the transfer core depends on, expressed as
//! traits so the core runs against a real extension host or the in-memory
//! implementations in [`memory`].
//!
//! | Trait | Browser API |
//! |-------|-------------|
//! | [`CookieApi`] | privileged cookie read / write |
//! | [`TabApi`] | active tab in the current window |
//! | [`TabMessenger`] | message to the page agent of a tab |
//! | [`MailboxStore`] | extension key-value store holding pending writes |
//!
//! Every call is a suspension point; none of them carries a timeout.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use url::Url;

use crate::models::Cookie;
use crate::protocol::PendingWrite;

pub mod memory;

/// Errors raised by browser capabilities.
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    #[error("failed to set cookie {name}: {reason}")]
    CookieWrite { name: String, reason: String },

    #[error("failed to read cookies for {url}: {reason}")]
    CookieRead { url: String, reason: String },

    #[error("tab query failed: {0}")]
    Tabs(String),

    #[error("message to tab {tab_id} failed: {reason}")]
    Messaging { tab_id: i64, reason: String },

    #[error("mailbox store failed: {0}")]
    Mailbox(String),
}

/// A browser tab as reported by the tab query API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub id: i64,
    /// Absent when the extension lacks permission to see the URL.
    pub url: Option<String>,
}

impl Tab {
    pub fn new(id: i64, url: impl Into<String>) -> Self {
        Self {
            id,
            url: Some(url.into()),
        }
    }

    /// Parsed tab URL, if the tab exposes one that parses.
    pub fn parsed_url(&self) -> Option<Url> {
        self.url.as_deref().and_then(|url| Url::parse(url).ok())
    }
}

/// Privileged cookie API.
#[allow(async_fn_in_trait)]
pub trait CookieApi {
    /// All cookies visible to `url`.
    async fn get_all(&self, url: &str) -> Result<Vec<Cookie>, BrowserError>;

    /// Write one cookie against `url`. Overwrites a cookie with the same
    /// name, domain and path.
    async fn set(&self, url: &str, cookie: &Cookie) -> Result<(), BrowserError>;
}

/// Privileged tab query API.
#[allow(async_fn_in_trait)]
pub trait TabApi {
    /// The active tab of the current window, if any window is focused.
    async fn active_tab(&self) -> Result<Option<Tab>, BrowserError>;
}

/// Extension messaging channel to the page agent running in a tab.
#[allow(async_fn_in_trait)]
pub trait TabMessenger {
    /// Send `message` to the tab and wait for its single response.
    async fn send(&self, tab_id: i64, message: Value) -> Result<Value, BrowserError>;
}

/// Persisted extension key-value store holding pending local-storage writes.
#[allow(async_fn_in_trait)]
pub trait MailboxStore {
    /// Every pending write, keyed by URL substring.
    async fn entries(&self) -> Result<BTreeMap<String, PendingWrite>, BrowserError>;

    /// Store (or replace) a pending write.
    async fn put(&self, key: &str, write: PendingWrite) -> Result<(), BrowserError>;

    /// Delete a pending write. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<(), BrowserError>;
}

impl<T: CookieApi + ?Sized> CookieApi for Arc<T> {
    async fn get_all(&self, url: &str) -> Result<Vec<Cookie>, BrowserError> {
        (**self).get_all(url).await
    }

    async fn set(&self, url: &str, cookie: &Cookie) -> Result<(), BrowserError> {
        (**self).set(url, cookie).await
    }
}

impl<T: TabApi + ?Sized> TabApi for Arc<T> {
    async fn active_tab(&self) -> Result<Option<Tab>, BrowserError> {
        (**self).active_tab().await
    }
}

impl<T: TabMessenger + ?Sized> TabMessenger for Arc<T> {
    async fn send(&self, tab_id: i64, message: Value) -> Result<Value, BrowserError> {
        (**self).send(tab_id, message).await
    }
}

impl<T: MailboxStore + ?Sized> MailboxStore for Arc<T> {
    async fn entries(&self) -> Result<BTreeMap<String, PendingWrite>, BrowserError> {
        (**self).entries().await
    }

    async fn put(&self, key: &str, write: PendingWrite) -> Result<(), BrowserError> {
        (**self).put(key, write).await
    }

    async fn remove(&self, key: &str) -> Result<(), BrowserError> {
        (**self).remove(key).await
    }
}
