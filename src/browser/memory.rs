// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory browser capabilities that record every call.
//!
//! Used by the coordinator and transfer tests, and by the end-to-end tests
//! under `tests/`. A shared [`CallLog`] captures the interleaving of cookie
//! writes and messages across capabilities.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use url::Url;

use super::{BrowserError, CookieApi, MailboxStore, Tab, TabApi, TabMessenger};
use crate::agent::{PageAgent, PageControl, StorageRepository};
use crate::models::Cookie;
use crate::protocol::PendingWrite;

/// Ordered record of calls made against in-memory capabilities.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        if let Ok(mut entries) = self.0.lock() {
            entries.push(entry.into());
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

fn poisoned(what: &str) -> BrowserError {
    BrowserError::Tabs(format!("{what} lock poisoned"))
}

/// Whether a cookie's domain attribute covers `host`.
fn domain_matches(cookie_domain: &str, host: &str) -> bool {
    let domain = cookie_domain.trim_start_matches('.');
    host == domain || host.ends_with(&format!(".{domain}"))
}

// =============================================================================
// Cookies
// =============================================================================

/// Cookie jar keyed by `(name, domain, path)`.
#[derive(Debug, Default)]
pub struct MemoryCookieJar {
    cookies: Mutex<Vec<Cookie>>,
    set_calls: Mutex<Vec<(String, String)>>,
    rejected: Mutex<HashSet<String>>,
    log: CallLog,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cookies(cookies: Vec<Cookie>) -> Self {
        Self {
            cookies: Mutex::new(cookies),
            ..Self::default()
        }
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    /// Make writes of the cookie called `name` fail.
    pub fn reject(&self, name: impl Into<String>) {
        if let Ok(mut rejected) = self.rejected.lock() {
            rejected.insert(name.into());
        }
    }

    /// Every `(url, cookie name)` passed to `set`, in call order.
    pub fn set_calls(&self) -> Vec<(String, String)> {
        self.set_calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Current contents of the jar.
    pub fn cookies(&self) -> Vec<Cookie> {
        self.cookies.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl CookieApi for MemoryCookieJar {
    async fn get_all(&self, url: &str) -> Result<Vec<Cookie>, BrowserError> {
        let host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .ok_or_else(|| BrowserError::CookieRead {
                url: url.to_string(),
                reason: "URL has no host".to_string(),
            })?;

        Ok(self
            .cookies()
            .into_iter()
            .filter(|cookie| domain_matches(&cookie.domain, &host))
            .collect())
    }

    async fn set(&self, url: &str, cookie: &Cookie) -> Result<(), BrowserError> {
        self.set_calls
            .lock()
            .map_err(|_| poisoned("cookie"))?
            .push((url.to_string(), cookie.name.clone()));
        self.log.push(format!("cookie:{}", cookie.name));

        // Let sibling writes start before this one settles.
        tokio::task::yield_now().await;
        self.log.push(format!("cookie-settled:{}", cookie.name));

        let rejected = self
            .rejected
            .lock()
            .map_err(|_| poisoned("cookie"))?
            .contains(&cookie.name);
        if rejected {
            return Err(BrowserError::CookieWrite {
                name: cookie.name.clone(),
                reason: "rejected by cookie store".to_string(),
            });
        }

        let mut cookies = self.cookies.lock().map_err(|_| poisoned("cookie"))?;
        cookies.retain(|c| {
            !(c.name == cookie.name && c.domain == cookie.domain && c.path == cookie.path)
        });
        cookies.push(cookie.clone());
        Ok(())
    }
}

// =============================================================================
// Tabs
// =============================================================================

/// Tab query API returning a fixed active tab.
#[derive(Debug, Default)]
pub struct MemoryTabs {
    active: Mutex<Option<Tab>>,
}

impl MemoryTabs {
    pub fn new(active: Option<Tab>) -> Self {
        Self {
            active: Mutex::new(active),
        }
    }

    pub fn set_active(&self, tab: Option<Tab>) {
        if let Ok(mut active) = self.active.lock() {
            *active = tab;
        }
    }
}

impl TabApi for MemoryTabs {
    async fn active_tab(&self) -> Result<Option<Tab>, BrowserError> {
        Ok(self.active.lock().map_err(|_| poisoned("tab"))?.clone())
    }
}

/// Cookie jar and tab query API of one browser profile.
#[derive(Debug, Default)]
pub struct MemoryBrowser {
    pub cookies: MemoryCookieJar,
    pub tabs: MemoryTabs,
}

impl MemoryBrowser {
    pub fn new(cookies: MemoryCookieJar, active_tab: Option<Tab>) -> Self {
        Self {
            cookies,
            tabs: MemoryTabs::new(active_tab),
        }
    }
}

impl CookieApi for MemoryBrowser {
    async fn get_all(&self, url: &str) -> Result<Vec<Cookie>, BrowserError> {
        self.cookies.get_all(url).await
    }

    async fn set(&self, url: &str, cookie: &Cookie) -> Result<(), BrowserError> {
        self.cookies.set(url, cookie).await
    }
}

impl TabApi for MemoryBrowser {
    async fn active_tab(&self) -> Result<Option<Tab>, BrowserError> {
        self.tabs.active_tab().await
    }
}

// =============================================================================
// Messaging
// =============================================================================

/// Messenger delivering every message to an in-process page agent.
pub struct AgentMessenger<S, P> {
    agent: Arc<PageAgent<S, P>>,
    sent: Mutex<Vec<(i64, Value)>>,
    log: CallLog,
}

impl<S, P> AgentMessenger<S, P> {
    pub fn new(agent: Arc<PageAgent<S, P>>) -> Self {
        Self {
            agent,
            sent: Mutex::new(Vec::new()),
            log: CallLog::new(),
        }
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    /// Every `(tab id, message)` sent, in order.
    pub fn sent(&self) -> Vec<(i64, Value)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl<S: StorageRepository, P: PageControl> TabMessenger for AgentMessenger<S, P> {
    async fn send(&self, tab_id: i64, message: Value) -> Result<Value, BrowserError> {
        let label = match &message {
            Value::String(tag) => tag.clone(),
            other => other
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
        };
        self.log.push(format!("message:{label}"));
        self.sent
            .lock()
            .map_err(|_| BrowserError::Messaging {
                tab_id,
                reason: "messenger lock poisoned".to_string(),
            })?
            .push((tab_id, message.clone()));

        Ok(self.agent.handle(&message).to_value())
    }
}

// =============================================================================
// Mailbox
// =============================================================================

/// Extension key-value store holding pending writes.
#[derive(Debug, Default)]
pub struct MemoryMailbox {
    entries: Mutex<BTreeMap<String, PendingWrite>>,
    remove_failure: Mutex<Option<String>>,
}

impl MemoryMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later `remove` fail with `reason`.
    pub fn fail_removes(&self, reason: impl Into<String>) {
        if let Ok(mut failure) = self.remove_failure.lock() {
            *failure = Some(reason.into());
        }
    }
}

impl MailboxStore for MemoryMailbox {
    async fn entries(&self) -> Result<BTreeMap<String, PendingWrite>, BrowserError> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .map_err(|_| BrowserError::Mailbox("mailbox lock poisoned".to_string()))
    }

    async fn put(&self, key: &str, write: PendingWrite) -> Result<(), BrowserError> {
        self.entries
            .lock()
            .map_err(|_| BrowserError::Mailbox("mailbox lock poisoned".to_string()))?
            .insert(key.to_string(), write);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), BrowserError> {
        if let Some(reason) = self
            .remove_failure
            .lock()
            .ok()
            .and_then(|failure| failure.clone())
        {
            return Err(BrowserError::Mailbox(reason));
        }

        self.entries
            .lock()
            .map_err(|_| BrowserError::Mailbox("mailbox lock poisoned".to_string()))?
            .remove(key);
        Ok(())
    }
}
