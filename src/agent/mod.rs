// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Page Agent
//!
//! Runs in the context of a loaded page and answers the coordinator's
//! local-storage requests. The agent holds no state between messages; the
//! page's storage and navigation are injected as [`StorageRepository`] and
//! [`PageControl`].
//!
//! ## Message Handling
//!
//! - `get-local-storage`: respond with the raw key/value pairs.
//! - `set-local-storage`: write every entry (last write wins), respond with
//!   an ack naming the page URL, then reload the page once.
//! - anything else: respond `false` and leave the message unclaimed.
//!
//! ## Pending Writes
//!
//! [`PageAgent::on_pending_writes_changed`] consumes a pending write from the
//! mailbox whose key is a substring of the page URL. When several keys match,
//! the longest one is consumed and the rest stay pending. The entry is
//! deleted before it is applied, so each pending write applies at most once.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::browser::{BrowserError, MailboxStore};
use crate::models::LocalStorageMap;
use crate::protocol::{AgentRequest, AgentResponse};

pub mod memory;

/// Page-side failures.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("local storage write failed: {0}")]
    StorageWrite(String),

    #[error(transparent)]
    Browser(#[from] BrowserError),
}

/// The page's local storage area.
pub trait StorageRepository {
    /// Every key/value pair currently stored.
    fn read(&self) -> LocalStorageMap;

    /// Set each entry, overwriting existing values. Keys not in `entries` are
    /// left untouched.
    fn write(&self, entries: &LocalStorageMap) -> Result<(), AgentError>;
}

/// Navigation controls of the page the agent runs in.
pub trait PageControl {
    /// Current page URL.
    fn url(&self) -> String;

    /// Full navigation reload, discarding in-memory page state.
    fn reload(&self);
}

impl<T: StorageRepository + ?Sized> StorageRepository for Arc<T> {
    fn read(&self) -> LocalStorageMap {
        (**self).read()
    }

    fn write(&self, entries: &LocalStorageMap) -> Result<(), AgentError> {
        (**self).write(entries)
    }
}

impl<T: PageControl + ?Sized> PageControl for Arc<T> {
    fn url(&self) -> String {
        (**self).url()
    }

    fn reload(&self) {
        (**self).reload()
    }
}

/// Page-side listener for local-storage requests.
pub struct PageAgent<S, P> {
    storage: S,
    page: P,
}

impl<S: StorageRepository, P: PageControl> PageAgent<S, P> {
    pub fn new(storage: S, page: P) -> Self {
        Self { storage, page }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    /// Handle one inbound message, delivering exactly one response through
    /// `respond`.
    ///
    /// Returns whether the agent claimed the message. For writes, the
    /// response is delivered before the reload is issued.
    pub fn on_message(&self, message: &Value, respond: impl FnOnce(AgentResponse)) -> bool {
        let Some(request) = AgentRequest::decode(message) else {
            debug!("Ignoring unrecognised message");
            respond(AgentResponse::Unhandled);
            return false;
        };

        match request {
            AgentRequest::GetLocalStorage => {
                respond(AgentResponse::LocalStorage(self.storage.read()));
            }
            AgentRequest::SetLocalStorage(entries) => match self.storage.write(&entries) {
                Ok(()) => {
                    let url = self.page.url();
                    info!(url = %url, entries = entries.len(), "Applied local storage");
                    respond(AgentResponse::ack_for(&url));
                    self.page.reload();
                }
                Err(e) => {
                    warn!(error = %e, "Failed to apply local storage");
                    respond(AgentResponse::Failed(e.to_string()));
                }
            },
        }
        true
    }

    /// Handle one inbound message and return its response.
    pub fn handle(&self, message: &Value) -> AgentResponse {
        let mut response = AgentResponse::Unhandled;
        self.on_message(message, |r| response = r);
        response
    }

    /// React to a change of the pending-write mailbox.
    ///
    /// Returns the key of the consumed pending write, or `None` when no key
    /// matches the current page URL.
    pub async fn on_pending_writes_changed<K: MailboxStore>(
        &self,
        mailbox: &K,
    ) -> Result<Option<String>, AgentError> {
        let url = self.page.url();
        let pending = mailbox.entries().await?;

        let Some((key, write)) = pending
            .into_iter()
            .filter(|(key, _)| !key.is_empty() && url.contains(key.as_str()))
            .reduce(|best, candidate| {
                if candidate.0.len() > best.0.len() {
                    candidate
                } else {
                    best
                }
            })
        else {
            return Ok(None);
        };

        // Claim the entry before applying it. A failed claim leaves the page
        // untouched; a failed write after the claim is not retried.
        mailbox.remove(&key).await?;
        self.storage.write(&write.new_value)?;
        info!(
            url = %url,
            key = %key,
            entries = write.new_value.len(),
            "Consumed pending local storage write"
        );
        self.page.reload();
        Ok(Some(key))
    }
}

#[cfg(test)]
mod tests {
    use super::memory::{MemoryPage, MemoryStorage};
    use super::*;
    use crate::browser::memory::MemoryMailbox;
    use crate::protocol::PendingWrite;
    use serde_json::json;

    fn entries(pairs: &[(&str, &str)]) -> LocalStorageMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn agent(
        initial: &[(&str, &str)],
        url: &str,
    ) -> PageAgent<Arc<MemoryStorage>, Arc<MemoryPage>> {
        PageAgent::new(
            Arc::new(MemoryStorage::with_entries(entries(initial))),
            Arc::new(MemoryPage::new(url)),
        )
    }

    #[test]
    fn get_local_storage_returns_raw_entries() {
        let agent = agent(&[("persist:root.auth", "{}"), ("theme", "dark")], "https://a.example/");

        let response = agent.handle(&json!("get-local-storage"));
        assert_eq!(
            response,
            AgentResponse::LocalStorage(entries(&[("persist:root.auth", "{}"), ("theme", "dark")]))
        );
        assert_eq!(agent.page().reloads(), 0);
    }

    #[test]
    fn set_local_storage_overwrites_and_reloads_once() {
        let agent = agent(&[("a", "old"), ("keep", "x")], "https://a.example/home");

        let response = agent.handle(&json!({
            "type": "set-local-storage",
            "localStorage": { "a": "1", "b": "2" }
        }));

        assert_eq!(
            response,
            AgentResponse::Ack("Successfully set localStorage for https://a.example/home".to_string())
        );
        assert_eq!(
            agent.storage().read(),
            entries(&[("a", "1"), ("b", "2"), ("keep", "x")])
        );
        assert_eq!(agent.page().reloads(), 1);
    }

    #[test]
    fn response_is_sent_before_reload() {
        let agent = agent(&[], "https://a.example/");
        let page = Arc::clone(agent.page());

        let claimed = agent.on_message(
            &json!({ "type": "set-local-storage", "localStorage": { "a": "1" } }),
            |response| {
                assert!(matches!(response, AgentResponse::Ack(_)));
                assert_eq!(page.reloads(), 0);
            },
        );

        assert!(claimed);
        assert_eq!(agent.page().reloads(), 1);
    }

    #[test]
    fn unknown_message_is_unclaimed() {
        let agent = agent(&[("a", "1")], "https://a.example/");
        let mut seen = None;

        let claimed = agent.on_message(&json!({ "type": "get-cookies" }), |r| seen = Some(r));

        assert!(!claimed);
        assert_eq!(seen.map(|r| r.to_value()), Some(json!(false)));
        assert_eq!(agent.page().reloads(), 0);
    }

    #[test]
    fn failed_write_reports_and_skips_reload() {
        let agent = agent(&[], "https://a.example/");
        agent.storage().fail_writes("quota exceeded");

        let response = agent.handle(&json!({
            "type": "set-local-storage",
            "localStorage": { "a": "1" }
        }));

        assert!(matches!(response, AgentResponse::Failed(msg) if msg.contains("quota exceeded")));
        assert_eq!(agent.page().reloads(), 0);
    }

    #[tokio::test]
    async fn pending_write_is_consumed_once() {
        let agent = agent(&[], "https://bank.example/dashboard");
        let mailbox = MemoryMailbox::new();
        mailbox
            .put("bank.example", PendingWrite::new(entries(&[("token", "t")])))
            .await
            .unwrap();

        let consumed = agent.on_pending_writes_changed(&mailbox).await.unwrap();
        assert_eq!(consumed.as_deref(), Some("bank.example"));
        assert_eq!(agent.storage().read(), entries(&[("token", "t")]));
        assert!(mailbox.entries().await.unwrap().is_empty());
        assert_eq!(agent.page().reloads(), 1);

        let again = agent.on_pending_writes_changed(&mailbox).await.unwrap();
        assert_eq!(again, None);
        assert_eq!(agent.page().reloads(), 1);
    }

    #[tokio::test]
    async fn longest_matching_key_wins() {
        let agent = agent(&[], "https://app.bank.example/");
        let mailbox = MemoryMailbox::new();
        mailbox
            .put("bank.example", PendingWrite::new(entries(&[("who", "short")])))
            .await
            .unwrap();
        mailbox
            .put("app.bank.example", PendingWrite::new(entries(&[("who", "long")])))
            .await
            .unwrap();
        mailbox
            .put("other.example", PendingWrite::new(entries(&[("who", "other")])))
            .await
            .unwrap();

        let consumed = agent.on_pending_writes_changed(&mailbox).await.unwrap();
        assert_eq!(consumed.as_deref(), Some("app.bank.example"));
        assert_eq!(agent.storage().read(), entries(&[("who", "long")]));

        let remaining: Vec<_> = mailbox.entries().await.unwrap().into_keys().collect();
        assert_eq!(remaining, vec!["bank.example", "other.example"]);
    }

    #[tokio::test]
    async fn failed_claim_applies_nothing() {
        let agent = agent(&[], "https://bank.example/");
        let mailbox = MemoryMailbox::new();
        mailbox
            .put("bank.example", PendingWrite::new(entries(&[("token", "t")])))
            .await
            .unwrap();
        mailbox.fail_removes("storage.local unavailable");

        let result = agent.on_pending_writes_changed(&mailbox).await;
        assert!(matches!(result, Err(AgentError::Browser(BrowserError::Mailbox(_)))));
        assert!(agent.storage().read().is_empty());
        assert_eq!(agent.page().reloads(), 0);
        assert_eq!(mailbox.entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_write_after_claim_is_not_replayed() {
        let agent = agent(&[], "https://bank.example/");
        agent.storage().fail_writes("quota exceeded");
        let mailbox = MemoryMailbox::new();
        mailbox
            .put("bank.example", PendingWrite::new(entries(&[("token", "t")])))
            .await
            .unwrap();

        assert!(agent.on_pending_writes_changed(&mailbox).await.is_err());
        assert!(mailbox.entries().await.unwrap().is_empty());
        assert_eq!(agent.page().reloads(), 0);
        assert_eq!(agent.on_pending_writes_changed(&mailbox).await.unwrap(), None);
    }

    #[tokio::test]
    async fn non_matching_pending_writes_stay() {
        let agent = agent(&[], "https://a.example/");
        let mailbox = MemoryMailbox::new();
        mailbox
            .put("b.example", PendingWrite::new(entries(&[("k", "v")])))
            .await
            .unwrap();

        assert_eq!(agent.on_pending_writes_changed(&mailbox).await.unwrap(), None);
        assert_eq!(mailbox.entries().await.unwrap().len(), 1);
        assert!(agent.storage().read().is_empty());
    }
}
