// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Transfer Channels
//!
//! How local storage moves between the coordinator and the page agent of a
//! tab. The coordinator only sees [`TransferChannel`]; the delivery mechanism
//! is picked by configuration.
//!
//! | Channel | Read | Write |
//! |---------|------|-------|
//! | [`DirectMessage`] | `get-local-storage` message | `set-local-storage` message, acked by the agent |
//! | [`PersistedMailbox`] | `get-local-storage` message | [`PendingWrite`] stored under a URL substring |
//!
//! The mailbox is one-directional, so reads always go through messaging.

use tracing::{debug, info};

use crate::browser::{BrowserError, MailboxStore, Tab, TabMessenger};
use crate::config::{ClientConfig, MailboxKey, TransferMode};
use crate::models::LocalStorageMap;
use crate::protocol::{
    AgentRequest, AgentResponse, PendingWrite, ProtocolError, GET_LOCAL_STORAGE, SET_LOCAL_STORAGE,
};

/// Failures moving local storage to or from a page.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("page agent did not handle {0}")]
    Unhandled(&'static str),

    #[error("page agent failed to write local storage: {0}")]
    Rejected(String),

    #[error("tab {0} exposes no URL")]
    MissingUrl(i64),

    #[error("tab URL has no host: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Browser(#[from] BrowserError),
}

/// Outcome of handing local storage to a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The page agent applied the write and answered with this ack.
    Acknowledged(String),
    /// The write waits in the mailbox under `key` until a matching page
    /// consumes it.
    Queued { key: String },
}

/// Moves local storage between the coordinator and a tab's page agent.
#[allow(async_fn_in_trait)]
pub trait TransferChannel {
    /// Read the raw local storage of the page in `tab`.
    async fn request_local_storage(&self, tab: &Tab) -> Result<LocalStorageMap, TransferError>;

    /// Write `entries` into the page in `tab`. Happens at most once per call.
    async fn deliver_local_storage(
        &self,
        tab: &Tab,
        entries: &LocalStorageMap,
    ) -> Result<Delivery, TransferError>;
}

async fn exchange<M: TabMessenger>(
    messenger: &M,
    tab: &Tab,
    request: AgentRequest,
) -> Result<AgentResponse, TransferError> {
    let reply = messenger.send(tab.id, request.encode()).await?;
    Ok(AgentResponse::decode_for(&request, &reply)?)
}

async fn read_over_messaging<M: TabMessenger>(
    messenger: &M,
    tab: &Tab,
) -> Result<LocalStorageMap, TransferError> {
    match exchange(messenger, tab, AgentRequest::GetLocalStorage).await? {
        AgentResponse::LocalStorage(entries) => {
            debug!(tab_id = tab.id, entries = entries.len(), "Read local storage");
            Ok(entries)
        }
        AgentResponse::Unhandled => Err(TransferError::Unhandled(GET_LOCAL_STORAGE)),
        AgentResponse::Failed(reason) => Err(TransferError::Rejected(reason)),
        AgentResponse::Ack(ack) => Err(ProtocolError::UnexpectedResponse {
            request: GET_LOCAL_STORAGE,
            response: ack,
        }
        .into()),
    }
}

// =============================================================================
// Direct messaging
// =============================================================================

/// Request/response messaging with the page agent.
pub struct DirectMessage<M> {
    messenger: M,
}

impl<M: TabMessenger> DirectMessage<M> {
    pub fn new(messenger: M) -> Self {
        Self { messenger }
    }

    pub fn messenger(&self) -> &M {
        &self.messenger
    }
}

impl<M: TabMessenger> TransferChannel for DirectMessage<M> {
    async fn request_local_storage(&self, tab: &Tab) -> Result<LocalStorageMap, TransferError> {
        read_over_messaging(&self.messenger, tab).await
    }

    async fn deliver_local_storage(
        &self,
        tab: &Tab,
        entries: &LocalStorageMap,
    ) -> Result<Delivery, TransferError> {
        let request = AgentRequest::SetLocalStorage(entries.clone());
        match exchange(&self.messenger, tab, request).await? {
            AgentResponse::Ack(ack) => {
                info!(tab_id = tab.id, entries = entries.len(), ack = %ack, "Local storage delivered");
                Ok(Delivery::Acknowledged(ack))
            }
            AgentResponse::Failed(reason) => Err(TransferError::Rejected(reason)),
            AgentResponse::Unhandled => Err(TransferError::Unhandled(SET_LOCAL_STORAGE)),
            AgentResponse::LocalStorage(_) => Err(ProtocolError::UnexpectedResponse {
                request: SET_LOCAL_STORAGE,
                response: "local storage map".to_string(),
            }
            .into()),
        }
    }
}

// =============================================================================
// Persisted mailbox
// =============================================================================

/// Delivery through pending writes in the extension key-value store.
///
/// The page agent's change listener consumes the entry whose key is a
/// substring of its URL and reloads the page.
pub struct PersistedMailbox<M, K> {
    messenger: M,
    mailbox: K,
    key: MailboxKey,
}

impl<M: TabMessenger, K: MailboxStore> PersistedMailbox<M, K> {
    pub fn new(messenger: M, mailbox: K, key: MailboxKey) -> Self {
        Self {
            messenger,
            mailbox,
            key,
        }
    }

    pub fn mailbox(&self) -> &K {
        &self.mailbox
    }

    /// The mailbox key addressing the page currently shown in `tab`.
    pub fn key_for(&self, tab: &Tab) -> Result<String, TransferError> {
        let url = tab.url.as_deref().ok_or(TransferError::MissingUrl(tab.id))?;
        match self.key {
            MailboxKey::Url => Ok(url.to_string()),
            MailboxKey::Host => tab
                .parsed_url()
                .and_then(|u| u.host_str().map(str::to_string))
                .ok_or_else(|| TransferError::InvalidUrl(url.to_string())),
        }
    }
}

impl<M: TabMessenger, K: MailboxStore> TransferChannel for PersistedMailbox<M, K> {
    async fn request_local_storage(&self, tab: &Tab) -> Result<LocalStorageMap, TransferError> {
        read_over_messaging(&self.messenger, tab).await
    }

    async fn deliver_local_storage(
        &self,
        tab: &Tab,
        entries: &LocalStorageMap,
    ) -> Result<Delivery, TransferError> {
        let key = self.key_for(tab)?;
        self.mailbox
            .put(&key, PendingWrite::new(entries.clone()))
            .await?;
        info!(tab_id = tab.id, key = %key, entries = entries.len(), "Local storage queued");
        Ok(Delivery::Queued { key })
    }
}

// =============================================================================
// Configured channel
// =============================================================================

/// The channel selected by [`TransferMode`].
pub enum Channel<M, K> {
    Direct(DirectMessage<M>),
    Mailbox(PersistedMailbox<M, K>),
}

impl<M: TabMessenger, K: MailboxStore> Channel<M, K> {
    pub fn from_mode(mode: TransferMode, key: MailboxKey, messenger: M, mailbox: K) -> Self {
        match mode {
            TransferMode::Direct => Self::Direct(DirectMessage::new(messenger)),
            TransferMode::Mailbox => Self::Mailbox(PersistedMailbox::new(messenger, mailbox, key)),
        }
    }

    pub fn from_config(config: &ClientConfig, messenger: M, mailbox: K) -> Self {
        Self::from_mode(config.transfer_mode, config.mailbox_key, messenger, mailbox)
    }

    pub fn mode(&self) -> TransferMode {
        match self {
            Self::Direct(_) => TransferMode::Direct,
            Self::Mailbox(_) => TransferMode::Mailbox,
        }
    }
}

impl<M: TabMessenger, K: MailboxStore> TransferChannel for Channel<M, K> {
    async fn request_local_storage(&self, tab: &Tab) -> Result<LocalStorageMap, TransferError> {
        match self {
            Self::Direct(channel) => channel.request_local_storage(tab).await,
            Self::Mailbox(channel) => channel.request_local_storage(tab).await,
        }
    }

    async fn deliver_local_storage(
        &self,
        tab: &Tab,
        entries: &LocalStorageMap,
    ) -> Result<Delivery, TransferError> {
        match self {
            Self::Direct(channel) => channel.deliver_local_storage(tab, entries).await,
            Self::Mailbox(channel) => channel.deliver_local_storage(tab, entries).await,
        }
    }
}
