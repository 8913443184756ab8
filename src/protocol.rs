// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Page Agent Message Protocol
//!
//! Request/response messages exchanged between the coordinator and the page
//! agent over the extension messaging channel.
//!
//! | Request | Wire form | Response |
//! |---------|-----------|----------|
//! | [`AgentRequest::GetLocalStorage`] | `"get-local-storage"` | mapping of every key to its value |
//! | [`AgentRequest::SetLocalStorage`] | `{"type": "set-local-storage", "localStorage": {...}}` | ack string containing the page URL |
//!
//! Any other message is answered with `false`, leaving it to other
//! listeners.
//!
//! The persisted-mailbox variant stores a [`PendingWrite`] under a URL
//! substring in the extension key-value store instead of messaging.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::LocalStorageMap;

/// Literal message requesting the page's local storage.
pub const GET_LOCAL_STORAGE: &str = "get-local-storage";

/// `type` tag of the message carrying local storage to write.
pub const SET_LOCAL_STORAGE: &str = "set-local-storage";

/// Protocol decoding failures on the coordinator side.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("unexpected response to {request}: {response}")]
    UnexpectedResponse { request: &'static str, response: String },
}

/// A request understood by the page agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentRequest {
    GetLocalStorage,
    SetLocalStorage(LocalStorageMap),
}

impl AgentRequest {
    /// Decode a raw message. Returns `None` for shapes the agent does not
    /// claim.
    pub fn decode(message: &Value) -> Option<Self> {
        match message {
            Value::String(tag) if tag == GET_LOCAL_STORAGE => Some(Self::GetLocalStorage),
            Value::Object(fields)
                if fields.get("type").and_then(Value::as_str) == Some(SET_LOCAL_STORAGE) =>
            {
                let entries = fields.get("localStorage")?;
                serde_json::from_value(entries.clone())
                    .ok()
                    .map(Self::SetLocalStorage)
            }
            _ => None,
        }
    }

    /// Encode into the wire form.
    pub fn encode(&self) -> Value {
        match self {
            Self::GetLocalStorage => Value::String(GET_LOCAL_STORAGE.to_string()),
            Self::SetLocalStorage(entries) => json!({
                "type": SET_LOCAL_STORAGE,
                "localStorage": entries,
            }),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::GetLocalStorage => GET_LOCAL_STORAGE,
            Self::SetLocalStorage(_) => SET_LOCAL_STORAGE,
        }
    }
}

/// The page agent's single response to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentResponse {
    /// Raw local-storage contents.
    LocalStorage(LocalStorageMap),
    /// Write applied; carries the page URL.
    Ack(String),
    /// Write failed inside the page; nothing was reloaded.
    Failed(String),
    /// Message not claimed by the agent.
    Unhandled,
}

impl AgentResponse {
    /// Build the acknowledgment sent after a successful write.
    pub fn ack_for(url: &str) -> Self {
        Self::Ack(format!("Successfully set localStorage for {url}"))
    }

    /// Encode into the wire form.
    pub fn to_value(&self) -> Value {
        match self {
            Self::LocalStorage(entries) => json!(entries),
            Self::Ack(message) => Value::String(message.clone()),
            Self::Failed(message) => json!({ "error": message }),
            Self::Unhandled => Value::Bool(false),
        }
    }

    /// Decode the response to `request`.
    ///
    /// The request kind decides how an object is read: a local-storage map
    /// may legitimately contain an `error` key.
    pub fn decode_for(request: &AgentRequest, value: &Value) -> Result<Self, ProtocolError> {
        let unexpected = || ProtocolError::UnexpectedResponse {
            request: request.name(),
            response: value.to_string(),
        };

        if value == &Value::Bool(false) {
            return Ok(Self::Unhandled);
        }

        match request {
            AgentRequest::GetLocalStorage => serde_json::from_value(value.clone())
                .map(Self::LocalStorage)
                .map_err(|_| unexpected()),
            AgentRequest::SetLocalStorage(_) => match value {
                Value::String(message) => Ok(Self::Ack(message.clone())),
                Value::Object(fields) => fields
                    .get("error")
                    .and_then(Value::as_str)
                    .map(|message| Self::Failed(message.to_string()))
                    .ok_or_else(unexpected),
                _ => Err(unexpected()),
            },
        }
    }
}

/// Local storage waiting in the mailbox for a page whose URL matches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingWrite {
    #[serde(rename = "newValue")]
    pub new_value: LocalStorageMap,
}

impl PendingWrite {
    pub fn new(new_value: LocalStorageMap) -> Self {
        Self { new_value }
    }
}
