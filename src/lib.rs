// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session Vault - capture and restore website session state
//!
//! This crate captures a website's authenticated session state (cookies and
//! local storage) into a vault, persists it in a vault store, and later
//! re-applies it to a browser tab.
//!
//! ## Modules
//!
//! - `sanitize` - Reversible escaping of storage keys
//! - `agent` - Page-side listener for local-storage requests
//! - `protocol` - Messages exchanged with the page agent
//! - `transfer` - Direct-message and mailbox transfer channels
//! - `coordinator` - Capture and restore flows
//! - `browser` - Privileged browser API seams and in-memory implementations
//! - `backend` - Vault backends (local repository, HTTP client)
//! - `api` - Vault store HTTP API handlers (Axum)
//! - `auth` - Bearer JWT authentication
//! - `storage` - File-backed vault documents and audit log

pub mod agent;
pub mod api;
pub mod auth;
pub mod backend;
pub mod browser;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod models;
pub mod protocol;
pub mod sanitize;
pub mod state;
pub mod storage;
pub mod transfer;
