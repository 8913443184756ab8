// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::backend::LocalBackend;
use crate::storage::DocumentStorage;

/// Bearer token verification settings.
#[derive(Clone, Default)]
pub struct AuthConfig {
    /// HS256 secret. `None` enables development mode (no signature check).
    pub jwt_secret: Option<String>,
}

impl AuthConfig {
    pub fn is_development(&self) -> bool {
        self.jwt_secret.is_none()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<DocumentStorage>,
    pub auth_config: AuthConfig,
    /// Serializes read-modify-write operations on vault documents.
    pub write_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(storage: DocumentStorage) -> Self {
        Self {
            storage: Arc::new(storage),
            auth_config: AuthConfig::default(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_auth_config(mut self, auth_config: AuthConfig) -> Self {
        self.auth_config = auth_config;
        self
    }

    /// Vault backend sharing this state's storage and write lock.
    pub fn backend(&self) -> LocalBackend {
        LocalBackend::with_lock(Arc::clone(&self.storage), Arc::clone(&self.write_lock))
    }
}
