// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client for the vault store HTTP API.
//!
//! The store derives the acting user from the bearer token, so the
//! `shared_by` and `email` arguments only key the local listing cache.
//! Listings are cached per receipt email and dropped when an import or a
//! new share changes them.

use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::cache::ListingCache;
use super::{BackendError, VaultBackend};
use crate::config::{
    ClientConfig, LISTING_CACHE_CAPACITY, LISTING_CACHE_TTL, STORE_REQUEST_TIMEOUT,
};
use crate::models::{NewVault, Vault};

/// Error body returned by the vault store.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Vault backend talking to a remote vault store.
pub struct HttpBackend {
    http: Client,
    base_url: Url,
    token: String,
    cache: ListingCache,
}

impl HttpBackend {
    /// Create a client for the store at `base_url`, authenticating with the
    /// bearer `token`.
    pub fn new(mut base_url: Url, token: impl Into<String>) -> Result<Self, BackendError> {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = Client::builder().timeout(STORE_REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http,
            base_url,
            token: token.into(),
            cache: ListingCache::new(LISTING_CACHE_CAPACITY, LISTING_CACHE_TTL),
        })
    }

    pub fn from_config(config: &ClientConfig, token: impl Into<String>) -> Result<Self, BackendError> {
        Self::new(config.store_url.clone(), token)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base_url
            .join(path)
            .map_err(|e| BackendError::InvalidUrl(format!("{path}: {e}")))
    }

    /// Map non-success responses onto backend errors.
    async fn check(response: Response) -> Result<Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
        };

        Err(match status {
            StatusCode::NOT_FOUND => BackendError::NotFound(message),
            StatusCode::FORBIDDEN => BackendError::PermissionDenied(message),
            _ => BackendError::Status {
                status: status.as_u16(),
                message,
            },
        })
    }
}

impl VaultBackend for HttpBackend {
    async fn list_for_receipt(&self, email: &str) -> Result<Vec<Vault>, BackendError> {
        if let Some(vaults) = self.cache.get(email) {
            debug!(email = %email, "Vault listing served from cache");
            return Ok(vaults);
        }

        let mut url = self.endpoint("v1/vaults")?;
        url.query_pairs_mut().append_pair("receipt", email);

        let response = self.http.get(url).bearer_auth(&self.token).send().await?;
        let vaults: Vec<Vault> = Self::check(response).await?.json().await?;

        self.cache.put(email, vaults.clone());
        Ok(vaults)
    }

    async fn create(&self, new_vault: NewVault, shared_by: &str) -> Result<Vault, BackendError> {
        let response = self
            .http
            .post(self.endpoint("v1/vaults")?)
            .bearer_auth(&self.token)
            .json(&new_vault)
            .send()
            .await?;
        let vault: Vault = Self::check(response).await?.json().await?;

        if vault.shared_by != shared_by {
            debug!(
                expected = %shared_by,
                actual = %vault.shared_by,
                "Vault store attributed the share to the token's user"
            );
        }
        for receipt in &vault.receipts {
            self.cache.invalidate(receipt);
        }
        Ok(vault)
    }

    async fn mark_imported(&self, vault_id: &str, email: &str) -> Result<Vault, BackendError> {
        let response = self
            .http
            .post(self.endpoint(&format!("v1/vaults/{vault_id}/imported"))?)
            .bearer_auth(&self.token)
            .send()
            .await?;
        let vault: Vault = Self::check(response).await?.json().await?;

        self.cache.invalidate(email);
        Ok(vault)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let backend = HttpBackend::new(Url::parse("http://127.0.0.1:8080/store").unwrap(), "t").unwrap();
        assert_eq!(backend.base_url().as_str(), "http://127.0.0.1:8080/store/");
        assert_eq!(
            backend.endpoint("v1/vaults").unwrap().as_str(),
            "http://127.0.0.1:8080/store/v1/vaults"
        );
    }

    #[test]
    fn root_base_url_is_kept() {
        let backend = HttpBackend::new(Url::parse("http://127.0.0.1:8080").unwrap(), "t").unwrap();
        assert_eq!(
            backend.endpoint("v1/vaults/abc/imported").unwrap().as_str(),
            "http://127.0.0.1:8080/v1/vaults/abc/imported"
        );
    }
}
