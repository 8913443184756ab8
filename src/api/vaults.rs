// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Vault store endpoints.
//!
//! A vault is visible to the user who shared it and to its receipts. Only
//! receipts may mark it imported; only the sharer may delete it.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    audit_log,
    auth::{Auth, Caller},
    backend::VaultBackend,
    error::ApiError,
    models::{NewVault, Vault},
    state::AppState,
    storage::{AuditEventType, StorageError, VaultRepository},
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ReceiptQuery {
    /// Receipt email to list vaults for. Defaults to the caller.
    pub receipt: Option<String>,
}

fn can_read(vault: &Vault, caller: &Caller) -> bool {
    vault.shared_by == caller.email || vault.is_receipt(&caller.email)
}

#[utoipa::path(
    get,
    path = "/v1/vaults",
    params(ReceiptQuery),
    tag = "Vaults",
    responses(
        (status = 200, body = [Vault]),
        (status = 403, description = "Listing another user's vaults")
    )
)]
pub async fn list_vaults(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Query(params): Query<ReceiptQuery>,
) -> Result<Json<Vec<Vault>>, ApiError> {
    let receipt = params
        .receipt
        .as_deref()
        .map(Caller::normalize_email)
        .unwrap_or_else(|| caller.email.clone());

    if receipt != caller.email {
        return Err(ApiError::forbidden("Vaults can only be listed for the caller"));
    }

    let vaults = state.backend().list_for_receipt(&receipt).await?;
    Ok(Json(vaults))
}

#[utoipa::path(
    post,
    path = "/v1/vaults",
    request_body = NewVault,
    tag = "Vaults",
    responses(
        (status = 201, body = Vault),
        (status = 422, description = "Missing domain")
    )
)]
pub async fn create_vault(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Json(request): Json<NewVault>,
) -> Result<(StatusCode, Json<Vault>), ApiError> {
    if request.domain.trim().is_empty() {
        return Err(ApiError::unprocessable("domain is required"));
    }

    let vault = state.backend().create(request, &caller.email).await?;

    audit_log!(&state.storage, AuditEventType::VaultCreated, caller, &vault.id);
    Ok((StatusCode::CREATED, Json(vault)))
}

#[utoipa::path(
    get,
    path = "/v1/vaults/{vault_id}",
    params(
        ("vault_id" = String, Path, description = "Identifier of the vault")
    ),
    tag = "Vaults",
    responses(
        (status = 200, body = Vault),
        (status = 403, description = "Caller is neither sharer nor receipt"),
        (status = 404, description = "Vault not found")
    )
)]
pub async fn get_vault(
    Auth(caller): Auth,
    Path(vault_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vault>, ApiError> {
    let vault = VaultRepository::new(&state.storage).get(&vault_id)?;
    if !can_read(&vault, &caller) {
        audit_log!(&state.storage, AuditEventType::PermissionDenied, caller, &vault_id);
        return Err(ApiError::forbidden(format!("Access to vault {vault_id} denied")));
    }
    Ok(Json(vault))
}

#[utoipa::path(
    post,
    path = "/v1/vaults/{vault_id}/imported",
    params(
        ("vault_id" = String, Path, description = "Identifier of the imported vault")
    ),
    tag = "Vaults",
    responses(
        (status = 200, body = Vault),
        (status = 403, description = "Caller is not a receipt"),
        (status = 404, description = "Vault not found")
    )
)]
pub async fn mark_imported(
    Auth(caller): Auth,
    Path(vault_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vault>, ApiError> {
    match state.backend().mark_imported(&vault_id, &caller.email).await {
        Ok(vault) => {
            audit_log!(&state.storage, AuditEventType::VaultImported, caller, &vault_id);
            Ok(Json(vault))
        }
        Err(e) => {
            if matches!(e, crate::backend::BackendError::PermissionDenied(_)) {
                audit_log!(&state.storage, AuditEventType::PermissionDenied, caller, &vault_id);
            }
            Err(e.into())
        }
    }
}

#[utoipa::path(
    delete,
    path = "/v1/vaults/{vault_id}",
    params(
        ("vault_id" = String, Path, description = "Identifier of the vault to delete")
    ),
    tag = "Vaults",
    responses(
        (status = 204),
        (status = 403, description = "Caller did not share the vault"),
        (status = 404, description = "Vault not found")
    )
)]
pub async fn delete_vault(
    Auth(caller): Auth,
    Path(vault_id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let _guard = state.write_lock.lock().await;
    match VaultRepository::new(&state.storage).delete(&vault_id, &caller.email) {
        Ok(()) => {
            audit_log!(&state.storage, AuditEventType::VaultDeleted, caller, &vault_id);
            Ok(StatusCode::NO_CONTENT)
        }
        Err(e @ StorageError::PermissionDenied { .. }) => {
            audit_log!(&state.storage, AuditEventType::PermissionDenied, caller, &vault_id);
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cookie, LocalStorageMap};
    use crate::storage::{AuditRepository, DocumentStorage, StoragePaths};
    use tempfile::TempDir;

    const OWNER: &str = "owner@example.com";
    const FRIEND: &str = "friend@example.com";

    fn setup() -> (TempDir, AppState) {
        let temp = TempDir::new().unwrap();
        let mut storage = DocumentStorage::new(StoragePaths::new(temp.path()));
        storage.initialize().unwrap();
        (temp, AppState::new(storage))
    }

    fn auth(email: &str) -> Auth {
        Auth(Caller {
            email: email.to_string(),
            subject: format!("acct_{email}"),
            expires_at: 0,
        })
    }

    fn request() -> NewVault {
        let mut local_storage = LocalStorageMap::new();
        local_storage.insert("persist:root.auth".to_string(), "{}".to_string());
        NewVault {
            domain: "bank.example".to_string(),
            cookies: vec![Cookie {
                name: "sid".to_string(),
                value: "abc".to_string(),
                domain: ".bank.example".to_string(),
                path: "/".to_string(),
                secure: true,
                http_only: true,
                expiration_date: None,
            }],
            local_storage,
            receipts: vec!["Friend@Example.com".to_string(), FRIEND.to_string()],
        }
    }

    async fn create(state: &AppState) -> Vault {
        let (status, Json(vault)) = create_vault(auth(OWNER), State(state.clone()), Json(request()))
            .await
            .expect("vault creation succeeds");
        assert_eq!(status, StatusCode::CREATED);
        vault
    }

    #[tokio::test]
    async fn create_vault_persists_sanitized_document() {
        let (_temp, state) = setup();
        let vault = create(&state).await;

        assert_eq!(vault.shared_by, OWNER);
        assert_eq!(vault.domain, "bank_DOT_example");
        assert_eq!(vault.receipts, vec![FRIEND]);
        assert!(vault.local_storage.contains_key("persist:root_DOT_auth"));

        let Json(fetched) = get_vault(auth(FRIEND), Path(vault.id.clone()), State(state.clone()))
            .await
            .unwrap();
        assert_eq!(fetched, vault);
    }

    #[tokio::test]
    async fn create_vault_requires_domain() {
        let (_temp, state) = setup();
        let mut bad = request();
        bad.domain = "  ".to_string();

        let err = create_vault(auth(OWNER), State(state), Json(bad)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn list_vaults_defaults_to_caller() {
        let (_temp, state) = setup();
        let vault = create(&state).await;

        let query = ReceiptQuery { receipt: None };
        let Json(listed) = list_vaults(auth(FRIEND), State(state.clone()), Query(query))
            .await
            .unwrap();
        assert_eq!(listed, vec![vault]);

        let query = ReceiptQuery { receipt: None };
        let Json(owner_listing) = list_vaults(auth(OWNER), State(state.clone()), Query(query))
            .await
            .unwrap();
        assert!(owner_listing.is_empty());

        let query = ReceiptQuery {
            receipt: Some(FRIEND.to_string()),
        };
        let err = list_vaults(auth(OWNER), State(state), Query(query)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn get_vault_unknown_and_forbidden() {
        let (_temp, state) = setup();
        let vault = create(&state).await;

        let err = get_vault(
            auth(FRIEND),
            Path("00000000-0000-0000-0000-000000000000".to_string()),
            State(state.clone()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let err = get_vault(auth("stranger@example.com"), Path(vault.id), State(state))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn mark_imported_is_append_to_set() {
        let (_temp, state) = setup();
        let vault = create(&state).await;

        for _ in 0..2 {
            let Json(updated) = mark_imported(auth(FRIEND), Path(vault.id.clone()), State(state.clone()))
                .await
                .unwrap();
            assert_eq!(updated.imported, vec![FRIEND]);
        }

        let err = mark_imported(auth(OWNER), Path(vault.id.clone()), State(state.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn delete_vault_owner_only() {
        let (_temp, state) = setup();
        let vault = create(&state).await;

        let err = delete_vault(auth(FRIEND), Path(vault.id.clone()), State(state.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        let status = delete_vault(auth(OWNER), Path(vault.id.clone()), State(state.clone()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let err = get_vault(auth(OWNER), Path(vault.id.clone()), State(state.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
        let events = AuditRepository::new(&state.storage)
            .search_by_vault(&vault.id, &today)
            .unwrap();
        let kinds: Vec<_> = events.into_iter().map(|e| e.event_type).collect();
        assert_eq!(
            kinds,
            vec![
                AuditEventType::VaultCreated,
                AuditEventType::PermissionDenied,
                AuditEventType::VaultDeleted
            ]
        );
    }
}
