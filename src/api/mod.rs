// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::Caller,
    models::{Cookie, NewVault, Vault},
    state::AppState,
};

pub mod health;
pub mod vaults;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/vaults", get(vaults::list_vaults).post(vaults::create_vault))
        .route(
            "/vaults/{vault_id}",
            get(vaults::get_vault).delete(vaults::delete_vault),
        )
        .route("/vaults/{vault_id}/imported", post(vaults::mark_imported));

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        vaults::list_vaults,
        vaults::create_vault,
        vaults::get_vault,
        vaults::mark_imported,
        vaults::delete_vault,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            Vault,
            NewVault,
            Cookie,
            Caller,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Vaults", description = "Session vault storage and import tracking"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{DocumentStorage, StoragePaths};
    use axum::{body::Body, http::Request, http::StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn app() -> (TempDir, Router) {
        let temp = TempDir::new().unwrap();
        let mut storage = DocumentStorage::new(StoragePaths::new(temp.path()));
        storage.initialize().unwrap();
        (temp, router(AppState::new(storage)))
    }

    #[tokio::test]
    async fn liveness_route_is_public() {
        let (_temp, app) = app();
        let response = app
            .oneshot(Request::get("/health/live").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn vault_routes_require_a_bearer_token() {
        let (_temp, app) = app();
        let response = app
            .oneshot(Request::get("/v1/vaults").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn openapi_lists_vault_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/v1/vaults"));
        assert!(doc.paths.paths.contains_key("/v1/vaults/{vault_id}/imported"));
    }
}
