// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::error::Error;

use session_vault::{
    api::router,
    config::ServerConfig,
    logging::init_tracing,
    state::{AppState, AuthConfig},
    storage::{DocumentStorage, StoragePaths},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = ServerConfig::from_env()?;
    init_tracing(config.log_format);

    let mut storage = DocumentStorage::new(StoragePaths::new(&config.data_dir));
    storage.initialize()?;
    info!(data_dir = %config.data_dir.display(), "Vault storage ready");

    let auth_config = AuthConfig {
        jwt_secret: config.jwt_secret.clone(),
    };
    if auth_config.is_development() {
        warn!("VAULT_JWT_SECRET is not set: bearer tokens are NOT verified (development mode)");
    }

    let state = AppState::new(storage).with_auth_config(auth_config);
    let app = router(state);

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received");
                signal_token.cancel();
            }
            Err(e) => warn!(error = %e, "Failed to listen for shutdown signal"),
        }
    });

    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Session vault store listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Server stopped");
    Ok(())
}
