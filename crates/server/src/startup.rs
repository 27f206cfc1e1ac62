use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use configs::{AppConfig, StoreBackend};
use migration::MigratorTrait;
use tower_http::cors::CorsLayer;
use tracing::info;

use service::auth::{memory::InMemoryCredentialStore, password::PasswordHashing};
use service::auth::{AccountService, CredentialStore, SeaOrmCredentialStore};

use crate::errors::StartupError;
use crate::observability;
use crate::routes::{self, account::ServerState};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn bind_addr(cfg: &AppConfig) -> Result<SocketAddr, StartupError> {
    format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("server address: {e}")))
}

fn password_hashing(cfg: &AppConfig) -> Result<PasswordHashing, StartupError> {
    let a = &cfg.auth;
    PasswordHashing::from_costs(a.hash_memory_kib, a.hash_iterations, a.hash_parallelism)
        .map_err(|e| StartupError::InvalidConfig(e.to_string()))
}

/// Open the configured credential store, migrating the schema for postgres.
pub async fn build_store(cfg: &AppConfig) -> Result<Arc<dyn CredentialStore>, StartupError> {
    let hashing = password_hashing(cfg)?;
    let store: Arc<dyn CredentialStore> = match cfg.store.backend {
        StoreBackend::Memory => {
            info!(backend = "memory", "credential store ready; accounts are lost on restart");
            Arc::new(InMemoryCredentialStore::new(hashing))
        }
        StoreBackend::Postgres => {
            let db = models::db::connect_with_config(&cfg.database).await?;
            migration::Migrator::up(&db, None).await.map_err(anyhow::Error::from)?;
            info!(backend = "postgres", "credential store ready");
            Arc::new(SeaOrmCredentialStore::new(db, hashing))
        }
    };
    Ok(store)
}

/// Router over an already-built store. Tests use this directly.
pub fn build_app(store: Arc<dyn CredentialStore>) -> Router {
    observability::register_all();
    let state = ServerState::new(AccountService::new(store));
    routes::build_router(state, build_cors())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received, draining connections");
}

/// Public entry: build the app and serve until Ctrl+C.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let addr = bind_addr(&cfg)?;
    let store = build_store(&cfg).await?;
    let app = build_app(store);

    info!(%addr, backend = ?cfg.store.backend, "starting account service");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_addr_rejects_bad_host() {
        let mut cfg = AppConfig::default();
        cfg.server.host = "not a host".into();
        assert!(matches!(bind_addr(&cfg), Err(StartupError::InvalidConfig(_))));
        cfg.server.host = "0.0.0.0".into();
        assert_eq!(bind_addr(&cfg).unwrap().port(), 8080);
    }

    #[tokio::test]
    async fn memory_backend_is_the_default() {
        let mut cfg = AppConfig::default();
        cfg.auth.hash_memory_kib = 64;
        cfg.auth.hash_iterations = 1;
        assert!(build_store(&cfg).await.is_ok());
    }
}
