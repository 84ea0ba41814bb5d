//! Book catalog application: module wiring and process lifecycle.

pub mod modules;
pub mod utils;
pub mod views;

use anyhow::Context;
use axum::Router;
use shelf_authz::{AccessPolicy, CredentialStore};
use shelf_http::AuthState;
use shelf_kernel::settings::Settings;
use shelf_kernel::{InitCtx, ModuleRegistry};
use sqlx::SqlitePool;

/// A fully wired application, ready to serve.
pub struct Application {
    pub router: Router,
    pub registry: ModuleRegistry,
    pub pool: SqlitePool,
}

/// Connect, migrate, initialize modules and assemble the router.
pub async fn bootstrap(settings: &Settings) -> anyhow::Result<Application> {
    let pool = shelf_db::connect(&settings.database).await?;

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry);

    let applied = shelf_db::migrate(&pool, &registry.collect_migrations()).await?;
    tracing::info!(applied, "migrations complete");

    registry
        .init_all(&InitCtx {
            settings,
            db: &pool,
        })
        .await?;

    let cost = settings.auth.bcrypt_cost;
    let credentials = tokio::task::spawn_blocking(move || CredentialStore::builtin(cost))
        .await
        .context("credential hashing task failed")??;
    let auth = AuthState::new(&settings.auth, AccessPolicy::catalog(), credentials);

    let router = shelf_http::build_router(&registry, settings, auth)?;

    Ok(Application {
        router,
        registry,
        pool,
    })
}

/// Apply pending migrations and exit.
pub async fn migrate(settings: &Settings) -> anyhow::Result<usize> {
    let pool = shelf_db::connect(&settings.database).await?;
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry);

    let applied = shelf_db::migrate(&pool, &registry.collect_migrations()).await?;
    pool.close().await;
    Ok(applied)
}

/// Serve until Ctrl-C, then stop modules in reverse order.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let app = bootstrap(&settings).await?;

    app.registry
        .start_all(&InitCtx {
            settings: &settings,
            db: &app.pool,
        })
        .await?;

    shelf_http::start_server(app.router, &settings, shutdown_signal()).await?;

    app.registry.stop_all().await?;
    app.pool.close().await;
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}
