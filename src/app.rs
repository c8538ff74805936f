//! Application bootstrap: database, migrations, module lifecycle, HTTP.

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use bookshelf_authz::{AdminGate, StaticTokenGate};
use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};
use sqlx::SqlitePool;

use crate::modules;

/// A fully initialized application, ready to serve.
pub struct Application {
    settings: Settings,
    pool: SqlitePool,
    registry: ModuleRegistry,
    gate: Arc<dyn AdminGate>,
}

impl Application {
    /// Connect to the store, apply pending migrations, and initialize and
    /// start every registered module.
    pub async fn bootstrap(settings: Settings) -> anyhow::Result<Self> {
        let pool = bookshelf_db::connect(&settings.database).await?;
        let registry = build_registry()?;

        let applied = bookshelf_db::run_migrations(&pool, &registry.collect_migrations())
            .await
            .context("failed to apply migrations")?;
        tracing::info!(applied, "migrations up to date");

        let gate: Arc<dyn AdminGate> =
            Arc::new(StaticTokenGate::new(settings.auth.admin_tokens.iter().cloned()));

        let app = Self {
            settings,
            pool,
            registry,
            gate,
        };

        let ctx = app.ctx();
        app.registry.init_modules(&ctx).await?;
        app.registry.start_modules(&ctx).await?;

        Ok(app)
    }

    fn ctx(&self) -> InitCtx<'_> {
        InitCtx {
            settings: &self.settings,
            db: &self.pool,
            gate: &self.gate,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The complete HTTP router, middleware included.
    pub fn router(&self) -> Router {
        bookshelf_http::build_router(&self.registry, &self.ctx())
    }

    /// Serve until `shutdown` resolves, then stop modules and close the pool.
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let served = bookshelf_http::start_server(&self.registry, &self.ctx(), shutdown).await;
        self.shutdown().await?;
        served
    }

    /// Stop modules in reverse order and close the pool.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        let stopped = self.registry.stop_modules().await;
        self.pool.close().await;
        tracing::info!("bookshelf-app shut down");
        stopped
    }
}

/// Registry with every application module registered.
pub fn build_registry() -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry)?;
    Ok(registry)
}

/// Apply pending migrations without starting the server. Returns the number applied.
pub async fn migrate(settings: &Settings) -> anyhow::Result<usize> {
    let pool = bookshelf_db::connect(&settings.database).await?;
    let registry = build_registry()?;
    let applied = bookshelf_db::run_migrations(&pool, &registry.collect_migrations()).await;
    pool.close().await;
    applied
}
