//! schemaforge server.
//!
//! Discovers entity descriptions under the modules directory, compiles them,
//! materializes their tables and serves generic CRUD routes for each one.

pub mod api;
pub mod auth;
pub mod config;
pub mod discovery;

use anyhow::{Context, Result};
use axum::Router;
use schemaforge_hooks::{HookCatalog, HookLoader};
use schemaforge_model::{Compiler, EntityRegistry};
use schemaforge_storage::Store;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::AppState;
use crate::auth::StaticTokenResolver;
use crate::config::ServerConfig;
use crate::discovery::{discover, DiscoveryReport};

/// A bootstrapped application, ready to serve.
pub struct App {
    pub router: Router,
    pub registry: Arc<EntityRegistry>,
    pub report: DiscoveryReport,
}

/// Opens the configured database and bootstraps the application on it.
pub fn bootstrap(config: &ServerConfig) -> Result<App> {
    let store = Store::open(&config.database)
        .with_context(|| format!("cannot open database {}", config.database.display()))?;
    bootstrap_with_store(config, store, HookCatalog::with_builtins())
}

/// Runs discovery, creates missing tables in `store` and builds the router.
///
/// `catalog` supplies the native hook handlers `hooks.toml` files may name.
pub fn bootstrap_with_store(
    config: &ServerConfig,
    store: Store,
    catalog: HookCatalog,
) -> Result<App> {
    let compiler = Compiler::new(config.unknown_field_types);
    let loader = HookLoader::new(catalog);
    let discovered = discover(&config.modules_dir, &compiler, &loader).with_context(|| {
        format!("discovery of {} failed", config.modules_dir.display())
    })?;

    for entry in discovered.registry.entries() {
        store
            .materialize(entry)
            .with_context(|| format!("cannot create table for {}", entry.key()))?;
    }

    let resolver = StaticTokenResolver::new(&config.tokens);
    if config.require_auth && resolver.is_empty() {
        warn!("require_auth is set but no tokens are configured; every request will be rejected");
    }

    let state = AppState {
        store: Arc::new(store),
        registry: Arc::clone(&discovered.registry),
        resolver: Arc::new(resolver),
        require_auth: config.require_auth,
        default_page_limit: config.default_page_limit,
    };
    let router = api::router(state, discovered.bindings);

    Ok(App {
        router,
        registry: discovered.registry,
        report: discovered.report,
    })
}

/// Bootstraps and serves until ctrl-c.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let app = bootstrap(&config)?;
    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("cannot listen on {}", config.listen))?;
    info!(
        address = %listener.local_addr()?,
        entities = app.registry.len(),
        "schemaforge listening"
    );
    axum::serve(listener, app.router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")?;
    info!("schemaforge stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
