//! BookRev application library
//!
//! Project modules (`reviews`, `admin`) and the bootstrap that wires them to
//! the kernel, store and HTTP server.

pub mod modules;
pub mod utils;

use anyhow::Context;
use bookrev_db::MemoryStore;
use bookrev_kernel::{settings::Settings, InitCtx, ModuleRegistry};

pub use modules::*;

/// Build a registry holding the store module and every project module.
pub fn build_registry(store: MemoryStore, settings: &Settings) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, store, settings);
    registry
}

/// Run the service until a shutdown signal arrives.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let registry = build_registry(MemoryStore::new(), &settings);
    let ctx = InitCtx {
        settings: &settings,
    };

    registry
        .init_all(&ctx)
        .await
        .context("module initialization failed")?;
    registry
        .start_all(&ctx)
        .await
        .context("module startup failed")?;

    let served = bookrev_http::start_server(&registry, &settings).await;

    // Stop modules even when the server failed.
    if let Err(e) = registry.stop_all().await {
        tracing::error!(error = %e, "module shutdown failed");
    }
    served
}
