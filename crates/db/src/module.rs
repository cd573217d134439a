use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use bookrev_kernel::{InitCtx, Module};

use crate::memory::MemoryStore;
use crate::transfer;

/// Core module owning the shared [`MemoryStore`]. On init it imports the
/// configured seed file, if any.
pub struct DatabaseModule {
    store: MemoryStore,
}

impl DatabaseModule {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }
}

#[async_trait]
impl Module for DatabaseModule {
    fn name(&self) -> &'static str {
        "db"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let Some(seed) = &ctx.settings.database.seed_csv else {
            tracing::info!(module = self.name(), "no seed file configured, starting empty");
            return Ok(());
        };

        let report = transfer::import_file(&self.store, seed)
            .await
            .with_context(|| format!("failed to seed store from {}", seed.display()))?;

        tracing::info!(
            module = self.name(),
            seed = %seed.display(),
            created = report.total_created(),
            skipped_rows = report.errors.len(),
            "store seeded"
        );
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        let counts = self.store.counts().await;
        tracing::info!(module = self.name(), ?counts, "store closed");
        Ok(())
    }
}

pub fn create_module(store: MemoryStore) -> Arc<dyn Module> {
    Arc::new(DatabaseModule::new(store))
}
