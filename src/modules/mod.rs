pub mod admin;
pub mod reviews;

use std::sync::Arc;

use bookrev_db::MemoryStore;
use bookrev_kernel::{settings::Settings, ModuleRegistry};

use reviews::routes::SharedCatalog;

/// Register the core store module and every project module with the registry.
pub fn register_all(registry: &mut ModuleRegistry, store: MemoryStore, settings: &Settings) {
    let catalog: SharedCatalog = Arc::new(store.clone());
    registry.register_core(bookrev_db::module::create_module(store));
    registry.register_custom(reviews::create_module(catalog.clone()));
    registry.register_custom(admin::create_module(settings.admin.clone(), catalog));
}
