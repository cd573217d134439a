//! Persistence layer for the BookRev catalog.
//!
//! Entities and their invariants live in [`models`]; each entity has an
//! explicit repository trait in [`repository`], all implemented by the
//! in-memory [`MemoryStore`]. [`transfer`] moves data in and out of the
//! store as sectional CSV.

pub mod csv;
pub mod error;
pub mod memory;
pub mod models;
pub mod module;
pub mod query;
pub mod repository;
pub mod transfer;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use module::DatabaseModule;
pub use query::{BookCondition, BookFilter};
