//! Storage layer the bulk operations mutate.

mod memory;
mod traits;

pub use memory::MemoryStore;
#[cfg(test)]
pub use traits::MockCatalogStore;
pub use traits::CatalogStore;
