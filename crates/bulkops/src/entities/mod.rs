//! Core entity types for catalog maintenance.

mod catalog;
mod filter;
mod ledger;
mod product;

pub use catalog::{Catalog, TaxRate};
pub use filter::ProductFilter;
pub use ledger::{Ledger, LedgerEntry};
pub use product::{Emitter, Product, StockLevel, TaxScope};
