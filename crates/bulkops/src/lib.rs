#![warn(clippy::pedantic)]
// Allow common pedantic lints that don't affect correctness
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::float_cmp)]

//! # Bulkops
//!
//! Cancellable, reversible bulk maintenance operations for a retail catalog.
//!
//! This crate provides:
//! - A cooperative [`CancellationToken`] polled by every long-running loop
//! - A bounded in-memory [`CompensationLog`] of typed "before" snapshots
//! - Bulk operations (activation, stock and price zeroing, tax reassignment)
//!   that record what they changed so it can be undone
//! - A date-based ledger purge that is cancellable but never recorded
//! - A [`ControlPanel`] wiring one token and one history into the operations
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use bulkops::{ControlPanel, MemoryStore, Settings};
//!
//! let store = Arc::new(MemoryStore::load("catalog.json").await?);
//! let panel = ControlPanel::new(Settings::default(), store);
//!
//! panel.reset();
//! let outcome = panel.operations().zero_negative_stock().await?;
//! if let Some(id) = outcome.record {
//!     panel.undo(&id).await?;
//! }
//! ```

// Cooperative cancellation
pub mod cancel;

// Undo history
pub mod compensation;

// Settings
pub mod config;

// Core entities
pub mod entities;

// Error types
pub mod errors;

// Bulk mutating operations
pub mod operations;

// Application wiring
pub mod panel;

// Storage layer
pub mod storage;

// Terminal UI helpers
pub mod ui;

pub use cancel::{CancellationToken, EpochSignal};
pub use compensation::{
    CompensationHandler, CompensationLog, OperationId, OperationRecord, OperationSummary,
    OperationType, Snapshot, UndoReport,
};
pub use config::Settings;
pub use entities::{
    Catalog, Emitter, Ledger, LedgerEntry, Product, ProductFilter, StockLevel, TaxRate, TaxScope,
};
pub use errors::{BulkOpsError, BulkOpsResult};
pub use operations::{OperationOutcome, OperationsManager, StoreCompensator};
pub use panel::ControlPanel;
pub use storage::{CatalogStore, MemoryStore};
