//! Undo history for bulk mutations.
//!
//! Operations record a typed [`Snapshot`] of the values they are about to
//! overwrite; the presentation layer lists the reversible records and asks
//! for one to be undone, which dispatches to a [`CompensationHandler`].

mod log;
mod record;

pub use log::{CompensationHandler, CompensationLog, UndoReport};
pub use record::{
    FlagChange, OperationId, OperationRecord, OperationSummary, OperationType, PriceChange,
    QuantityChange, ReferenceChange, Snapshot, SnapshotKind,
};
