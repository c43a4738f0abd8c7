//! Bulk mutating operations.
//!
//! Every operation here follows the same contract: capture the previous value
//! of each entity it is about to change, apply the change one entity at a
//! time while polling the cancellation token, then record the captured values
//! of the entities that actually changed in the compensation log. A cancelled
//! run is not an error; it returns the partial count.

mod compensate;
mod emitters;
mod maintenance;
mod products;
mod stock;
mod taxes;

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};

pub use compensate::StoreCompensator;

use crate::cancel::CancellationToken;
use crate::compensation::{
    CompensationLog, FlagChange, OperationId, OperationType, PriceChange, QuantityChange,
    ReferenceChange, Snapshot,
};
use crate::config::Settings;
use crate::errors::{BulkOpsError, BulkOpsResult};
use crate::storage::CatalogStore;

/// Result of one bulk operation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationOutcome {
    pub op_type: OperationType,
    /// Entities actually modified
    pub processed: usize,
    /// The run stopped early on a cancellation request
    pub cancelled: bool,
    /// History entry created for this run, if anything changed
    pub record: Option<OperationId>,
}

impl OperationOutcome {
    pub fn summary(&self) -> String {
        if self.cancelled {
            format!("operation cancelled: {} processed", self.processed)
        } else {
            format!("{}: {} processed", self.op_type, self.processed)
        }
    }
}

/// Entity a captured change applies to
pub(crate) trait EntityChange {
    fn entity_id(&self) -> &str;
}

impl EntityChange for FlagChange {
    fn entity_id(&self) -> &str {
        &self.entity_id
    }
}

impl EntityChange for QuantityChange {
    fn entity_id(&self) -> &str {
        &self.entity_id
    }
}

impl EntityChange for PriceChange {
    fn entity_id(&self) -> &str {
        &self.entity_id
    }
}

impl EntityChange for ReferenceChange {
    fn entity_id(&self) -> &str {
        &self.entity_id
    }
}

/// Changes that went through during a mutation loop
struct Applied<C> {
    changed: Vec<C>,
    cancelled: bool,
    failure: Option<BulkOpsError>,
}

/// Runs bulk operations against a store, sharing one token and one history
pub struct OperationsManager {
    store: Arc<dyn CatalogStore>,
    token: Arc<CancellationToken>,
    history: Arc<CompensationLog>,
    settings: Settings,
}

impl OperationsManager {
    /// Create a manager over shared token and history instances
    pub fn new(
        store: Arc<dyn CatalogStore>,
        token: Arc<CancellationToken>,
        history: Arc<CompensationLog>,
        settings: Settings,
    ) -> Self {
        Self {
            store,
            token,
            history,
            settings,
        }
    }

    pub fn token(&self) -> &Arc<CancellationToken> {
        &self.token
    }

    pub fn history(&self) -> &Arc<CompensationLog> {
        &self.history
    }

    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }

    /// Stop every running operation
    pub fn cancel_all(&self) {
        self.token.request_cancel_all();
    }

    /// Start a new cancellation epoch
    pub fn reset(&self) {
        self.token.reset();
    }

    /// Deadline for the storage calls of a run starting now
    fn deadline(&self) -> Instant {
        Instant::now() + self.settings.operation_timeout()
    }

    /// Await a storage call, failing once `deadline` has passed
    async fn within<T>(
        &self,
        op_type: OperationType,
        deadline: Instant,
        call: impl Future<Output = BulkOpsResult<T>>,
    ) -> BulkOpsResult<T> {
        tokio::time::timeout_at(deadline, call)
            .await
            .map_err(|_| self.timeout_error(op_type))?
    }

    fn timeout_error(&self, op_type: OperationType) -> BulkOpsError {
        BulkOpsError::Timeout {
            operation: op_type.to_string(),
            after: self.settings.operation_timeout(),
        }
    }

    /// Apply captured changes one entity at a time.
    ///
    /// Polls the token before each entity. Per-entity failures are logged and
    /// skipped; a deadline overrun ends the loop with a failure.
    async fn apply_each<C, F, Fut>(
        &self,
        op_type: OperationType,
        deadline: Instant,
        changes: Vec<C>,
        mut apply: F,
    ) -> Applied<C>
    where
        C: EntityChange,
        F: FnMut(&C) -> Fut,
        Fut: Future<Output = BulkOpsResult<bool>>,
    {
        let mut applied = Applied {
            changed: Vec::with_capacity(changes.len()),
            cancelled: false,
            failure: None,
        };

        for change in changes {
            if self.token.should_stop() {
                info!(op_type = %op_type, processed = applied.changed.len(), "operation cancelled");
                applied.cancelled = true;
                break;
            }

            match tokio::time::timeout_at(deadline, apply(&change)).await {
                Ok(Ok(true)) => applied.changed.push(change),
                Ok(Ok(false)) => {}
                Ok(Err(err)) => {
                    warn!(op_type = %op_type, entity = change.entity_id(), error = %err, "failed to update entity");
                }
                Err(_) => {
                    applied.failure = Some(self.timeout_error(op_type));
                    break;
                }
            }
        }

        applied
    }

    /// Record what changed and turn the loop result into an outcome.
    ///
    /// The record is written before a failure is returned so that whatever
    /// did change can still be undone.
    fn finish<C>(
        &self,
        op_type: OperationType,
        applied: Applied<C>,
        label: impl FnOnce(usize) -> String,
        snapshot: impl FnOnce(Vec<C>) -> Snapshot,
    ) -> BulkOpsResult<OperationOutcome> {
        let processed = applied.changed.len();
        let record = if processed > 0 {
            Some(
                self.history
                    .record(op_type, label(processed), snapshot(applied.changed), true),
            )
        } else {
            None
        };

        if let Some(err) = applied.failure {
            warn!(op_type = %op_type, processed, error = %err, "operation aborted");
            return Err(err);
        }

        info!(op_type = %op_type, processed, cancelled = applied.cancelled, "operation finished");
        Ok(OperationOutcome {
            op_type,
            processed,
            cancelled: applied.cancelled,
            record,
        })
    }
}
