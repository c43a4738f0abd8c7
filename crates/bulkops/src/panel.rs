//! Integration layer handed to the presentation layer.

use std::sync::Arc;

use tracing::info;

use crate::cancel::CancellationToken;
use crate::compensation::{CompensationLog, OperationId, OperationSummary, UndoReport};
use crate::config::Settings;
use crate::errors::BulkOpsResult;
use crate::operations::{OperationsManager, StoreCompensator};
use crate::storage::CatalogStore;

/// Owns the single cancellation token and history of an application and
/// wires them into the bulk operations.
pub struct ControlPanel {
    token: Arc<CancellationToken>,
    history: Arc<CompensationLog>,
    operations: OperationsManager,
    compensator: StoreCompensator,
}

impl ControlPanel {
    /// Build fresh token and history instances over `store`
    pub fn new(settings: Settings, store: Arc<dyn CatalogStore>) -> Self {
        let token = Arc::new(CancellationToken::new());
        let history = Arc::new(CompensationLog::new(settings.history_capacity));
        let compensator = StoreCompensator::new(Arc::clone(&store), settings.undo_timeout());
        info!(
            storage = store.storage_type(),
            capacity = history.capacity(),
            "control panel ready"
        );
        let operations = OperationsManager::new(
            store,
            Arc::clone(&token),
            Arc::clone(&history),
            settings,
        );

        Self {
            token,
            history,
            operations,
            compensator,
        }
    }

    /// Bulk operations sharing this panel's token and history
    pub fn operations(&self) -> &OperationsManager {
        &self.operations
    }

    pub fn token(&self) -> &Arc<CancellationToken> {
        &self.token
    }

    pub fn history(&self) -> &Arc<CompensationLog> {
        &self.history
    }

    /// Reversible operations, newest first
    pub fn list_undoable(&self) -> Vec<OperationSummary> {
        self.history.list_undoable()
    }

    /// Revert one recorded operation
    pub async fn undo(&self, id: &OperationId) -> BulkOpsResult<UndoReport> {
        self.history.undo(id, &self.compensator).await
    }

    /// Ask every running operation to stop at its next check
    pub fn cancel_all(&self) {
        self.token.request_cancel_all();
    }

    /// Start a new run; call before each user-triggered operation
    pub fn reset(&self) {
        self.token.reset();
    }

    /// Forget the whole history
    pub fn clear_history(&self) {
        self.history.clear();
    }
}
