//! Emitter settings.

use tracing::info;

use super::{OperationOutcome, OperationsManager};
use crate::compensation::{OperationType, Snapshot};
use crate::errors::BulkOpsResult;

impl OperationsManager {
    /// Enable MEI stock adjustment on every emitter
    pub async fn enable_mei(&self) -> BulkOpsResult<OperationOutcome> {
        let op_type = OperationType::EnableMei;
        let deadline = self.deadline();

        let changed = self
            .within(op_type, deadline, self.store.enable_mei_all())
            .await?;

        // Single bulk update with no prior capture of the per-emitter flags:
        // kept in the history for visibility only, never reversible.
        let record = (changed > 0).then(|| {
            self.history.record(
                op_type,
                format!("Enabled MEI on {changed} emitters"),
                Snapshot::None,
                false,
            )
        });

        info!(changed, "MEI enabled");
        Ok(OperationOutcome {
            op_type,
            processed: changed,
            cancelled: false,
            record,
        })
    }
}
