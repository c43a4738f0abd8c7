//! Database housekeeping.

use chrono::NaiveDate;
use tracing::{info, warn};

use super::{OperationOutcome, OperationsManager};
use crate::compensation::OperationType;
use crate::entities::Ledger;
use crate::errors::{BulkOpsError, BulkOpsResult};

impl OperationsManager {
    /// Delete every ledger entry dated before `before` (`YYYY-MM-DD`).
    ///
    /// Ledgers are purged one at a time and the token is polled between them;
    /// a cancelled run returns the number of entries deleted so far. A ledger
    /// whose deletion fails is logged and skipped.
    pub async fn clean_before(&self, before: &str) -> BulkOpsResult<OperationOutcome> {
        let op_type = OperationType::CleanByDate;
        let date = NaiveDate::parse_from_str(before.trim(), "%Y-%m-%d").map_err(|e| {
            BulkOpsError::InvalidArgument {
                reason: format!("invalid date '{before}' (use YYYY-MM-DD): {e}"),
            }
        })?;

        let deadline = self.deadline();
        info!(%date, "cleaning ledger entries");

        let mut deleted = 0;
        let mut cancelled = false;
        for ledger in Ledger::ALL {
            if self.token.should_stop() {
                info!(deleted, "clean cancelled");
                cancelled = true;
                break;
            }

            match tokio::time::timeout_at(deadline, self.store.delete_ledger_before(ledger, date))
                .await
            {
                Ok(Ok(count)) => {
                    if count > 0 {
                        info!(%ledger, count, "ledger entries removed");
                    }
                    deleted += count;
                }
                Ok(Err(err)) => warn!(%ledger, error = %err, "failed to clean ledger"),
                Err(_) => return Err(self.timeout_error(op_type)),
            }
        }

        // Deleted entries are not captured, so there is nothing an undo could put back:
        // the run is not recorded at all.
        info!(deleted, cancelled, "clean finished");
        Ok(OperationOutcome {
            op_type,
            processed: deleted,
            cancelled,
            record: None,
        })
    }
}
