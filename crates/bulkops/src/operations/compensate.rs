//! Compensating handlers backed by the catalog store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::compensation::{CompensationHandler, OperationRecord, Snapshot, UndoReport};
use crate::errors::{BulkOpsError, BulkOpsResult};
use crate::storage::CatalogStore;

/// Restores captured values through a [`CatalogStore`], one entity at a time.
///
/// Restoration is not atomic across the entities of a record: each is
/// written back independently and failures are counted, not rolled back.
pub struct StoreCompensator {
    store: Arc<dyn CatalogStore>,
    timeout: Duration,
}

impl StoreCompensator {
    pub fn new(store: Arc<dyn CatalogStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Write every captured value back, tallying into `report` as it goes
    async fn restore(&self, snapshot: &Snapshot, report: &mut UndoReport) {
        let store = self.store.as_ref();

        match snapshot {
            Snapshot::Activation(changes) => {
                for change in changes {
                    let result = store
                        .set_product_active(&change.entity_id, change.previous)
                        .await;
                    tally(report, &change.entity_id, result);
                }
            }
            Snapshot::Quantities(changes) => {
                for change in changes {
                    let result = store
                        .set_stock_quantity(&change.entity_id, change.previous)
                        .await;
                    tally(report, &change.entity_id, result);
                }
            }
            Snapshot::Prices(changes) => {
                for change in changes {
                    let result = store
                        .set_prices(&change.entity_id, change.previous_cost, change.previous_sale)
                        .await;
                    tally(report, &change.entity_id, result);
                }
            }
            Snapshot::TaxReferences { scope, changes } => {
                for change in changes {
                    // `None` removes the field: the product had no reference before.
                    let result = store
                        .set_tax_reference(&change.entity_id, *scope, change.previous.clone())
                        .await;
                    tally(report, &change.entity_id, result);
                }
            }
            Snapshot::None => {}
        }
    }
}

fn tally(report: &mut UndoReport, entity_id: &str, result: BulkOpsResult<bool>) {
    match result {
        Ok(true) => report.restored += 1,
        Ok(false) => report.unchanged += 1,
        Err(err) => {
            warn!(entity = entity_id, error = %err, "failed to restore entity");
            report.failed += 1;
            report.failed_ids.push(entity_id.to_string());
        }
    }
}

#[async_trait]
impl CompensationHandler for StoreCompensator {
    async fn compensate(&self, record: &OperationRecord) -> BulkOpsResult<UndoReport> {
        let expected = record.op_type.snapshot_kind();
        if record.snapshot.kind() != expected {
            return Err(BulkOpsError::InvalidSnapshot {
                op_type: record.op_type.to_string(),
                reason: format!(
                    "expected {expected:?} changes, found {:?}",
                    record.snapshot.kind()
                ),
            });
        }
        if record.snapshot.is_empty() {
            return Err(BulkOpsError::InvalidSnapshot {
                op_type: record.op_type.to_string(),
                reason: "snapshot covers no entities".to_string(),
            });
        }

        let mut report = UndoReport::new(record.snapshot.len());
        let finished = tokio::time::timeout(self.timeout, self.restore(&record.snapshot, &mut report))
            .await
            .is_ok();
        if !finished {
            // Entities are visited in capture order; the ones not reached count as failed.
            let visited = report.restored + report.unchanged + report.failed;
            for entity_id in record.snapshot.entity_ids().into_iter().skip(visited) {
                report.failed += 1;
                report.failed_ids.push(entity_id.to_string());
            }
            report.timed_out = true;
            warn!(
                op_type = %record.op_type,
                timeout = ?self.timeout,
                restored = report.restored,
                failed = report.failed,
                "undo timed out"
            );
        }

        // Nothing was written back, so keeping the record makes a retry safe.
        if report.restored == 0 && report.unchanged == 0 {
            let reason = if report.timed_out {
                format!(
                    "timed out after {:?}; none of the {} entities could be restored",
                    self.timeout, report.total
                )
            } else {
                format!("none of the {} entities could be restored", report.total)
            };
            return Err(BulkOpsError::UndoFailed {
                id: record.id.to_string(),
                reason,
            });
        }

        Ok(report)
    }
}
