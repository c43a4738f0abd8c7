//! Bounded, in-memory undo history.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::record::{OperationId, OperationRecord, OperationSummary, OperationType, Snapshot};
use crate::errors::{BulkOpsError, BulkOpsResult};

/// Outcome of reverting one record.
///
/// Entities are restored independently, so `failed` may be non-zero on a
/// successful undo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UndoReport {
    /// Entities covered by the snapshot
    pub total: usize,
    /// Entities written back to their previous value
    pub restored: usize,
    /// Entities that already held their previous value
    pub unchanged: usize,
    /// Entities that could not be restored
    pub failed: usize,
    /// Ids of the entities counted in `failed`
    pub failed_ids: Vec<String>,
    /// The undo deadline passed before every entity was visited
    pub timed_out: bool,
}

impl UndoReport {
    /// Empty report for a snapshot of `total` entities
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Whether any entity was left unrestored
    pub fn is_partial(&self) -> bool {
        self.failed > 0
    }

    /// Human readable outcome, naming how many entities could not be restored
    pub fn summary(&self) -> String {
        let mut text = format!("restored {} of {} entities", self.restored, self.total);
        if self.unchanged > 0 {
            text.push_str(&format!(", {} already at previous value", self.unchanged));
        }
        if self.failed > 0 {
            text.push_str(&format!("; {} could not be restored", self.failed));
        }
        if self.timed_out {
            text.push_str(" (timed out)");
        }
        text
    }
}

/// Compensating action dispatcher, one arm per [`OperationType`]
#[async_trait]
pub trait CompensationHandler: Send + Sync {
    /// Revert the mutation described by `record`.
    ///
    /// Returning an error keeps the record in the history.
    async fn compensate(&self, record: &OperationRecord) -> BulkOpsResult<UndoReport>;
}

#[derive(Debug, Default)]
struct HistoryState {
    entries: VecDeque<OperationRecord>,
    undoing: HashSet<OperationId>,
}

/// Ordered history of completed bulk operations.
///
/// Holds at most `capacity` records; recording past capacity silently evicts
/// the oldest. Order is completion order. Memory only.
#[derive(Debug)]
pub struct CompensationLog {
    state: Mutex<HistoryState>,
    capacity: usize,
}

impl CompensationLog {
    /// Create an empty history. A zero capacity is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(HistoryState {
                entries: VecDeque::with_capacity(capacity),
                undoing: HashSet::new(),
            }),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HistoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Append a record. Never fails; the snapshot is checked only at undo time.
    pub fn record(
        &self,
        op_type: OperationType,
        label: impl Into<String>,
        snapshot: Snapshot,
        undoable: bool,
    ) -> OperationId {
        let record = OperationRecord {
            id: OperationId::generate(),
            op_type,
            timestamp: Utc::now(),
            label: label.into(),
            snapshot,
            undoable,
        };
        let id = record.id.clone();

        let mut state = self.lock();
        state.entries.push_back(record);
        while state.entries.len() > self.capacity {
            if let Some(evicted) = state.entries.pop_front() {
                debug!(id = %evicted.id, op_type = %evicted.op_type, "history full, evicted oldest record");
            }
        }
        drop(state);

        debug!(id = %id, op_type = %op_type, undoable, "operation recorded");
        id
    }

    /// Undoable records, newest first
    pub fn list_undoable(&self) -> Vec<OperationSummary> {
        self.lock()
            .entries
            .iter()
            .rev()
            .filter(|r| r.undoable)
            .map(OperationRecord::summary)
            .collect()
    }

    /// Every record, oldest first
    pub fn records(&self) -> Vec<OperationRecord> {
        self.lock().entries.iter().cloned().collect()
    }

    pub fn get(&self, id: &OperationId) -> Option<OperationRecord> {
        self.lock().entries.iter().find(|r| &r.id == id).cloned()
    }

    /// Drop the whole history without compensating anything
    pub fn clear(&self) {
        let mut state = self.lock();
        let dropped = state.entries.len();
        state.entries.clear();
        info!(dropped, "history cleared");
    }

    /// Revert one record through `handler`.
    ///
    /// On success the record is removed; on failure it stays so the caller
    /// can retry. The history lock is not held while the handler runs.
    pub async fn undo(
        &self,
        id: &OperationId,
        handler: &dyn CompensationHandler,
    ) -> BulkOpsResult<UndoReport> {
        let record = {
            let mut state = self.lock();
            let record = state
                .entries
                .iter()
                .find(|r| &r.id == id)
                .cloned()
                .ok_or_else(|| BulkOpsError::NotFound { id: id.to_string() })?;

            if !record.undoable {
                return Err(BulkOpsError::NotUndoable { id: id.to_string() });
            }
            if !state.undoing.insert(id.clone()) {
                return Err(BulkOpsError::UndoInProgress { id: id.to_string() });
            }
            record
        };
        let _guard = UndoGuard { log: self, id };

        info!(id = %id, op_type = %record.op_type, entities = record.snapshot.len(), "undoing operation");
        match handler.compensate(&record).await {
            Ok(report) => {
                self.lock().entries.retain(|r| &r.id != id);
                if report.is_partial() {
                    // Best effort: the record is forgotten even though some entities were not restored.
                    warn!(id = %id, failed = report.failed, restored = report.restored, "partial undo, record removed");
                } else {
                    info!(id = %id, restored = report.restored, "operation undone");
                }
                Ok(report)
            }
            Err(err) => {
                warn!(id = %id, error = %err, "undo failed, record retained");
                Err(match err {
                    e @ (BulkOpsError::InvalidSnapshot { .. } | BulkOpsError::UndoFailed { .. }) => e,
                    other => BulkOpsError::UndoFailed {
                        id: id.to_string(),
                        reason: other.to_string(),
                    },
                })
            }
        }
    }
}

/// Clears the in-flight mark even if the undo future is dropped midway.
struct UndoGuard<'a> {
    log: &'a CompensationLog,
    id: &'a OperationId,
}

impl Drop for UndoGuard<'_> {
    fn drop(&mut self) {
        self.log.lock().undoing.remove(self.id);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::compensation::record::FlagChange;

    /// Handler with a scripted result that counts invocations
    struct ScriptedHandler {
        fail: bool,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl ScriptedHandler {
        fn ok() -> Self {
            Self {
                fail: false,
                delay: None,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::ok()
            }
        }
    }

    #[async_trait]
    impl CompensationHandler for ScriptedHandler {
        async fn compensate(&self, record: &OperationRecord) -> BulkOpsResult<UndoReport> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(BulkOpsError::Storage {
                    reason: "connection refused".to_string(),
                });
            }
            let mut report = UndoReport::new(record.snapshot.len());
            report.restored = record.snapshot.len();
            Ok(report)
        }
    }

    fn activation(ids: &[&str]) -> Snapshot {
        Snapshot::Activation(
            ids.iter()
                .map(|id| FlagChange {
                    entity_id: (*id).to_string(),
                    previous: false,
                })
                .collect(),
        )
    }

    fn labels(log: &CompensationLog) -> Vec<String> {
        log.records().into_iter().map(|r| r.label).collect()
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let log = CompensationLog::new(3);
        for label in ["A", "B", "C", "D"] {
            log.record(OperationType::ActivateToggle, label, activation(&["p1"]), true);
        }

        assert_eq!(labels(&log), vec!["B", "C", "D"]);
        let listed: Vec<_> = log.list_undoable().into_iter().map(|s| s.label).collect();
        assert_eq!(listed, vec!["D", "C", "B"]);
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let log = CompensationLog::new(5);
        for i in 0..12 {
            log.record(OperationType::ZeroStock, format!("op {i}"), Snapshot::None, true);
            assert!(log.len() <= 5);
        }
        assert_eq!(labels(&log), vec!["op 7", "op 8", "op 9", "op 10", "op 11"]);
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let log = CompensationLog::new(0);
        log.record(OperationType::ZeroStock, "a", Snapshot::None, true);
        log.record(OperationType::ZeroStock, "b", Snapshot::None, true);
        assert_eq!(log.capacity(), 1);
        assert_eq!(labels(&log), vec!["b"]);
    }

    #[test]
    fn test_list_skips_non_undoable() {
        let log = CompensationLog::new(5);
        log.record(OperationType::EnableMei, "mei", Snapshot::None, false);
        log.record(OperationType::ActivateToggle, "toggle", activation(&["p1"]), true);

        let listed = log.list_undoable();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].label, "toggle");
        assert_eq!(log.len(), 2);
    }

    #[tokio::test]
    async fn test_undo_unknown_id_is_not_found() {
        let log = CompensationLog::new(5);
        let handler = ScriptedHandler::ok();
        let err = log
            .undo(&OperationId::from("missing"), &handler)
            .await
            .unwrap_err();
        assert!(matches!(err, BulkOpsError::NotFound { .. }));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_undo_non_undoable_leaves_log_unchanged() {
        let log = CompensationLog::new(5);
        let id = log.record(OperationType::EnableMei, "mei", Snapshot::None, false);
        let before = log.records();

        let handler = ScriptedHandler::ok();
        let err = log.undo(&id, &handler).await.unwrap_err();

        assert!(matches!(err, BulkOpsError::NotUndoable { .. }));
        assert_eq!(log.records(), before);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_successful_undo_removes_only_that_record() {
        let log = CompensationLog::new(5);
        log.record(OperationType::ActivateToggle, "A", activation(&["p1"]), true);
        let b = log.record(OperationType::ActivateToggle, "B", activation(&["p2"]), true);
        log.record(OperationType::ActivateToggle, "C", activation(&["p3"]), true);

        let report = log.undo(&b, &ScriptedHandler::ok()).await.unwrap();

        assert_eq!(report.restored, 1);
        assert_eq!(labels(&log), vec!["A", "C"]);
        assert!(log.get(&b).is_none());
    }

    #[tokio::test]
    async fn test_failed_undo_retains_record_for_retry() {
        let log = CompensationLog::new(5);
        let id = log.record(OperationType::ActivateToggle, "A", activation(&["p1"]), true);

        let err = log.undo(&id, &ScriptedHandler::failing()).await.unwrap_err();
        assert!(matches!(err, BulkOpsError::UndoFailed { .. }));
        assert!(err.to_string().contains("connection refused"));
        assert!(log.get(&id).is_some());

        log.undo(&id, &ScriptedHandler::ok()).await.unwrap();
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_undo_of_same_record_runs_once() {
        let log = Arc::new(CompensationLog::new(5));
        let id = log.record(OperationType::ActivateToggle, "A", activation(&["p1"]), true);
        let handler = Arc::new(ScriptedHandler {
            delay: Some(Duration::from_millis(50)),
            ..ScriptedHandler::ok()
        });

        let first = {
            let (log, handler, id) = (Arc::clone(&log), Arc::clone(&handler), id.clone());
            tokio::spawn(async move { log.undo(&id, handler.as_ref()).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = log.undo(&id, handler.as_ref()).await;

        assert!(matches!(second, Err(BulkOpsError::UndoInProgress { .. })));
        assert!(first.await.unwrap().is_ok());
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_undo_clears_in_flight_mark() {
        let log = CompensationLog::new(5);
        let id = log.record(OperationType::ActivateToggle, "A", activation(&["p1"]), true);
        let slow = ScriptedHandler {
            delay: Some(Duration::from_secs(60)),
            ..ScriptedHandler::ok()
        };

        let abandoned = tokio::time::timeout(Duration::from_millis(20), log.undo(&id, &slow)).await;
        assert!(abandoned.is_err());
        assert!(log.get(&id).is_some());

        let handler = ScriptedHandler::ok();
        log.undo(&id, &handler).await.unwrap();
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_record_not_blocked_by_running_undo() {
        let log = Arc::new(CompensationLog::new(5));
        let id = log.record(OperationType::ActivateToggle, "A", activation(&["p1"]), true);
        let handler = Arc::new(ScriptedHandler {
            delay: Some(Duration::from_millis(50)),
            ..ScriptedHandler::ok()
        });

        let undo = {
            let (log, handler, id) = (Arc::clone(&log), Arc::clone(&handler), id.clone());
            tokio::spawn(async move { log.undo(&id, handler.as_ref()).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        log.record(OperationType::ZeroStock, "B", Snapshot::None, true);

        undo.await.unwrap().unwrap();
        assert_eq!(labels(&log), vec!["B"]);
    }

    #[test]
    fn test_concurrent_records_are_all_kept() {
        let log = Arc::new(CompensationLog::new(64));
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    for i in 0..5 {
                        log.record(
                            OperationType::ZeroStock,
                            format!("w{worker}-{i}"),
                            Snapshot::None,
                            true,
                        );
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut seen = labels(&log);
        assert_eq!(seen.len(), 40);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 40);
    }

    #[test]
    fn test_clear_empties_history() {
        let log = CompensationLog::new(5);
        log.record(OperationType::ZeroStock, "A", Snapshot::None, true);
        log.clear();
        assert!(log.is_empty());
        assert!(log.list_undoable().is_empty());
    }

    #[test]
    fn test_report_summary_names_failures() {
        let report = UndoReport {
            total: 4,
            restored: 2,
            unchanged: 1,
            failed: 1,
            failed_ids: vec!["p4".to_string()],
            timed_out: false,
        };
        assert_eq!(
            report.summary(),
            "restored 2 of 4 entities, 1 already at previous value; 1 could not be restored"
        );
        assert!(report.is_partial());

        let report = UndoReport {
            timed_out: true,
            ..report
        };
        assert!(report.summary().ends_with("1 could not be restored (timed out)"));
    }
}
